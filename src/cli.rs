use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// texflat - LaTeX project resolver and flattener
#[derive(Parser, Debug)]
#[command(name = "texflat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format for machine consumers
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a project directory into one flattened document and one
    /// merged bibliography
    Resolve {
        /// Project root (an already-extracted source bundle)
        root: PathBuf,

        /// Entry document, relative to the root (auto-detected if omitted)
        #[arg(short, long)]
        entry: Option<PathBuf>,

        /// Write the flattened document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the merged bibliography here
        #[arg(short, long)]
        bib_output: Option<PathBuf>,

        /// Serialization for the merged bibliography
        #[arg(long, value_enum, default_value = "bibtex")]
        bib_format: BibFormat,

        /// Treat unresolved references as fatal after the run completes
        #[arg(long, value_enum, default_value = "warn")]
        on_missing: OnMissing,

        /// Stop following includes nested deeper than N levels
        #[arg(long)]
        max_depth: Option<usize>,

        /// Drop bibliography entries never cited in the flattened text
        #[arg(long)]
        prune_unreferenced: bool,
    },

    /// Locate the main document of a project directory
    FindMain {
        /// Project root
        root: PathBuf,
    },

    /// Extract the arXiv identifier from an id or URL
    Id {
        /// arXiv id, abs URL or pdf URL
        input: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnMissing {
    Warn,
    Fail,
}

impl From<OnMissing> for texflat::MissingPolicy {
    fn from(value: OnMissing) -> Self {
        match value {
            OnMissing::Warn => texflat::MissingPolicy::Warn,
            OnMissing::Fail => texflat::MissingPolicy::Fail,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BibFormat {
    Bibtex,
    Json,
}

impl From<BibFormat> for texflat::BibliographyFormat {
    fn from(value: BibFormat) -> Self {
        match value {
            BibFormat::Bibtex => texflat::BibliographyFormat::Bibtex,
            BibFormat::Json => texflat::BibliographyFormat::Json,
        }
    }
}
