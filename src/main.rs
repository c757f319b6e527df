//! texflat CLI - LaTeX project resolver and flattener
//!
//! Usage: texflat <COMMAND>
//!
//! Commands:
//!   resolve    Flatten a project and merge its bibliographies
//!   find-main  Locate the main document of a project directory
//!   id         Extract the arXiv identifier from an id or URL
//!
//! Fetching and extracting source bundles, caching and the downstream
//! converter are collaborators; this binary only drives one resolution run
//! over an already-extracted directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use texflat::{find_main_file, parse_arxiv_id, resolve, FileStatus, ResolveOptions};

mod cli;

use cli::{BibFormat, Cli, Commands, OnMissing};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Resolve {
            root,
            entry,
            output,
            bib_output,
            bib_format,
            on_missing,
            max_depth,
            prune_unreferenced,
        } => cmd_resolve(
            &root,
            entry,
            output,
            bib_output,
            bib_format,
            on_missing,
            max_depth,
            prune_unreferenced,
            cli.json,
        ),
        Commands::FindMain { root } => cmd_find_main(&root, cli.json),
        Commands::Id { input } => cmd_id(&input, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_resolve(
    root: &Path,
    entry: Option<PathBuf>,
    output: Option<PathBuf>,
    bib_output: Option<PathBuf>,
    bib_format: BibFormat,
    on_missing: OnMissing,
    max_depth: Option<usize>,
    prune_unreferenced: bool,
    json: bool,
) -> Result<()> {
    let entry = match entry {
        Some(entry) => entry,
        None => find_main_file(root)
            .with_context(|| format!("no .tex file found under {}", root.display()))?,
    };

    let options = ResolveOptions {
        on_missing: on_missing.into(),
        bibliography_format: bib_format.into(),
        max_depth,
        prune_unreferenced,
    };

    let resolution = resolve(root, &entry, &options)
        .with_context(|| format!("resolving {} in {}", entry.display(), root.display()))?;

    match &output {
        Some(path) => fs::write(path, &resolution.flattened)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", resolution.flattened),
    }

    if let Some(path) = &bib_output {
        fs::write(path, resolution.render_bibliography())
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if json {
        eprintln!("{}", serde_json::to_string_pretty(&resolution.report)?);
    } else {
        summarize(&resolution.report, resolution.bibliography.len());
    }

    Ok(())
}

fn summarize(report: &texflat::ResolutionReport, bib_entries: usize) {
    let resolved = report
        .files()
        .iter()
        .filter(|r| r.status == FileStatus::Resolved)
        .count();
    eprintln!(
        "resolved {resolved} file(s), {bib_entries} bibliography entr{}",
        if bib_entries == 1 { "y" } else { "ies" }
    );
    for path in report.missing() {
        eprintln!("  missing: {}", path.display());
    }
    for cycle in report.cycles() {
        eprintln!(
            "  cycle: {} -> {}",
            cycle.from.display(),
            cycle.to.display()
        );
    }
    for collision in report.collisions() {
        eprintln!(
            "  key collision '{}': kept {}, discarded {}",
            collision.key,
            collision.kept.display(),
            collision.discarded.display()
        );
    }
}

fn cmd_find_main(root: &Path, json: bool) -> Result<()> {
    match find_main_file(root) {
        Some(path) => {
            if json {
                println!("{}", serde_json::json!({ "main": path }));
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        None => bail!("no .tex file found under {}", root.display()),
    }
}

fn cmd_id(input: &str, json: bool) -> Result<()> {
    let id = parse_arxiv_id(input)?;
    if json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("{id}");
    }
    Ok(())
}
