//! texflat - LaTeX project resolver and flattener
//!
//! texflat takes a directory of `.tex`/`.bib`/asset files (typically an
//! extracted arXiv source bundle), builds the file-dependency graph implied
//! by its include directives, and resolves the project into one flattened,
//! self-contained document plus one merged, deduplicated bibliography,
//! ready for a downstream converter.

pub mod bibtex;
pub mod discover;
pub mod error;
pub mod flatten;
pub mod graph;
pub mod models;
pub mod report;
pub mod resolver;
pub mod scan;

// Re-exports for convenience
pub use bibtex::{merge_bibliographies, parse_bibtex, render_bibtex};
pub use discover::{find_main_file, parse_arxiv_id};
pub use error::{TexflatError, TexflatResult};
pub use flatten::{flatten, FlattenOutcome, MERGED_BIB_NAME};
pub use graph::{Edge, FileGraph, NodeId};
pub use models::{BibEntry, DirectiveKind, FileKind, ProjectFile, Reference};
pub use report::{FileStatus, KeyCollision, ResolutionReport};
pub use resolver::{resolve, BibliographyFormat, MissingPolicy, Resolution, ResolveOptions};
