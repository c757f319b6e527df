//! Core data models for texflat
//!
//! Defines the fundamental data structures used throughout texflat:
//! - `ProjectFile`: one loaded source file with its scanned references
//! - `Reference`: one include directive occurrence inside a file
//! - `BibEntry`: one bibliography record
//! - Supporting enums: `FileKind`, `DirectiveKind`, `ResolveBase`

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Kind of a resolved project file, classified by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A `.tex` source that may contain further include directives
    Document,
    /// A `.bib` bibliography database (leaf)
    Bibliography,
    /// Anything else (images, style files, class files) - leaf, never substituted
    Asset,
}

impl FileKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tex") => FileKind::Document,
            Some(ext) if ext.eq_ignore_ascii_case("bib") => FileKind::Bibliography,
            _ => FileKind::Asset,
        }
    }
}

/// Kind of include directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    /// `\input{...}` (also `\import`/`\subimport`, which are input with an
    /// explicit anchor directory)
    Input,
    /// `\include{...}`
    Include,
    /// `\bibliography{...}`, `\nobibliography{...}` or `\addbibresource{...}`
    Bibliography,
}

impl DirectiveKind {
    /// Default extension appended when the written target has none.
    pub fn default_extension(self) -> &'static str {
        match self {
            DirectiveKind::Input | DirectiveKind::Include => "tex",
            DirectiveKind::Bibliography => "bib",
        }
    }
}

/// Directory a written target is resolved against first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveBase {
    /// Directory of the referencing file, then the project root
    CurrentFile,
    /// Project root only (`\import`)
    ProjectRoot,
}

/// One include directive occurrence inside a source file
///
/// `span` is the byte range of the whole directive text in the source
/// content; it is both a graph edge label and the substitution point during
/// flattening. Comma-separated bibliography arguments produce one
/// `Reference` per target, all sharing the directive's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Directive kind
    pub kind: DirectiveKind,
    /// Target path as written (possibly missing its extension)
    pub target: String,
    /// Byte range of the directive in the source content
    pub span: Range<usize>,
    /// Resolution anchor for the written target
    pub base: ResolveBase,
}

/// One loaded source file
///
/// Content is read once and immutable after parse. `references` are in
/// ascending span order; only `Document` files carry any.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Path relative to the project root
    pub path: PathBuf,
    /// Raw text content
    pub content: String,
    /// File classification
    pub kind: FileKind,
    /// Scanned include directives, in document order
    pub references: Vec<Reference>,
}

impl ProjectFile {
    /// Load a file's content and scan it for references (documents only).
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, kind: FileKind) -> Self {
        let content = content.into();
        let references = match kind {
            FileKind::Document => crate::scan::scan_references(&content),
            _ => Vec::new(),
        };
        Self {
            path: path.into(),
            content,
            kind,
            references,
        }
    }
}

/// One bibliography record
///
/// The citation key is the deduplication identity; `fields` preserve source
/// order. `source` is the file the entry came from, used when reporting key
/// collisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibEntry {
    /// Citation key (deduplication identity)
    pub key: String,
    /// Entry type as written (`article`, `book`, ...), lowercased
    pub entry_type: String,
    /// Field mapping in source order, names lowercased
    pub fields: Vec<(String, String)>,
    /// File of origin, relative to the project root
    pub source: PathBuf,
}

impl BibEntry {
    /// Look up a field value by (case-insensitive) name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether two entries carry the same type and field mapping, ignoring
    /// field order and which file they came from.
    pub fn same_content(&self, other: &BibEntry) -> bool {
        if self.entry_type != other.entry_type || self.fields.len() != other.fields.len() {
            return false;
        }
        let mut a: Vec<_> = self.fields.iter().collect();
        let mut b: Vec<_> = other.fields.iter().collect();
        a.sort();
        b.sort();
        a == b
    }
}
