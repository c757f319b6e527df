//! Resolution entry point
//!
//! `resolve` is the one logical operation this crate exposes: build the
//! file graph, validate it, flatten the entry document, merge the
//! bibliographies and hand back all three artifacts plus the report.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::bibtex::{merge_bibliographies, prune_unreferenced, render_bibtex};
use crate::error::{TexflatError, TexflatResult};
use crate::flatten::flatten;
use crate::graph::FileGraph;
use crate::models::BibEntry;
use crate::report::{FileStatus, ResolutionReport};

/// What to do when a reference cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Record the miss and keep going (the default)
    #[default]
    Warn,
    /// Complete the run, then fail with the full report
    Fail,
}

/// Serialization applied when the merged bibliography is rendered
///
/// The merged bibliography itself is structured data; this only selects how
/// [`Resolution::render_bibliography`] writes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BibliographyFormat {
    /// BibTeX source, consumable by the downstream converter (the default)
    #[default]
    Bibtex,
    /// JSON entry list for machine consumers
    Json,
}

/// Options for one resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Policy for unresolved references
    pub on_missing: MissingPolicy,
    /// Serialization for the merged bibliography
    pub bibliography_format: BibliographyFormat,
    /// Include-nesting guard; `None` is unbounded (cycle-safe regardless)
    pub max_depth: Option<usize>,
    /// Drop merged entries never cited in the flattened text
    pub prune_unreferenced: bool,
}

/// Everything one resolution run produces
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The single self-contained document
    pub flattened: String,
    /// Merged, deduplicated bibliography in first-discovery order
    pub bibliography: Vec<BibEntry>,
    /// Serialization the run was configured with
    pub bibliography_format: BibliographyFormat,
    /// What was resolved, skipped or failed
    pub report: ResolutionReport,
    /// Files whose content ended up in the flattened text, in first-use order
    pub included: Vec<PathBuf>,
}

impl Resolution {
    /// Serialize the merged bibliography in the configured format.
    pub fn render_bibliography(&self) -> String {
        match self.bibliography_format {
            BibliographyFormat::Bibtex => render_bibtex(&self.bibliography),
            BibliographyFormat::Json => {
                serde_json::to_string_pretty(&self.bibliography).unwrap_or_default()
            }
        }
    }
}

/// Resolve a LaTeX project into one flattened document plus one merged
/// bibliography.
///
/// `entry` is relative to `root`. Fails immediately with
/// [`TexflatError::ProjectNotFound`] when the entry document does not
/// exist; fails after a complete run with
/// [`TexflatError::ResolutionFailed`] when `on_missing` is
/// [`MissingPolicy::Fail`] and at least one reference was unresolved.
/// Every other condition is recorded in the report.
pub fn resolve(root: &Path, entry: &Path, options: &ResolveOptions) -> TexflatResult<Resolution> {
    let mut report = ResolutionReport::new();

    let graph = FileGraph::build(root, entry, options.max_depth, &mut report)?;
    let outcome = flatten(&graph);

    let mut bibliography = merge_bibliographies(&graph, &outcome.text, &mut report);
    if options.prune_unreferenced {
        bibliography = prune_unreferenced(bibliography, &outcome.text);
    }

    note_unreachable(root, &graph, &mut report);

    if options.on_missing == MissingPolicy::Fail && report.has_missing() {
        return Err(TexflatError::ResolutionFailed { report });
    }

    let included = outcome
        .included
        .iter()
        .map(|&id| graph.node(id).path.clone())
        .collect();

    Ok(Resolution {
        flattened: outcome.text,
        bibliography,
        bibliography_format: options.bibliography_format,
        report,
        included,
    })
}

/// Record source files present under the root that the entry document never
/// reaches. They are excluded from the output but noted so nothing vanishes
/// silently.
fn note_unreachable(root: &Path, graph: &FileGraph, report: &mut ResolutionReport) {
    let mut unreachable = Vec::new();
    for result in WalkBuilder::new(root).standard_filters(false).build() {
        let Ok(dent) = result else { continue };
        if !dent.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = dent.path();
        let relevant = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("tex") || ext.eq_ignore_ascii_case("bib")
        );
        if !relevant {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if graph.lookup(rel).is_none() {
            unreachable.push(rel.to_path_buf());
        }
    }
    // Walk order is platform-dependent; the report is not.
    unreachable.sort();
    for path in unreachable {
        report.record(&path, FileStatus::Skipped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_resolve_missing_entry_fails_fast() {
        let dir = tempdir().unwrap();
        let err = resolve(
            dir.path(),
            Path::new("main.tex"),
            &ResolveOptions::default(),
        )
        .expect_err("no entry document");
        assert!(matches!(err, TexflatError::ProjectNotFound { .. }));
    }

    #[test]
    fn test_resolve_warn_policy_succeeds_with_missing() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{missing}");

        let resolution = resolve(
            dir.path(),
            Path::new("main.tex"),
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(resolution.flattened, "\\input{missing}");
        assert_eq!(resolution.report.missing_count(), 1);
    }

    #[test]
    fn test_resolve_fail_policy_raises_with_report() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{missing}");

        let options = ResolveOptions {
            on_missing: MissingPolicy::Fail,
            ..Default::default()
        };
        let err = resolve(dir.path(), Path::new("main.tex"), &options).expect_err("must fail");
        match err {
            TexflatError::ResolutionFailed { report } => {
                assert_eq!(report.missing_count(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_unreachable_files_reported_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "just text");
        write(dir.path(), "orphan.tex", "never included");
        write(dir.path(), "old/draft.bib", "@misc{x, title={X}}");

        let resolution = resolve(
            dir.path(),
            Path::new("main.tex"),
            &ResolveOptions::default(),
        )
        .unwrap();

        let skipped: Vec<_> = resolution
            .report
            .files()
            .iter()
            .filter(|r| r.status == FileStatus::Skipped)
            .map(|r| r.path.clone())
            .collect();
        assert_eq!(
            skipped,
            vec![PathBuf::from("old/draft.bib"), PathBuf::from("orphan.tex")]
        );
    }

    #[test]
    fn test_resolve_included_lists_used_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{a}\\input{b}");
        write(dir.path(), "a.tex", "A");
        write(dir.path(), "b.tex", "B");

        let resolution = resolve(
            dir.path(),
            Path::new("main.tex"),
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(
            resolution.included,
            vec![
                PathBuf::from("main.tex"),
                PathBuf::from("a.tex"),
                PathBuf::from("b.tex")
            ]
        );
    }

    #[test]
    fn test_render_bibliography_bibtex_by_default() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\bibliography{refs}");
        write(dir.path(), "refs.bib", "@misc{a, title={A}}");

        let resolution = resolve(
            dir.path(),
            Path::new("main.tex"),
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(resolution.bibliography_format, BibliographyFormat::Bibtex);
        assert!(resolution.render_bibliography().starts_with("@misc{a,"));
    }

    #[test]
    fn test_render_bibliography_json_format() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\bibliography{refs}");
        write(dir.path(), "refs.bib", "@misc{a, title={A}}");

        let options = ResolveOptions {
            bibliography_format: BibliographyFormat::Json,
            ..Default::default()
        };
        let resolution = resolve(dir.path(), Path::new("main.tex"), &options).unwrap();

        let rendered = resolution.render_bibliography();
        let entries: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(entries[0]["key"], "a");
        assert_eq!(entries[0]["entry_type"], "misc");
    }

    #[test]
    fn test_resolve_prune_unreferenced() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "main.tex",
            "cites \\cite{used}\n\\bibliography{refs}\n",
        );
        write(
            dir.path(),
            "refs.bib",
            "@misc{used, title={U}}\n@misc{unused, title={X}}\n",
        );

        let options = ResolveOptions {
            prune_unreferenced: true,
            ..Default::default()
        };
        let resolution = resolve(dir.path(), Path::new("main.tex"), &options).unwrap();
        let keys: Vec<_> = resolution
            .bibliography
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["used"]);
    }
}
