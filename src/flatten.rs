//! Document flattener
//!
//! Depth-first substitution over a validated file graph: every `\input` /
//! `\include` directive is replaced by the fully flattened content of its
//! target, memoized per node so shared includes are flattened once and
//! reused verbatim at every occurrence. Bibliography directives are not
//! substituted; they are rewritten to point at the merged bibliography
//! artifact, which is produced separately.

use std::collections::BTreeSet;

use crate::graph::{FileGraph, NodeId};
use crate::models::{DirectiveKind, FileKind};

/// Identifier the merged bibliography artifact is published under; every
/// bibliography directive in the flattened text is rewritten to it.
pub const MERGED_BIB_NAME: &str = "merged";

/// Result of flattening a validated graph
#[derive(Debug, Clone)]
pub struct FlattenOutcome {
    /// The single self-contained document text
    pub text: String,
    /// Nodes whose content actually ended up in the output, in first-use order
    pub included: Vec<NodeId>,
}

/// Flatten the graph starting at its entry document.
pub fn flatten(graph: &FileGraph) -> FlattenOutcome {
    let mut memo: Vec<Option<String>> = vec![None; graph.len()];
    let mut included = Vec::new();
    let mut seen = vec![false; graph.len()];

    let text = flatten_node(graph, graph.entry(), &mut memo, &mut included, &mut seen);
    FlattenOutcome { text, included }
}

fn flatten_node(
    graph: &FileGraph,
    id: NodeId,
    memo: &mut Vec<Option<String>>,
    included: &mut Vec<NodeId>,
    seen: &mut Vec<bool>,
) -> String {
    if let Some(cached) = &memo[id] {
        return cached.clone();
    }
    if !seen[id] {
        seen[id] = true;
        included.push(id);
    }

    let node = graph.node(id);
    let content = node.content.as_str();
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0usize;

    // Spans already consumed; bibliography comma lists share one span and
    // must be rewritten exactly once.
    let mut consumed: BTreeSet<usize> = BTreeSet::new();

    for edge in graph.edges(id) {
        let span = edge.reference.span.clone();
        if consumed.contains(&span.start) {
            continue;
        }
        out.push_str(&content[cursor..span.start]);

        match edge.reference.kind {
            DirectiveKind::Bibliography => {
                out.push_str(&format!("\\bibliography{{{MERGED_BIB_NAME}}}"));
            }
            DirectiveKind::Input | DirectiveKind::Include => {
                if edge.cyclic {
                    // Dropped cycle-closing edge: the directive vanishes.
                } else {
                    match edge.target {
                        Some(t) if graph.node(t).kind == FileKind::Document => {
                            let expanded = flatten_node(graph, t, memo, included, seen);
                            out.push_str(&expanded);
                        }
                        // Missing target or asset: directive stays as written.
                        _ => out.push_str(&content[span.clone()]),
                    }
                }
            }
        }

        consumed.insert(span.start);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);

    memo[id] = Some(out.clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FileGraph;
    use crate::report::ResolutionReport;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn flatten_project(root: &Path, entry: &str) -> (FlattenOutcome, ResolutionReport) {
        let mut report = ResolutionReport::new();
        let graph = FileGraph::build(root, Path::new(entry), None, &mut report).unwrap();
        (flatten(&graph), report)
    }

    #[test]
    fn test_flatten_substitutes_input() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "before \\input{sections/intro} after");
        write(dir.path(), "sections/intro.tex", "Hello");

        let (outcome, report) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "before Hello after");
        assert!(report.is_clean());
    }

    #[test]
    fn test_flatten_nested_includes() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{mid}");
        write(dir.path(), "mid.tex", "[\\input{leaf}]");
        write(dir.path(), "leaf.tex", "L");

        let (outcome, _) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "[L]");
    }

    #[test]
    fn test_flatten_missing_leaves_directive_untouched() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "x \\input{missing} y");

        let (outcome, report) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "x \\input{missing} y");
        assert!(report.has_missing());
    }

    #[test]
    fn test_flatten_shared_include_verbatim_at_each_occurrence() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{shared}|\\input{shared}");
        write(dir.path(), "shared.tex", "S");

        let (outcome, _) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "S|S");
        // Shared node flattened once, listed once.
        assert_eq!(outcome.included.len(), 2);
    }

    #[test]
    fn test_flatten_diamond_terminates_and_duplicates() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{left}\\input{right}");
        write(dir.path(), "left.tex", "L(\\input{shared})");
        write(dir.path(), "right.tex", "R(\\input{shared})");
        write(dir.path(), "shared.tex", "S");

        let (outcome, _) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "L(S)R(S)");
    }

    #[test]
    fn test_flatten_cycle_includes_target_once() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.tex", "A[\\input{b}]");
        write(dir.path(), "b.tex", "B[\\input{a}]");

        let (outcome, report) = flatten_project(dir.path(), "a.tex");
        assert_eq!(outcome.text, "A[B[]]");
        assert_eq!(report.cycles().len(), 1);
    }

    #[test]
    fn test_flatten_self_include_terminates() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.tex", "A\\input{a}Z");

        let (outcome, report) = flatten_project(dir.path(), "a.tex");
        assert_eq!(outcome.text, "AZ");
        assert_eq!(report.cycles().len(), 1);
    }

    #[test]
    fn test_flatten_rewrites_bibliography_directive() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "text\n\\bibliography{refs,extra}\n");
        write(dir.path(), "refs.bib", "@misc{a, title={A}}");
        write(dir.path(), "extra.bib", "@misc{b, title={B}}");

        let (outcome, _) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "text\n\\bibliography{merged}\n");
    }

    #[test]
    fn test_flatten_rewrites_missing_bibliography_too() {
        // The merged artifact is still the single bibliography identity,
        // even when one of its sources was missing.
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\bibliography{gone}");

        let (outcome, report) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "\\bibliography{merged}");
        assert!(report.has_missing());
    }

    #[test]
    fn test_flatten_asset_reference_untouched() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "\\input{figure.pgf}");
        write(dir.path(), "figure.pgf", "binaryish");

        let (outcome, _) = flatten_project(dir.path(), "main.tex");
        assert_eq!(outcome.text, "\\input{figure.pgf}");
    }

    #[test]
    fn test_flatten_idempotent_on_acyclic_output() {
        let dir = tempdir().unwrap();
        write(dir.path(), "main.tex", "A \\input{b} C\n");
        write(dir.path(), "b.tex", "B");

        let (first, _) = flatten_project(dir.path(), "main.tex");

        // Re-flatten the output as a fresh entry document.
        let dir2 = tempdir().unwrap();
        write(dir2.path(), "main.tex", &first.text);
        let (second, _) = flatten_project(dir2.path(), "main.tex");
        assert_eq!(second.text, first.text);
    }
}
