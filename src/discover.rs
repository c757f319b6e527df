//! Project discovery helpers
//!
//! Locating the main document of an extracted source bundle and parsing
//! arXiv identifiers out of the strings users paste. Fetching the bundle
//! itself is a collaborator's job; nothing here touches the network.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TexflatError, TexflatResult};

static INPUT_OR_INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(input|include)\b").unwrap());

/// Well-known main-document file names
const MAIN_NAMES: &[&str] = &["main.tex", "paper.tex", "article.tex"];

/// Heuristically locate the main document of a project.
///
/// Every `.tex` file (case-insensitive) under the root is scored: a
/// well-known name, a `\documentclass`, a document environment, multiple
/// include directives and a bibliography marker all add points, and file
/// size adds up to five more. The best-scoring file wins; ties break on
/// path so the choice is stable across platforms. Returns `None` when the
/// project contains no readable `.tex` file.
pub fn find_main_file(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<(PathBuf, f64)> = Vec::new();

    for result in WalkBuilder::new(root).standard_filters(false).build() {
        let Ok(dent) = result else { continue };
        if !dent.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = dent.path();
        let is_tex = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tex"))
            .unwrap_or(false);
        if !is_tex {
            continue;
        }

        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };

        let mut score = 0.0;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if MAIN_NAMES.contains(&name.as_str()) {
            score += 5.0;
        }
        if content.contains(r"\documentclass") {
            score += 3.0;
        }
        if content.contains(r"\begin{document}") && content.contains(r"\end{document}") {
            score += 4.0;
        }
        if INPUT_OR_INCLUDE_RE.find_iter(&content).count() > 1 {
            score += 2.0;
        }
        if content.contains(r"\bibliography") || content.contains(r"\begin{thebibliography}") {
            score += 2.0;
        }
        score += (content.len() as f64 / 1000.0).min(5.0);

        debug!("main-file candidate {} scored {score:.2}", path.display());
        let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        candidates.push((rel, score));
    }

    candidates
        .into_iter()
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        })
        .map(|(path, _)| path)
}

/// Extract an arXiv identifier from an id or URL.
///
/// Accepted forms: a bare id (`2103.12345`, optionally `v#`), an abs URL
/// (`https://arxiv.org/abs/2103.12345`) or a pdf URL
/// (`https://arxiv.org/pdf/2103.12345.pdf`).
pub fn parse_arxiv_id(input: &str) -> TexflatResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TexflatError::InvalidArxivId {
            input: input.to_string(),
        });
    }

    if !input.starts_with("http") {
        return Ok(input.to_string());
    }

    let path = input
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(input);
    let last = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if path.contains("/pdf/") || path.contains("pdf") {
        let id = last.strip_suffix(".pdf").unwrap_or(last);
        if id.is_empty() {
            return Err(TexflatError::InvalidArxivId {
                input: input.to_string(),
            });
        }
        Ok(id.to_string())
    } else if path.contains("/abs/") || path.contains("abs") {
        if last.is_empty() {
            return Err(TexflatError::InvalidArxivId {
                input: input.to_string(),
            });
        }
        Ok(last.to_string())
    } else {
        Err(TexflatError::InvalidArxivId {
            input: input.to_string(),
        })
    }
}
