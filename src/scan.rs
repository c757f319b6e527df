//! Directive scanner for LaTeX sources
//!
//! Extracts include directives (`\input`, `\include`, `\bibliography` and
//! friends) and citation keys from raw LaTeX text. Scanning is line-based so
//! that commented-out directives (after an unescaped `%`) are ignored.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{DirectiveKind, Reference, ResolveBase};

static INPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(input|include)\s*\{([^{}]*)\}").unwrap());

static BIBLIOGRAPHY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:no)?bibliography\s*\{([^{}]*)\}").unwrap());

static ADDBIBRESOURCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\addbibresource(?:\[[^\]]*\])?\s*\{([^{}]*)\}").unwrap());

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(sub)?import\s*\{([^{}]*)\}\s*\{([^{}]*)\}").unwrap());

/// Citation command families: plain/natbib variants, biblatex variants,
/// multi-cite forms, and the full-cite commands.
static CITATION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\\cite(?:a|t|p|author|year|title|alp|num|text)?\*?(?:\[[^\]]*\])?\{([^{}]*)\}",
        r"\\(?:parencite|textcite|footcite|autocite|smartcite|supercite)(?:\[[^\]]*\])?\{([^{}]*)\}",
        r"\\(?:cite|parencite|textcite)s(?:\[[^\]]*\])?(?:\[[^\]]*\])?\{([^{}]*)\}",
        r"\\(?:footfullcite|fullcite|citeauthor|citetitle|citeyear)\{([^{}]*)\}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Scan LaTeX content for include directives.
///
/// Returns references in ascending byte-span order. Comma-separated
/// bibliography arguments yield one reference per target, all sharing the
/// directive's span.
pub fn scan_references(content: &str) -> Vec<Reference> {
    let mut refs = Vec::new();

    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let code = &line[..comment_start(line)];
        scan_line(code, offset, &mut refs);
        offset += line.len();
    }

    refs.sort_by_key(|r| r.span.start);
    refs
}

fn scan_line(code: &str, offset: usize, refs: &mut Vec<Reference>) {
    for caps in INPUT_RE.captures_iter(code) {
        let whole = caps.get(0).unwrap();
        let kind = match &caps[1] {
            "input" => DirectiveKind::Input,
            _ => DirectiveKind::Include,
        };
        refs.push(Reference {
            kind,
            target: caps[2].trim().to_string(),
            span: offset + whole.start()..offset + whole.end(),
            base: ResolveBase::CurrentFile,
        });
    }

    for caps in BIBLIOGRAPHY_RE.captures_iter(code) {
        let whole = caps.get(0).unwrap();
        push_bib_targets(&caps[1], offset + whole.start()..offset + whole.end(), refs);
    }

    for caps in ADDBIBRESOURCE_RE.captures_iter(code) {
        let whole = caps.get(0).unwrap();
        push_bib_targets(&caps[1], offset + whole.start()..offset + whole.end(), refs);
    }

    for caps in IMPORT_RE.captures_iter(code) {
        let whole = caps.get(0).unwrap();
        let base = if caps.get(1).is_some() {
            ResolveBase::CurrentFile
        } else {
            ResolveBase::ProjectRoot
        };
        refs.push(Reference {
            kind: DirectiveKind::Input,
            target: format!("{}{}", &caps[2], &caps[3]),
            span: offset + whole.start()..offset + whole.end(),
            base,
        });
    }
}

fn push_bib_targets(arg: &str, span: std::ops::Range<usize>, refs: &mut Vec<Reference>) {
    for target in arg.split(',') {
        let target = target.trim();
        if target.is_empty() {
            continue;
        }
        refs.push(Reference {
            kind: DirectiveKind::Bibliography,
            target: target.to_string(),
            span: span.clone(),
            base: ResolveBase::CurrentFile,
        });
    }
}

/// Byte index where the comment part of a line starts (the first `%` not
/// escaped by a backslash), or the line length if there is none.
fn comment_start(line: &str) -> usize {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' && (i == 0 || bytes[i - 1] != b'\\') {
            return i;
        }
    }
    line.len()
}

/// Collect every citation key referenced in the given (flattened) content.
pub fn cited_keys(content: &str) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for re in CITATION_RES.iter() {
        for caps in re.captures_iter(content) {
            for key in caps[1].split(',') {
                let key = key.trim();
                if !key.is_empty() {
                    keys.insert(key.to_string());
                }
            }
        }
    }
    keys
}
