//! Bibliography parsing and merging
//!
//! A tolerant BibTeX reader plus the merger that folds every bibliography
//! source reachable from the entry document into one deduplicated entry
//! list. Entries are merged by citation key in breadth-first discovery
//! order; manual `thebibliography` environments found in the flattened text
//! contribute entries as well.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::graph::FileGraph;
use crate::models::BibEntry;
use crate::report::ResolutionReport;
use crate::scan::cited_keys;

static THEBIBLIOGRAPHY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\\begin\{thebibliography\}.*?\\end\{thebibliography\}").unwrap()
});

// The `regex` crate has no look-ahead, so the item text ("everything up
// to the next `\bibitem` or `\end{thebibliography}`") is sliced between
// header matches instead of captured in the pattern.
static BIBITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\bibitem(?:\[.*?\])?\{(.*?)\}").unwrap());

/// Parse a BibTeX database.
///
/// Tolerant: garbage between entries is skipped, `@string`, `@comment` and
/// `@preamble` blocks are ignored, and a malformed entry is dropped with a
/// warning instead of failing the file.
pub fn parse_bibtex(content: &str, source: &Path) -> Vec<BibEntry> {
    let mut entries = Vec::new();
    let mut parser = Parser {
        bytes: content.as_bytes(),
        pos: 0,
    };

    while parser.seek_entry() {
        match parser.entry(source) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(pos) => {
                warn!(
                    "skipping malformed BibTeX entry at byte {pos} in {}",
                    source.display()
                );
            }
        }
    }
    entries
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Advance to the next `@`, consuming it. False at end of input.
    fn seek_entry(&mut self) -> bool {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'@' {
                self.pos += 1;
                return true;
            }
            self.pos += 1;
        }
        false
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    /// Parse one entry; the leading `@` is already consumed. `Ok(None)`
    /// means a directive block (`@string` etc.) was skipped. `Err` carries
    /// the byte position of the problem.
    fn entry(&mut self, source: &Path) -> Result<Option<BibEntry>, usize> {
        let entry_type = self.ident().to_ascii_lowercase();
        self.skip_ws();

        let open = *self.bytes.get(self.pos).ok_or(self.pos)?;
        if open != b'{' && open != b'(' {
            return Err(self.pos);
        }
        let close = if open == b'{' { b'}' } else { b')' };
        self.pos += 1;

        if matches!(entry_type.as_str(), "string" | "comment" | "preamble") {
            self.skip_group(close)?;
            return Ok(None);
        }

        self.skip_ws();
        let key = self.key().trim().to_string();
        if key.is_empty() {
            return Err(self.pos);
        }
        if self.bytes.get(self.pos) == Some(&b',') {
            self.pos += 1;
        }

        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            match self.bytes.get(self.pos) {
                None => return Err(self.pos),
                Some(&b) if b == close => {
                    self.pos += 1;
                    break;
                }
                Some(&b',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let name = self.ident().to_ascii_lowercase();
            if name.is_empty() {
                return Err(self.pos);
            }
            self.skip_ws();
            if self.bytes.get(self.pos) != Some(&b'=') {
                return Err(self.pos);
            }
            self.pos += 1;
            self.skip_ws();
            let value = self.value(close)?;
            fields.push((name, value));
        }

        Ok(Some(BibEntry {
            key,
            entry_type,
            fields,
            source: source.to_path_buf(),
        }))
    }

    /// A field value: braced group, quoted string or bare token.
    fn value(&mut self, close: u8) -> Result<String, usize> {
        match self.bytes.get(self.pos) {
            Some(&b'{') => {
                self.pos += 1;
                let start = self.pos;
                let mut depth = 1usize;
                while self.pos < self.bytes.len() {
                    match self.bytes[self.pos] {
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                let raw = &self.bytes[start..self.pos];
                                self.pos += 1;
                                return Ok(normalize_value(raw));
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
                Err(start)
            }
            Some(&b'"') => {
                self.pos += 1;
                let start = self.pos;
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'"' {
                    self.pos += 1;
                }
                if self.pos >= self.bytes.len() {
                    return Err(start);
                }
                let raw = &self.bytes[start..self.pos];
                self.pos += 1;
                Ok(normalize_value(raw))
            }
            Some(_) => {
                let raw = self.until_any_or(b',', close);
                Ok(normalize_value(raw.as_bytes()))
            }
            None => Err(self.pos),
        }
    }

    /// Skip a balanced `{...}`/`(...)` group whose opener is consumed.
    fn skip_group(&mut self, close: u8) -> Result<(), usize> {
        let open = if close == b'}' { b'{' } else { b'(' };
        let mut depth = 1usize;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            if b == open {
                depth += 1;
            } else if b == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(self.pos)
    }

    /// Citation key: everything up to the separating comma. A stray `@`,
    /// brace or whitespace inside ends the key so a truncated entry does
    /// not swallow the one that follows it.
    fn key(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if matches!(b, b',' | b'}' | b')' | b'\n' | b'@' | b'{' | b' ' | b'\t') {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn until_any_or(&mut self, stop: u8, close: u8) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == stop || b == close {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

/// Collapse internal whitespace runs (BibTeX values may span lines).
fn normalize_value(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract entries from a manual `thebibliography` environment in the
/// flattened document. Each `\bibitem{key} text` becomes a `misc` entry
/// with the item text in a `note` field.
pub fn manual_bibliography(flattened: &str, source: &Path) -> Vec<BibEntry> {
    let Some(env) = THEBIBLIOGRAPHY_RE.find(flattened) else {
        return Vec::new();
    };
    let env = env.as_str();
    // `env` ends with `\end{thebibliography}` by construction; the last
    // item's text stops right before it.
    let text_end = env.len() - r"\end{thebibliography}".len();

    let headers: Vec<(usize, usize, String)> = BIBITEM_RE
        .captures_iter(env)
        .map(|caps| {
            let m = caps.get(0).unwrap();
            (m.start(), m.end(), caps[1].trim().to_string())
        })
        .collect();

    headers
        .iter()
        .enumerate()
        .filter_map(|(i, (_, note_start, key))| {
            if key.is_empty() {
                return None;
            }
            let note_end = headers.get(i + 1).map_or(text_end, |h| h.0);
            let note = env[*note_start..note_end]
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            Some(BibEntry {
                key: key.clone(),
                entry_type: "misc".to_string(),
                fields: vec![("note".to_string(), note)],
                source: source.to_path_buf(),
            })
        })
        .collect()
}

/// Merge every bibliography source reachable from the entry document.
///
/// Sources are visited in the graph's breadth-first discovery order; the
/// manual bibliography of the flattened text (if any) comes last. Entries
/// are deduplicated by citation key: identical duplicates collapse
/// silently, differing duplicates keep the earliest-discovered entry and
/// record a collision. Output order is first-discovery order.
pub fn merge_bibliographies(
    graph: &FileGraph,
    flattened: &str,
    report: &mut ResolutionReport,
) -> Vec<BibEntry> {
    let mut merged: Vec<BibEntry> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    let mut add = |entry: BibEntry, merged: &mut Vec<BibEntry>, report: &mut ResolutionReport| {
        match by_key.get(&entry.key) {
            None => {
                by_key.insert(entry.key.clone(), merged.len());
                merged.push(entry);
            }
            Some(&idx) => {
                let kept = &merged[idx];
                if !kept.same_content(&entry) {
                    report.record_collision(&entry.key, &kept.source, &entry.source);
                }
            }
        }
    };

    for id in graph.bibliography_nodes() {
        let node = graph.node(id);
        for entry in parse_bibtex(&node.content, &node.path) {
            add(entry, &mut merged, report);
        }
    }

    let entry_path = graph.node(graph.entry()).path.clone();
    for entry in manual_bibliography(flattened, &entry_path) {
        add(entry, &mut merged, report);
    }

    merged
}

/// Drop entries whose key is never cited in the flattened text.
pub fn prune_unreferenced(entries: Vec<BibEntry>, flattened: &str) -> Vec<BibEntry> {
    let cited = cited_keys(flattened);
    let before = entries.len();
    let kept: Vec<BibEntry> = entries
        .into_iter()
        .filter(|e| cited.contains(&e.key))
        .collect();
    if kept.len() < before {
        log::info!("pruned {}/{} unreferenced entries", before - kept.len(), before);
    }
    kept
}

/// Serialize a merged entry set back to BibTeX.
pub fn render_bibtex(entries: &[BibEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("@{}{{{},\n", entry.entry_type, entry.key));
        for (name, value) in &entry.fields {
            out.push_str(&format!("  {name} = {{{value}}},\n"));
        }
        out.push_str("}\n");
    }
    out
}
