//! File-dependency graph
//!
//! Builds a directed graph of project files from an entry document by
//! following include directives, then validates it: cycle-closing edges are
//! marked (and later dropped by the flattener) and a deterministic
//! breadth-first discovery order is fixed for the bibliography merger.
//!
//! Each file is read and parsed at most once; repeated references to the
//! same resolved path reuse the existing node, so shared includes form a
//! graph, not a tree.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::warn;

use crate::error::{TexflatError, TexflatResult};
use crate::models::{DirectiveKind, FileKind, ProjectFile, Reference, ResolveBase};
use crate::report::{FileStatus, ResolutionReport};

/// Index of a node in the graph's arena
pub type NodeId = usize;

/// One resolved include directive: the reference plus the node it points to
/// (if any). Edges for a node are in document order of their references.
#[derive(Debug, Clone)]
pub struct Edge {
    pub reference: Reference,
    /// Resolved target node; `None` when the target could not be found
    pub target: Option<NodeId>,
    /// Marked during validation; the flattener does not follow cyclic edges
    pub cyclic: bool,
}

/// Directed graph of project files, built once per resolution run
#[derive(Debug)]
pub struct FileGraph {
    nodes: Vec<ProjectFile>,
    edges: Vec<Vec<Edge>>,
    index: HashMap<PathBuf, NodeId>,
    entry: NodeId,
    discovery: Vec<NodeId>,
}

impl FileGraph {
    /// Build the graph rooted at `entry` (a path relative to `root`).
    ///
    /// A missing or unreadable entry document is fatal; any other
    /// unresolvable target is recorded in the report as missing and the
    /// directive is left in place. `max_depth`, when set, stops following
    /// references in files nested at or beyond the given include level.
    pub fn build(
        root: &Path,
        entry: &Path,
        max_depth: Option<usize>,
        report: &mut ResolutionReport,
    ) -> TexflatResult<Self> {
        let entry_rel = normalize(entry).ok_or_else(|| TexflatError::ProjectNotFound {
            path: entry.to_path_buf(),
        })?;
        if !root.join(&entry_rel).is_file() {
            return Err(TexflatError::ProjectNotFound {
                path: root.join(&entry_rel),
            });
        }

        let mut builder = Builder {
            root,
            report,
            nodes: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
        };

        let entry_id = match builder.load(entry_rel.clone(), FileKind::Document) {
            Some(id) => id,
            None => {
                return Err(TexflatError::ProjectNotFound {
                    path: root.join(entry_rel),
                })
            }
        };

        // Breadth-first expansion; each node's edges are resolved exactly once.
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        let mut scheduled = vec![true];
        queue.push_back((entry_id, 0));
        while let Some((id, depth)) = queue.pop_front() {
            if let Some(limit) = max_depth {
                if depth >= limit {
                    continue;
                }
            }
            let references = builder.nodes[id].references.clone();
            for reference in references {
                let target = builder.resolve_reference(id, &reference);
                if let Some(t) = target {
                    if scheduled.len() <= t {
                        scheduled.resize(t + 1, false);
                    }
                    if !scheduled[t] && builder.nodes[t].kind == FileKind::Document {
                        scheduled[t] = true;
                        queue.push_back((t, depth + 1));
                    }
                }
                builder.edges[id].push(Edge {
                    reference,
                    target,
                    cyclic: false,
                });
            }
        }

        let mut graph = FileGraph {
            nodes: builder.nodes,
            edges: builder.edges,
            index: builder.index,
            entry: entry_id,
            discovery: Vec::new(),
        };
        graph.validate(report);
        Ok(graph)
    }

    /// Mark cycle-closing edges and fix the breadth-first discovery order.
    ///
    /// Depth-first traversal with a per-node visitation state; a back edge
    /// to an in-progress node closes a cycle and is marked instead of
    /// followed. The edge discovered last in traversal order is the one
    /// dropped.
    fn validate(&mut self, report: &mut ResolutionReport) {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            InProgress,
            Done,
        }

        let mut states = vec![State::Unvisited; self.nodes.len()];
        let mut stack: Vec<(NodeId, usize)> = vec![(self.entry, 0)];
        states[self.entry] = State::InProgress;

        while let Some(&(node, edge_idx)) = stack.last() {
            if edge_idx >= self.edges[node].len() {
                states[node] = State::Done;
                stack.pop();
                continue;
            }
            stack.last_mut().unwrap().1 += 1;

            let Some(target) = self.edges[node][edge_idx].target else {
                continue;
            };
            if self.nodes[target].kind != FileKind::Document {
                continue;
            }
            match states[target] {
                State::Unvisited => {
                    states[target] = State::InProgress;
                    stack.push((target, 0));
                }
                State::InProgress => {
                    self.edges[node][edge_idx].cyclic = true;
                    let from = self.nodes[node].path.clone();
                    let to = self.nodes[target].path.clone();
                    warn!("include cycle: {} -> {}", from.display(), to.display());
                    report.record_cycle(&from, &to);
                    report.record(&to, FileStatus::Cyclic);
                }
                State::Done => {}
            }
        }

        // Discovery order for the bibliography merger: breadth-first from
        // the entry, edges in document order, cyclic edges excluded.
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        seen[self.entry] = true;
        queue.push_back(self.entry);
        while let Some(id) = queue.pop_front() {
            self.discovery.push(id);
            for edge in &self.edges[id] {
                if edge.cyclic {
                    continue;
                }
                if let Some(t) = edge.target {
                    if !seen[t] {
                        seen[t] = true;
                        queue.push_back(t);
                    }
                }
            }
        }
    }

    /// Entry document node
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn node(&self, id: NodeId) -> &ProjectFile {
        &self.nodes[id]
    }

    pub fn edges(&self, id: NodeId) -> &[Edge] {
        &self.edges[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node id for a root-relative path, if it is part of the graph.
    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// Breadth-first discovery order from the entry document.
    pub fn discovery_order(&self) -> &[NodeId] {
        &self.discovery
    }

    /// Bibliography nodes in discovery order.
    pub fn bibliography_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.discovery
            .iter()
            .copied()
            .filter(|&id| self.nodes[id].kind == FileKind::Bibliography)
    }
}

struct Builder<'a> {
    root: &'a Path,
    report: &'a mut ResolutionReport,
    nodes: Vec<ProjectFile>,
    edges: Vec<Vec<Edge>>,
    index: HashMap<PathBuf, NodeId>,
}

impl Builder<'_> {
    /// Resolve one written target against the referencing file's directory,
    /// then the project root, preferring an exact match over extension
    /// candidates within each base.
    fn resolve_reference(&mut self, from: NodeId, reference: &Reference) -> Option<NodeId> {
        let parent = self.nodes[from]
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut bases: Vec<PathBuf> = match reference.base {
            ResolveBase::CurrentFile => vec![parent, PathBuf::new()],
            ResolveBase::ProjectRoot => vec![PathBuf::new()],
        };
        bases.dedup();

        let written = Path::new(&reference.target);
        let mut names = vec![reference.target.clone()];
        if written.extension().is_none() {
            names.push(format!(
                "{}.{}",
                reference.target,
                reference.kind.default_extension()
            ));
        }

        for base in &bases {
            for name in &names {
                let Some(rel) = normalize(&base.join(name)) else {
                    continue;
                };
                if self.root.join(&rel).is_file() {
                    // An extensionless match takes the kind the directive
                    // implies; anything else is classified by extension.
                    let kind = if rel.extension().is_some() {
                        FileKind::from_path(&rel)
                    } else {
                        match reference.kind {
                            DirectiveKind::Bibliography => FileKind::Bibliography,
                            _ => FileKind::Document,
                        }
                    };
                    return self.load(rel, kind);
                }
            }
        }

        // Not found under any candidate: record the primary candidate
        // (referencing directory, default extension) as missing.
        let primary = normalize(&bases[0].join(names.last().unwrap()))
            .unwrap_or_else(|| PathBuf::from(&reference.target));
        warn!(
            "unresolved {:?} target {} (looked for {})",
            reference.kind,
            reference.target,
            primary.display()
        );
        self.report.record(&primary, FileStatus::Missing);
        None
    }

    /// Get or create the node for a root-relative path.
    ///
    /// Documents and bibliographies are read into memory; an unreadable or
    /// non-UTF-8 file degrades to missing rather than aborting the run.
    /// Assets are tracked by path only, their bytes are never loaded.
    fn load(&mut self, rel: PathBuf, kind: FileKind) -> Option<NodeId> {
        if let Some(&id) = self.index.get(&rel) {
            return Some(id);
        }

        let content = match kind {
            FileKind::Asset => String::new(),
            _ => match fs::read_to_string(self.root.join(&rel)) {
                Ok(content) => content,
                Err(err) => {
                    warn!("failed to read {}: {err}", rel.display());
                    self.report.record(&rel, FileStatus::Missing);
                    return None;
                }
            },
        };

        let status = match kind {
            FileKind::Asset => FileStatus::SkippedAsset,
            _ => FileStatus::Resolved,
        };
        self.report.record(&rel, status);

        let id = self.nodes.len();
        self.nodes.push(ProjectFile::new(rel.clone(), content, kind));
        self.edges.push(Vec::new());
        self.index.insert(rel, id);
        Some(id)
    }
}

/// Lexically normalize a path: strip `.` components and resolve `..`
/// against earlier components. Returns `None` when the path would escape
/// the project root.
pub(crate) fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}
