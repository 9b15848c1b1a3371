//! Hierarchical region taxonomy.
//!
//! The taxonomy of anatomical structures is strictly tree-shaped: every
//! region except the root has exactly one parent, and each region row
//! declares its full root-to-node identifier path. [`RegionTree::build`]
//! validates the flat table once (a malformed table is a structural error
//! with a diagnostic naming the offending region, never a partially built
//! tree) and all queries afterwards run in O(depth) or O(subtree).

mod node;
mod table;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use node::{read_region_records, RegionNode, RegionRecord};
pub use table::{RegionRow, RegionTable};

/// Errors raised when a flat region table does not describe a valid tree.
#[derive(Debug, Error)]
pub enum StructuralError {
    /// The region table file could not be read.
    #[error("failed to read region table {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// The region table file is not valid JSON.
    #[error("failed to parse region table {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The table contains no rows.
    #[error("region table is empty")]
    Empty,

    /// No row declares itself the root (a single-element path).
    #[error("region table has no root region")]
    MissingRoot,

    /// More than one row declares itself the root.
    #[error("region table has multiple roots: {first} and {second}")]
    MultipleRoots { first: u32, second: u32 },

    /// Two rows share an identifier.
    #[error("duplicate region id {id}")]
    DuplicateId { id: u32 },

    /// Two rows share an acronym.
    #[error("acronym {acronym:?} is shared by regions {first} and {second}")]
    DuplicateAcronym {
        acronym: String,
        first: u32,
        second: u32,
    },

    /// A row's path does not end with its own identifier.
    #[error("region {id}: path must end with the region's own id")]
    PathTail { id: u32 },

    /// A row's path does not start at the root.
    #[error("region {id}: path starts at {found}, expected root {root}")]
    PathHead { id: u32, found: u32, root: u32 },

    /// A row lists itself among its own ancestors.
    #[error("region {id}: path lists the region as its own ancestor")]
    CyclicPath { id: u32 },

    /// A path references an identifier with no corresponding row.
    #[error("region {id}: ancestor {missing} does not exist")]
    MissingAncestor { id: u32, missing: u32 },

    /// A row's path disagrees with its parent's path.
    #[error("region {id}: path is not an extension of parent {parent}'s path")]
    BrokenPath { id: u32, parent: u32 },
}

/// Errors raised when a region lookup misses.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No region with the given identifier or acronym.
    #[error("no region {key} in this atlas")]
    NotFound { key: String },
}

/// A region lookup key: numeric identifier or acronym.
///
/// # Example
///
/// ```
/// use brainatlas::tree::RegionKey;
///
/// let by_id: RegionKey = 997.into();
/// let by_acronym: RegionKey = "CTX".into();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionKey {
    /// Lookup by numeric identifier.
    Id(u32),
    /// Lookup by acronym.
    Acronym(String),
}

impl From<u32> for RegionKey {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RegionKey {
    fn from(acronym: &str) -> Self {
        Self::Acronym(acronym.to_string())
    }
}

impl From<String> for RegionKey {
    fn from(acronym: String) -> Self {
        Self::Acronym(acronym)
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Acronym(acronym) => write!(f, "{:?}", acronym),
        }
    }
}

/// Validated tree of anatomical regions.
///
/// Nodes live in an arena indexed by identifier; parent/child relations are
/// stored as identifier references, so the structure is acyclic by
/// construction once validation passes.
///
/// # Example
///
/// ```
/// use brainatlas::tree::{RegionRecord, RegionTree};
///
/// let records: Vec<RegionRecord> = serde_json::from_str(r#"[
///     {"id": 1, "acronym": "grey", "name": "Grey matter",
///      "structure_id_path": [1], "rgb_triplet": [128, 128, 128]},
///     {"id": 2, "acronym": "CH", "name": "Cerebrum",
///      "structure_id_path": [1, 2], "rgb_triplet": [176, 240, 255]}
/// ]"#).unwrap();
///
/// let tree = RegionTree::build(records).unwrap();
/// assert_eq!(tree.root().id(), 1);
/// assert_eq!(tree.get("CH").unwrap().id(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RegionTree {
    nodes: HashMap<u32, RegionNode>,
    by_acronym: HashMap<String, u32>,
    children: HashMap<u32, Vec<u32>>,
    root: u32,
}

impl RegionTree {
    /// Build and validate a tree from a flat region table.
    ///
    /// Validation runs in two passes: the first indexes rows by identifier
    /// and rejects duplicates, the second checks every declared path for
    /// self-consistency (ends in the row's own id, starts at the single
    /// root, lists only existing regions, extends the parent's path by
    /// exactly one element). Any violation aborts the build.
    pub fn build(records: Vec<RegionRecord>) -> Result<Self, StructuralError> {
        if records.is_empty() {
            return Err(StructuralError::Empty);
        }

        // Pass 1: index by id and acronym, find the root.
        let mut nodes: HashMap<u32, RegionNode> = HashMap::with_capacity(records.len());
        let mut by_acronym: HashMap<String, u32> = HashMap::with_capacity(records.len());
        let mut root: Option<u32> = None;

        for record in records {
            let id = record.id;

            if let Some(&first) = by_acronym.get(&record.acronym) {
                return Err(StructuralError::DuplicateAcronym {
                    acronym: record.acronym,
                    first,
                    second: id,
                });
            }

            if record.structure_id_path.len() == 1 && record.structure_id_path[0] == id {
                match root {
                    None => root = Some(id),
                    Some(first) => {
                        return Err(StructuralError::MultipleRoots { first, second: id })
                    }
                }
            }

            by_acronym.insert(record.acronym.clone(), id);
            if nodes.insert(id, RegionNode::from_record(record)).is_some() {
                return Err(StructuralError::DuplicateId { id });
            }
        }

        let root = root.ok_or(StructuralError::MissingRoot)?;

        // Pass 2: validate every path against the index.
        for node in nodes.values() {
            let id = node.id();
            let path = node.path();

            if path.last() != Some(&id) {
                return Err(StructuralError::PathTail { id });
            }
            if path[0] != root {
                return Err(StructuralError::PathHead {
                    id,
                    found: path[0],
                    root,
                });
            }
            if path[..path.len() - 1].contains(&id) {
                return Err(StructuralError::CyclicPath { id });
            }

            for &ancestor in &path[..path.len() - 1] {
                if !nodes.contains_key(&ancestor) {
                    return Err(StructuralError::MissingAncestor {
                        id,
                        missing: ancestor,
                    });
                }
            }

            if let Some(parent) = node.parent_id() {
                let parent_path = nodes[&parent].path();
                if parent_path != &path[..path.len() - 1] {
                    return Err(StructuralError::BrokenPath { id, parent });
                }
            }
        }

        // Child index; ordered by id so traversals are deterministic.
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent) = node.parent_id() {
                children.entry(parent).or_default().push(node.id());
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_unstable();
        }

        Ok(Self {
            nodes,
            by_acronym,
            children,
            root,
        })
    }

    /// The designated root region.
    pub fn root(&self) -> &RegionNode {
        &self.nodes[&self.root]
    }

    /// Number of regions in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no regions. Always false for a built tree.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a region with the given key exists.
    pub fn contains(&self, key: impl Into<RegionKey>) -> bool {
        self.resolve(&key.into()).is_some()
    }

    /// Look up a region by identifier or acronym.
    pub fn get(&self, key: impl Into<RegionKey>) -> Result<&RegionNode, LookupError> {
        let key = key.into();
        self.resolve(&key)
            .ok_or_else(|| LookupError::NotFound {
                key: key.to_string(),
            })
    }

    /// Ancestors of a region, root-first, excluding the region itself.
    pub fn ancestors(&self, key: impl Into<RegionKey>) -> Result<Vec<&RegionNode>, LookupError> {
        let node = self.get(key)?;
        let path = node.path();
        Ok(path[..path.len() - 1]
            .iter()
            .map(|id| self.node(*id))
            .collect())
    }

    /// The full subtree rooted at a region, including the region itself.
    ///
    /// Order is deterministic (depth-first, children by ascending id) but
    /// callers should treat the result as a set.
    pub fn descendants(&self, key: impl Into<RegionKey>) -> Result<Vec<&RegionNode>, LookupError> {
        let start = self.get(key)?;

        let mut result = Vec::new();
        let mut stack = vec![start.id()];
        while let Some(id) = stack.pop() {
            result.push(self.node(id));
            if let Some(kids) = self.children.get(&id) {
                // Reverse so the lowest id is visited first.
                stack.extend(kids.iter().rev());
            }
        }

        Ok(result)
    }

    /// Immediate children of a region, ordered by id.
    pub fn children(&self, key: impl Into<RegionKey>) -> Result<Vec<&RegionNode>, LookupError> {
        let node = self.get(key)?;
        Ok(self
            .children
            .get(&node.id())
            .map(|ids| ids.iter().map(|id| self.node(*id)).collect())
            .unwrap_or_default())
    }

    /// Whether region `a` is a proper ancestor of region `b`.
    ///
    /// A region is never its own ancestor.
    pub fn is_ancestor_of(
        &self,
        a: impl Into<RegionKey>,
        b: impl Into<RegionKey>,
    ) -> Result<bool, LookupError> {
        let a = self.get(a)?.id();
        let b = self.get(b)?;
        Ok(a != b.id() && b.path().contains(&a))
    }

    /// Iterate over all regions in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &RegionNode> {
        self.nodes.values()
    }

    /// Project the tree into a flat table for inspection.
    pub fn to_table(&self) -> RegionTable {
        RegionTable::from_tree(self)
    }

    /// Export the tree back into flat records, ordered by id.
    ///
    /// Feeding the result into [`RegionTree::build`] reproduces an
    /// identical tree.
    pub fn to_records(&self) -> Vec<RegionRecord> {
        let mut records: Vec<RegionRecord> = self.nodes.values().map(|n| n.to_record()).collect();
        records.sort_unstable_by_key(|r| r.id);
        records
    }

    fn resolve(&self, key: &RegionKey) -> Option<&RegionNode> {
        match key {
            RegionKey::Id(id) => self.nodes.get(id),
            RegionKey::Acronym(acronym) => {
                self.by_acronym.get(acronym).and_then(|id| self.nodes.get(id))
            }
        }
    }

    /// Internal lookup for ids already validated at build time.
    fn node(&self, id: u32) -> &RegionNode {
        &self.nodes[&id]
    }
}
