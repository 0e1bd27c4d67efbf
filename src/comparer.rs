//! Differences between two trees.
//!
//! Both trees are flattened to `path -> entry` maps keyed by `/`-joined
//! paths starting at the root's name. Entries only on the left are removed,
//! only on the right are added, files on both sides with different hashes
//! are modified. With move detection on, a removed file and an added file
//! sharing a hash are reported as one move instead.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Moved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: String,
    /// Where a moved entry used to be.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
}

impl Change {
    /// `+`, `-`, `~` or `>` followed by the path.
    pub fn render_line(&self) -> String {
        match self.kind {
            ChangeKind::Added => format!("+ {}", self.path),
            ChangeKind::Removed => format!("- {}", self.path),
            ChangeKind::Modified => format!("~ {}", self.path),
            ChangeKind::Moved => format!(
                "> {} (from {})",
                self.path,
                self.old_path.as_deref().unwrap_or("?")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub moved: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified + self.moved
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified, {} moved",
            self.added, self.removed, self.modified, self.moved
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareResult {
    /// Removed, added, modified, then moved; each group sorted by path.
    pub changes: Vec<Change>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_label: Option<String>,
}

impl CompareResult {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn with_labels(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_label = Some(left.into());
        self.right_label = Some(right.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareConfig {
    /// Pair removed and added files by content hash.
    pub detect_moves: bool,
}

#[derive(Debug, Clone, Copy)]
struct FlatEntry<'a> {
    is_dir: bool,
    hash: Option<&'a str>,
}

type FlatTree<'a> = BTreeMap<String, FlatEntry<'a>>;

/// Compares two trees. Either side may be `None`, meaning an empty tree.
pub fn compare(left: Option<&Node>, right: Option<&Node>, config: &CompareConfig) -> CompareResult {
    let left = left.map(flatten).unwrap_or_default();
    let right = right.map(flatten).unwrap_or_default();

    let mut removed: Vec<Change> = left
        .iter()
        .filter(|(path, _)| !right.contains_key(*path))
        .map(|(path, entry)| Change {
            kind: ChangeKind::Removed,
            path: path.clone(),
            old_path: None,
            is_dir: entry.is_dir,
            old_hash: entry.hash.map(str::to_string),
            new_hash: None,
        })
        .collect();

    let mut added: Vec<Change> = right
        .iter()
        .filter(|(path, _)| !left.contains_key(*path))
        .map(|(path, entry)| Change {
            kind: ChangeKind::Added,
            path: path.clone(),
            old_path: None,
            is_dir: entry.is_dir,
            old_hash: None,
            new_hash: entry.hash.map(str::to_string),
        })
        .collect();

    let moved = if config.detect_moves {
        pair_moves(&mut removed, &mut added)
    } else {
        Vec::new()
    };

    let modified: Vec<Change> = left
        .iter()
        .filter_map(|(path, old)| {
            let new = right.get(path)?;
            if old.is_dir || new.is_dir {
                return None;
            }
            match (old.hash, new.hash) {
                (Some(old_hash), Some(new_hash)) if old_hash != new_hash => Some(Change {
                    kind: ChangeKind::Modified,
                    path: path.clone(),
                    old_path: None,
                    is_dir: false,
                    old_hash: Some(old_hash.to_string()),
                    new_hash: Some(new_hash.to_string()),
                }),
                _ => None,
            }
        })
        .collect();

    let summary = Summary {
        added: added.len(),
        removed: removed.len(),
        modified: modified.len(),
        moved: moved.len(),
    };

    let mut changes = removed;
    changes.extend(added);
    changes.extend(modified);
    changes.extend(moved);

    CompareResult {
        changes,
        summary,
        left_label: None,
        right_label: None,
    }
}

/// Turns removed/added pairs with equal hashes into moves. Each added file
/// takes the first unmatched removed file with its hash, both in path order.
fn pair_moves(removed: &mut Vec<Change>, added: &mut Vec<Change>) -> Vec<Change> {
    let mut removed_by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, change) in removed.iter().enumerate() {
        if let Some(hash) = change.old_hash.as_deref()
            && !change.is_dir
        {
            removed_by_hash.entry(hash).or_default().push(index);
        }
    }

    let mut removed_matched = vec![false; removed.len()];
    let mut added_matched = vec![false; added.len()];
    let mut moved = Vec::new();

    for (index, change) in added.iter().enumerate() {
        if change.is_dir {
            continue;
        }
        let Some(hash) = change.new_hash.as_deref() else {
            continue;
        };
        let Some(candidates) = removed_by_hash.get(hash) else {
            continue;
        };
        let Some(&source) = candidates.iter().find(|&&i| !removed_matched[i]) else {
            continue;
        };

        removed_matched[source] = true;
        added_matched[index] = true;
        moved.push(Change {
            kind: ChangeKind::Moved,
            path: change.path.clone(),
            old_path: Some(removed[source].path.clone()),
            is_dir: false,
            old_hash: Some(hash.to_string()),
            new_hash: Some(hash.to_string()),
        });
    }

    let mut matched = removed_matched.into_iter();
    removed.retain(|_| !matched.next().unwrap_or(false));
    let mut matched = added_matched.into_iter();
    added.retain(|_| !matched.next().unwrap_or(false));

    moved
}

fn flatten(root: &Node) -> FlatTree<'_> {
    let mut out = BTreeMap::new();
    flatten_into(root, "", &mut out);
    out
}

fn flatten_into<'a>(node: &'a Node, prefix: &str, out: &mut FlatTree<'a>) {
    let name = node.name.replace('\\', "/");
    let name = name.trim_end_matches('/');
    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    };

    for child in &node.children {
        flatten_into(child, &path, out);
    }

    let entry = FlatEntry {
        is_dir: node.is_dir,
        hash: node.hash.as_deref(),
    };
    match out.entry(path) {
        Entry::Occupied(mut slot) => {
            debug!("Two entries map to {}, keeping the later one", slot.key());
            slot.insert(entry);
        }
        Entry::Vacant(slot) => {
            slot.insert(entry);
        }
    }
}
