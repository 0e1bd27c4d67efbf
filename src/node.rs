//! The tree data model shared by every other module.
//!
//! A [`Node`] owns its children outright. Trees are built once by the scanner
//! or the parser and are read-only afterwards, so there are no parent links
//! and no shared ownership.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem metadata captured by the scanner. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    /// Permission bits on Unix, 0 elsewhere.
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub is_symlink: bool,
}

impl FileInfo {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode()
        };
        #[cfg(not(unix))]
        let mode = 0;

        FileInfo {
            size: metadata.len(),
            mode,
            modified: metadata.modified().ok(),
            is_symlink: metadata.file_type().is_symlink(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub is_dir: bool,
    #[serde(skip)]
    pub info: Option<FileInfo>,
    /// Lowercase hex SHA-256. Files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Node {
            name: name.into(),
            path: None,
            is_dir,
            info: None,
            hash: None,
            children: Vec::new(),
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder-style variant of [`Node::push_child`].
    pub fn with_child(mut self, child: Node) -> Self {
        self.push_child(child);
        self
    }

    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pre-order traversal, the node itself first.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Recursively reorders children: directories first, then files, each
    /// group by name.
    pub fn sort_children(&mut self) {
        self.children.sort_by(sibling_order);
        for child in &mut self.children {
            child.sort_children();
        }
    }

    /// Structural equality: name, kind and children, ignoring hash, path and
    /// metadata.
    pub fn same_shape(&self, other: &Node) -> bool {
        self.name == other.name
            && self.is_dir == other.is_dir
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }
}

/// Sibling ordering used for every directory listing.
pub fn sibling_order(a: &Node, b: &Node) -> std::cmp::Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name))
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_dirs: usize,
    pub total_files: usize,
    /// Deepest level reached; the root is level 0.
    pub max_depth: usize,
}

impl TreeStats {
    pub fn calculate(root: &Node) -> Self {
        let mut stats = TreeStats::default();
        stats.visit(root, 0);
        stats
    }

    fn visit(&mut self, node: &Node, depth: usize) {
        if node.is_dir {
            self.total_dirs += 1;
        } else {
            self.total_files += 1;
        }
        self.max_depth = self.max_depth.max(depth);
        for child in &node.children {
            self.visit(child, depth + 1);
        }
    }

    pub fn total_items(&self) -> usize {
        self.total_dirs + self.total_files
    }
}
