//! Rendering of [`Node`] trees as `tree`-style text.

use crate::node::{Node, TreeStats};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotStats};
use serde::Serialize;
use std::io::Write;
use std::time::SystemTime;

const MID: &str = "├── ";
const LAST: &str = "└── ";
const BAR: &str = "│   ";
const BLANK: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Append `/` to directory names. Needed for the output to parse back.
    pub dir_slash: bool,
    pub show_hash: bool,
    pub show_size: bool,
    pub show_date: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig {
            dir_slash: true,
            show_hash: false,
            show_size: false,
            show_date: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: FormatConfig,
}

impl Formatter {
    pub fn new(config: FormatConfig) -> Self {
        Formatter { config }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Renders `root` and its descendants, one line per node, children in
    /// stored order. Every line ends in a newline.
    pub fn format(&self, root: &Node) -> String {
        let mut out = String::new();
        self.write_entry(&mut out, root);
        self.write_children(&mut out, &root.children, "");
        out
    }

    fn write_children(&self, out: &mut String, children: &[Node], prefix: &str) {
        for (index, child) in children.iter().enumerate() {
            let is_last = index + 1 == children.len();

            out.push_str(prefix);
            out.push_str(if is_last { LAST } else { MID });
            self.write_entry(out, child);

            if !child.children.is_empty() {
                let nested = format!("{prefix}{}", if is_last { BLANK } else { BAR });
                self.write_children(out, &child.children, &nested);
            }
        }
    }

    fn write_entry(&self, out: &mut String, node: &Node) {
        out.push_str(&node.name);
        if node.is_dir && self.config.dir_slash {
            out.push('/');
        }

        if self.config.show_hash
            && let Some(hash) = &node.hash
        {
            out.push_str("  [");
            out.push_str(hash);
            out.push(']');
        }

        if let Some(details) = self.details(node) {
            out.push_str("  (");
            out.push_str(&details);
            out.push(')');
        }

        out.push('\n');
    }

    fn details(&self, node: &Node) -> Option<String> {
        let info = node.info.as_ref()?;

        let mut parts = Vec::new();
        if self.config.show_size && !node.is_dir {
            parts.push(format_size(info.size));
        }
        if self.config.show_date
            && let Some(modified) = info.modified
        {
            parts.push(format_mtime(modified));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    /// One `<hash>  <path>` line per hashed file, in the same format
    /// `sha256sum` reads. Paths start at the root's name.
    pub fn format_flat_hashes(&self, root: &Node) -> String {
        let mut out = String::new();
        flat_hashes(&mut out, root, "");
        out
    }

    pub fn format_json(
        &self,
        root: &Node,
        stats: Option<&TreeStats>,
    ) -> Result<String, SnapshotError> {
        Snapshot::new(root.clone(), stats.copied()).to_json()
    }

    /// Writes the tree as newline-delimited JSON: a `begin` line, one `node`
    /// line per entry in pre-order, an optional `stats` line and an `end`
    /// line. Each line is `{"type": ..., "data": ...}`.
    pub fn format_json_stream<W: Write>(
        &self,
        mut writer: W,
        root: &Node,
        stats: Option<&TreeStats>,
    ) -> Result<(), SnapshotError> {
        write_message(&mut writer, &StreamMessage::Begin { root: &root.name })?;

        let mut nodes = 0;
        stream_nodes(&mut writer, root, "", 0, &mut nodes)?;

        if let Some(stats) = stats {
            write_message(&mut writer, &StreamMessage::Stats((*stats).into()))?;
        }
        write_message(&mut writer, &StreamMessage::End { nodes })?;

        writer.flush().map_err(SnapshotError::Io)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum StreamMessage<'a> {
    Begin { root: &'a str },
    Node(StreamNode<'a>),
    Stats(SnapshotStats),
    End { nodes: usize },
}

#[derive(Serialize)]
struct StreamNode<'a> {
    path: String,
    name: &'a str,
    is_dir: bool,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

fn write_message<W: Write>(writer: &mut W, message: &StreamMessage) -> Result<(), SnapshotError> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n").map_err(SnapshotError::Io)
}

fn stream_nodes<W: Write>(
    writer: &mut W,
    node: &Node,
    parent: &str,
    depth: usize,
    count: &mut usize,
) -> Result<(), SnapshotError> {
    let path = if parent.is_empty() {
        node.name.clone()
    } else {
        format!("{parent}/{}", node.name)
    };

    let size = match &node.info {
        Some(info) if !node.is_dir => Some(info.size),
        _ => None,
    };
    write_message(
        writer,
        &StreamMessage::Node(StreamNode {
            path: path.clone(),
            name: &node.name,
            is_dir: node.is_dir,
            depth,
            hash: node.hash.as_deref(),
            size,
        }),
    )?;
    *count += 1;

    for child in &node.children {
        stream_nodes(writer, child, &path, depth + 1, count)?;
    }
    Ok(())
}

fn flat_hashes(out: &mut String, node: &Node, parent: &str) {
    let path = if parent.is_empty() {
        node.name.clone()
    } else {
        format!("{parent}/{}", node.name)
    };

    if !node.is_dir
        && let Some(hash) = &node.hash
    {
        out.push_str(hash);
        out.push_str("  ");
        out.push_str(&path);
        out.push('\n');
    }

    for child in &node.children {
        flat_hashes(out, child, &path);
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_mtime(time: SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}
