use crate::node::{Node, TreeStats};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl SnapshotError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            SnapshotError::PermissionDenied(path.to_path_buf())
        } else {
            SnapshotError::Io(e)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_dirs: usize,
    pub total_files: usize,
    pub max_depth: usize,
    pub total_items: usize,
}

impl From<TreeStats> for SnapshotStats {
    fn from(stats: TreeStats) -> Self {
        SnapshotStats {
            total_dirs: stats.total_dirs,
            total_files: stats.total_files,
            max_depth: stats.max_depth,
            total_items: stats.total_items(),
        }
    }
}

/// A persisted tree, one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tree: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SnapshotStats>,
}

impl Snapshot {
    pub fn new(tree: Node, stats: Option<TreeStats>) -> Self {
        Snapshot {
            tree,
            stats: stats.map(SnapshotStats::from),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Pretty-printed, with a trailing newline.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_toml(content: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, SnapshotError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads a snapshot, as TOML when the extension is `.toml` and JSON
    /// otherwise.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SnapshotError::from_io(e, path))?;

        debug!("Loading snapshot from {}", path.display());

        if is_toml(path) {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Save the snapshot atomically.
    ///
    /// Writes to a temporary file next to `path`, fsyncs it, then renames it
    /// into place.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        use std::io::Write;

        let content = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_json()?
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| SnapshotError::from_io(e, parent))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| SnapshotError::from_io(e, path))?;

        temp_file.as_file().sync_all().map_err(SnapshotError::Io)?;

        temp_file
            .persist(path)
            .map_err(|e| SnapshotError::from_io(e.error, path))?;

        debug!("Saved snapshot to {}", path.display());

        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Node {
        Node::dir("project")
            .with_child(
                Node::dir("src").with_child(Node::file("main.go").with_hash("4b68ab38")),
            )
            .with_child(Node::dir("empty"))
            .with_child(Node::file("README.md").with_hash("18f5384d"))
    }

    #[test]
    fn json_shape_omits_absent_fields() {
        let snapshot = Snapshot::new(Node::dir("root").with_child(Node::file("a")), None);

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "tree": {
                    "name": "root",
                    "is_dir": true,
                    "children": [{ "name": "a", "is_dir": false }]
                }
            })
        );
    }

    #[test]
    fn stats_are_written_with_total_items() {
        let tree = sample();
        let stats = TreeStats::calculate(&tree);
        let snapshot = Snapshot::new(tree, Some(stats));

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(
            value["stats"],
            serde_json::json!({
                "total_dirs": 3,
                "total_files": 2,
                "max_depth": 2,
                "total_items": 5
            })
        );
    }

    #[test]
    fn json_text_loads_back() {
        let snapshot = Snapshot::new(sample(), None);

        let loaded = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn toml_text_loads_back() {
        let tree = sample();
        let stats = TreeStats::calculate(&tree);
        let snapshot = Snapshot::new(tree, Some(stats));

        let toml = snapshot.to_toml().unwrap();
        assert!(toml.contains("[tree]"), "unexpected TOML layout:\n{toml}");

        let loaded = Snapshot::from_toml(&toml).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn hand_written_json_is_accepted() {
        let content = r#"{
            "tree": {
                "name": "root",
                "is_dir": true,
                "children": [
                    { "name": "a.txt", "is_dir": false, "hash": "abc", "path": "root/a.txt" }
                ]
            }
        }"#;

        let snapshot = Snapshot::from_json(content).unwrap();

        let child = &snapshot.tree.children[0];
        assert_eq!(child.hash.as_deref(), Some("abc"));
        assert_eq!(child.path(), Some(Path::new("root/a.txt")));
        assert!(snapshot.stats.is_none());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result = Snapshot::from_json("{ not json");

        assert!(matches!(result, Err(SnapshotError::Json(_))));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let result = Snapshot::from_toml("tree = [");

        assert!(matches!(result, Err(SnapshotError::TomlParse(_))));
    }

    #[test]
    fn save_picks_format_from_extension() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(sample(), None);

        let json_path = temp_dir.path().join("snap.json");
        let toml_path = temp_dir.path().join("snap.toml");
        snapshot.save(&json_path).unwrap();
        snapshot.save(&toml_path).unwrap();

        let json = std::fs::read_to_string(&json_path).unwrap();
        let toml = std::fs::read_to_string(&toml_path).unwrap();
        assert!(json.trim_start().starts_with('{'));
        assert!(toml.contains("[tree]"));

        assert_eq!(Snapshot::load(&json_path).unwrap(), snapshot);
        assert_eq!(Snapshot::load(&toml_path).unwrap(), snapshot);
    }

    #[test]
    fn save_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snap.json");
        std::fs::write(&path, "old content").unwrap();

        let snapshot = Snapshot::new(sample(), None);
        snapshot.save(&path).unwrap();

        assert_eq!(Snapshot::load(&path).unwrap(), snapshot);
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn load_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = Snapshot::load(&temp_dir.path().join("missing.json"));

        match result {
            Err(SnapshotError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got {other:?}"),
        }
    }
}
