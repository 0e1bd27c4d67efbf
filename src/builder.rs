//! Materializes a [`Node`] tree on disk.
//!
//! The root directory maps onto the target directory itself; everything
//! beneath it is created relative to that. Files are created empty and never
//! overwritten. What happens to entries that already exist is decided by
//! [`ConflictPolicy`]. There is no rollback: the first failure stops the build
//! and whatever was created up to that point stays.

use crate::cancel::CancelToken;
use crate::node::Node;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Build cancelled")]
    Cancelled,
    #[error("Invalid entry name {name:?}")]
    InvalidName { name: String },
    #[error("{}: expected a {expected}", path.display())]
    TypeMismatch { path: PathBuf, expected: &'static str },
    #[error("{} already exists", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to create file {}: {source}", path.display())]
    CreateFile { path: PathBuf, source: io::Error },
    #[error("IO error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// What to do when an entry of the tree is already on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep existing entries of the right kind and build around them. An
    /// entry of the wrong kind is a [`BuildError::TypeMismatch`].
    #[default]
    Merge,
    /// Leave anything that exists alone, of either kind, and do not descend
    /// into existing directories.
    SkipExisting,
    /// Fail on the first entry that exists, the target directory included.
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Report what would be created without touching the filesystem.
    pub dry_run: bool,
    pub conflict: ConflictPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    /// Paths created (or that would be, in a dry run), pre-order.
    pub created: Vec<PathBuf>,
    /// Paths that were already present with the right type, pre-order.
    pub existing: Vec<PathBuf>,
    /// Existing paths left untouched under [`ConflictPolicy::SkipExisting`].
    pub skipped: Vec<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    pub fn new(config: BuildConfig) -> Self {
        Builder { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn build(
        &self,
        cancel: &CancelToken,
        root: &Node,
        base_dir: &Path,
    ) -> Result<BuildResult, BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        if root.is_dir {
            for child in &root.children {
                validate_names(child)?;
            }
        } else {
            validate_names(root)?;
        }

        info!(
            "Building {} in {}{}",
            root.name,
            base_dir.display(),
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        let mut result = BuildResult {
            dry_run: self.config.dry_run,
            ..BuildResult::default()
        };

        if self.config.conflict == ConflictPolicy::Abort && probe(base_dir)?.is_some() {
            return Err(BuildError::AlreadyExists {
                path: base_dir.to_path_buf(),
            });
        }

        self.ensure_dir(base_dir, &mut result)?;
        if root.is_dir {
            self.build_children(cancel, root, base_dir, &mut result)?;
        } else {
            let path = base_dir.join(&root.name);
            if !self.resolve_conflict(&path, &mut result)? {
                self.ensure_file(&path, &mut result)?;
            }
        }

        info!(
            "{} {} entries, {} already existed, {} skipped",
            if self.config.dry_run { "Would create" } else { "Created" },
            result.created.len(),
            result.existing.len(),
            result.skipped.len()
        );

        Ok(result)
    }

    fn build_children(
        &self,
        cancel: &CancelToken,
        dir: &Node,
        dir_path: &Path,
        result: &mut BuildResult,
    ) -> Result<(), BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        for child in &dir.children {
            let path = dir_path.join(&child.name);
            if self.resolve_conflict(&path, result)? {
                continue;
            }
            if child.is_dir {
                self.ensure_dir(&path, result)?;
                self.build_children(cancel, child, &path, result)?;
            } else {
                self.ensure_file(&path, result)?;
            }
        }

        Ok(())
    }

    /// Applies the conflict policy to an existing `path`. Returns true when the
    /// entry should be left out of the build.
    fn resolve_conflict(&self, path: &Path, result: &mut BuildResult) -> Result<bool, BuildError> {
        if probe(path)?.is_none() {
            return Ok(false);
        }
        match self.config.conflict {
            ConflictPolicy::Merge => Ok(false),
            ConflictPolicy::SkipExisting => {
                debug!("Skipped existing {}", path.display());
                result.skipped.push(path.to_path_buf());
                Ok(true)
            }
            ConflictPolicy::Abort => Err(BuildError::AlreadyExists {
                path: path.to_path_buf(),
            }),
        }
    }

    fn ensure_dir(&self, path: &Path, result: &mut BuildResult) -> Result<(), BuildError> {
        match probe(path)? {
            Some(true) => {
                result.existing.push(path.to_path_buf());
                return Ok(());
            }
            Some(false) => {
                return Err(BuildError::TypeMismatch {
                    path: path.to_path_buf(),
                    expected: "directory",
                });
            }
            None => {}
        }

        if !self.config.dry_run {
            fs::create_dir_all(path).map_err(|source| BuildError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
        }
        debug!("Created directory {}", path.display());
        result.created.push(path.to_path_buf());
        Ok(())
    }

    fn ensure_file(&self, path: &Path, result: &mut BuildResult) -> Result<(), BuildError> {
        match probe(path)? {
            Some(false) => {
                result.existing.push(path.to_path_buf());
                return Ok(());
            }
            Some(true) => {
                return Err(BuildError::TypeMismatch {
                    path: path.to_path_buf(),
                    expected: "file",
                });
            }
            None => {}
        }

        if !self.config.dry_run {
            fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|source| BuildError::CreateFile {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        debug!("Created file {}", path.display());
        result.created.push(path.to_path_buf());
        Ok(())
    }
}

/// `Some(is_dir)` if something exists at `path`. Symlinks are not followed.
fn probe(path: &Path) -> Result<Option<bool>, BuildError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata.is_dir())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(BuildError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn validate_names(node: &Node) -> Result<(), BuildError> {
    if !is_single_segment(&node.name) {
        return Err(BuildError::InvalidName {
            name: node.name.clone(),
        });
    }
    node.children.iter().try_for_each(validate_names)
}

fn is_single_segment(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Node {
        Node::dir("project")
            .with_child(
                Node::dir("src")
                    .with_child(Node::file("main.go"))
                    .with_child(Node::dir("util")),
            )
            .with_child(Node::file("README.md"))
    }

    fn build(root: &Node, base: &Path, dry_run: bool) -> Result<BuildResult, BuildError> {
        Builder::new(BuildConfig {
            dry_run,
            ..BuildConfig::default()
        })
        .build(&CancelToken::new(), root, base)
    }

    fn build_with(
        root: &Node,
        base: &Path,
        conflict: ConflictPolicy,
    ) -> Result<BuildResult, BuildError> {
        Builder::new(BuildConfig {
            conflict,
            ..BuildConfig::default()
        })
        .build(&CancelToken::new(), root, base)
    }

    #[test]
    fn creates_structure_under_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");

        let result = build(&sample(), &target, false).unwrap();

        assert!(target.join("src").is_dir());
        assert!(target.join("src/util").is_dir());
        assert!(target.join("src/main.go").is_file());
        assert_eq!(fs::read(target.join("README.md")).unwrap(), b"");
        assert!(!target.join("project").exists());

        assert_eq!(
            result.created,
            [
                target.clone(),
                target.join("src"),
                target.join("src/main.go"),
                target.join("src/util"),
                target.join("README.md"),
            ]
        );
        assert!(result.existing.is_empty());
        assert!(!result.dry_run);
    }

    #[test]
    fn second_build_finds_everything_existing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();

        let first = build(&sample(), target, false).unwrap();
        let second = build(&sample(), target, false).unwrap();

        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), first.created.len() + first.existing.len());
    }

    #[test]
    fn existing_file_content_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();
        fs::write(target.join("README.md"), "keep me").unwrap();

        let result = build(&sample(), target, false).unwrap();

        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "keep me");
        assert!(result.existing.contains(&target.join("README.md")));
    }

    #[test]
    fn dry_run_reports_without_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");

        let dry = build(&sample(), &target, true).unwrap();

        assert!(!target.exists());
        assert!(dry.dry_run);

        let real = build(&sample(), &target, false).unwrap();
        assert_eq!(dry.created, real.created);
    }

    #[test]
    fn file_where_directory_expected() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();
        fs::write(target.join("src"), "not a dir").unwrap();

        let result = build(&sample(), target, false);

        match result {
            Err(BuildError::TypeMismatch { path, expected }) => {
                assert_eq!(path, target.join("src"));
                assert_eq!(expected, "directory");
            }
            other => panic!("Expected TypeMismatch, got {other:?}"),
        }
        assert!(!target.join("README.md").exists());
    }

    #[test]
    fn directory_where_file_expected() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();
        fs::create_dir(target.join("README.md")).unwrap();

        let result = build(&sample(), target, true);

        assert!(matches!(
            result,
            Err(BuildError::TypeMismatch { expected: "file", .. })
        ));
    }

    #[test]
    fn skip_existing_leaves_present_entries_alone() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();
        fs::create_dir(target.join("src")).unwrap();
        fs::create_dir(target.join("README.md")).unwrap();

        let result = build_with(&sample(), target, ConflictPolicy::SkipExisting).unwrap();

        assert_eq!(result.skipped, [target.join("src"), target.join("README.md")]);
        assert!(result.created.is_empty());
        assert!(!target.join("src/main.go").exists());
        assert!(target.join("README.md").is_dir());
    }

    #[test]
    fn skip_existing_still_creates_missing_entries() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();
        fs::write(target.join("README.md"), "keep me").unwrap();

        let result = build_with(&sample(), target, ConflictPolicy::SkipExisting).unwrap();

        assert_eq!(result.skipped, [target.join("README.md")]);
        assert!(target.join("src/util").is_dir());
        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "keep me");
    }

    #[test]
    fn abort_fails_on_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");
        fs::create_dir(&target).unwrap();

        let result = build_with(&sample(), &target, ConflictPolicy::Abort);

        match result {
            Err(BuildError::AlreadyExists { path }) => assert_eq!(path, target),
            other => panic!("Expected AlreadyExists, got {other:?}"),
        }
        assert!(!target.join("src").exists());
    }

    #[test]
    fn abort_builds_into_fresh_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");

        let result = build_with(&sample(), &target, ConflictPolicy::Abort).unwrap();

        assert_eq!(result.created.len(), 5);
        assert!(target.join("src/main.go").is_file());
    }

    #[test]
    fn invalid_names_are_rejected_before_creating_anything() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");

        for bad in ["..", ".", "a/b", "", "/abs"] {
            let root = Node::dir("root")
                .with_child(Node::file("fine.txt"))
                .with_child(Node::dir("sub").with_child(Node::file(bad)));

            let result = build(&root, &target, false);

            assert!(
                matches!(result, Err(BuildError::InvalidName { ref name }) if name == bad),
                "{bad:?} should be rejected"
            );
            assert!(!target.exists());
        }
    }

    #[test]
    fn cancelled_build_does_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Builder::default().build(&cancel, &sample(), &target);

        assert!(matches!(result, Err(BuildError::Cancelled)));
        assert!(!target.exists());
    }

    #[test]
    fn file_root_is_created_inside_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path();

        let result = build(&Node::file("notes.txt"), target, false).unwrap();

        assert!(target.join("notes.txt").is_file());
        assert_eq!(result.created, [target.join("notes.txt")]);
        assert_eq!(result.existing, [target.to_path_buf()]);
    }

    #[test]
    fn single_segment_names() {
        assert!(is_single_segment("file.txt"));
        assert!(is_single_segment(".hidden"));
        assert!(is_single_segment("with space"));
        assert!(!is_single_segment("a\\b"));
        assert!(!is_single_segment(".."));
    }
}
