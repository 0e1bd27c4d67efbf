//! Directory scanning into a [`Node`] tree.
//!
//! The sequential walk is a plain pre-order recursion. The parallel walk lists
//! the root synchronously, so top-level order stays deterministic and the
//! entry cap gates the fan-out, then hands every top-level subdirectory to a
//! small pool of scoped worker threads. A worker owns the subtree it scans
//! and sends it back when done; the only state shared between workers is the
//! emitted-entry counter.

use crate::cancel::CancelToken;
use crate::checksum::checksum_file;
use crate::dir_list::{DirEntry, DirListError, list_directory};
use crate::node::{FileInfo, Node};
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("Scan cancelled")]
    Cancelled,
    #[error("Maximum entry count reached ({limit})")]
    MaxFilesReached { limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Names skipped unless the caller replaces the list.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    ".DS_Store",
    "__pycache__",
    "*.pyc",
    ".idea",
    ".vscode",
];

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Levels to descend below the root. `None` is unlimited, `Some(0)` lists
    /// nothing.
    pub max_depth: Option<usize>,
    pub show_hidden: bool,
    /// Shell globs matched against base names. Matching directories are not
    /// descended.
    pub ignore_patterns: Vec<String>,
    /// Leave files out of the tree. Directories are still descended.
    pub dirs_only: bool,
    pub show_hash: bool,
    /// Cap on emitted entries, root excluded. 0 is unlimited.
    pub max_files: usize,
    /// Files larger than this are left unhashed. 0 is unlimited.
    pub max_hash_size: u64,
    /// Worker threads: 0 uses every hardware thread, 1 scans sequentially.
    pub parallel: usize,
    /// Receives the running entry count after each emitted entry.
    pub progress: Option<mpsc::Sender<u64>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            max_depth: None,
            show_hidden: false,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            dirs_only: false,
            show_hash: false,
            max_files: 0,
            max_hash_size: 0,
            parallel: 0,
            progress: None,
        }
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub root: Node,
    /// Entries emitted, root excluded.
    pub entries: usize,
    /// The tree is partial because `max_files` was hit. The tree itself is
    /// still well formed.
    pub max_files_reached: bool,
}

impl ScanOutcome {
    /// Treats truncation as an error for callers that need the whole tree.
    pub fn into_complete(self) -> Result<Node, ScanError> {
        if self.max_files_reached {
            Err(ScanError::MaxFilesReached {
                limit: self.entries,
            })
        } else {
            Ok(self.root)
        }
    }
}

pub struct Scanner {
    config: ScanConfig,
    ignore: GlobSet,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|source| ScanError::InvalidPattern {
                pattern: config.ignore_patterns.join(", "),
                source,
            })?;

        Ok(Scanner { config, ignore })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans `root` into a tree.
    ///
    /// Failures on the root are fatal. Below the root, unreadable directories
    /// and entries are skipped and the scan carries on. Hitting `max_files`
    /// is reported through [`ScanOutcome::max_files_reached`], not as an
    /// error.
    pub fn scan(&self, cancel: &CancelToken, root: &Path) -> Result<ScanOutcome, ScanError> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let abs_path =
            std::path::absolute(root).map_err(|_| ScanError::InvalidPath(root.to_path_buf()))?;

        let metadata = std::fs::metadata(&abs_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::PathNotFound(abs_path.clone()),
            ErrorKind::PermissionDenied => ScanError::PermissionDenied(abs_path.clone()),
            _ => ScanError::Io(e),
        })?;

        let mut root_node =
            Node::new(root_name(&abs_path), metadata.is_dir()).with_path(&abs_path);
        root_node.info = Some(FileInfo::from_metadata(&metadata));

        if !metadata.is_dir() {
            if self.config.show_hash {
                root_node.hash = self.hash(&abs_path);
            }
            return Ok(ScanOutcome {
                root: root_node,
                entries: 0,
                max_files_reached: false,
            });
        }

        let entries = list_directory(&abs_path).map_err(|e| match e {
            DirListError::PermissionDenied(path) => ScanError::PermissionDenied(path),
            DirListError::Io(e) => ScanError::Io(e),
        })?;

        let workers = self.worker_count();
        info!(
            "Scanning {} with {} worker(s)",
            abs_path.display(),
            workers
        );

        let walk = Walk {
            scanner: self,
            cancel,
            emitted: AtomicUsize::new(0),
        };

        let result = if workers > 1 {
            walk.scan_root_parallel(&mut root_node, entries, workers)
        } else {
            walk.scan_entries(&mut root_node, entries, 0)
        };

        let emitted = walk.emitted.load(Ordering::SeqCst);
        let max_files_reached = match result {
            Ok(()) => false,
            Err(Stop::Limit) => {
                warn!(
                    "Stopped after {} entries (max files reached), tree is partial",
                    emitted
                );
                true
            }
            Err(Stop::Cancelled) => return Err(ScanError::Cancelled),
        };

        info!("Scanned {} entries under {}", emitted, abs_path.display());

        Ok(ScanOutcome {
            root: root_node,
            entries: emitted,
            max_files_reached,
        })
    }

    fn worker_count(&self) -> usize {
        match self.config.parallel {
            0 => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    fn admits(&self, entry: &DirEntry) -> bool {
        if !self.config.show_hidden && entry.name.starts_with('.') {
            return false;
        }
        if self.ignore.is_match(&entry.name) {
            return false;
        }
        !(self.config.dirs_only && !entry.is_dir)
    }

    /// A failed hash leaves the file unhashed.
    fn hash(&self, path: &Path) -> Option<String> {
        match checksum_file(path, self.config.max_hash_size) {
            Ok(hash) => hash,
            Err(e) => {
                debug!("Leaving {} unhashed: {}", path.display(), e);
                None
            }
        }
    }
}

fn root_name(abs_path: &Path) -> String {
    if let Some(name) = abs_path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    // Paths ending in `..` have no file name until resolved.
    abs_path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| abs_path.to_string_lossy().into_owned())
}

/// Why a walk stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Limit,
    Cancelled,
}

/// State for one `scan` call.
struct Walk<'a> {
    scanner: &'a Scanner,
    cancel: &'a CancelToken,
    emitted: AtomicUsize,
}

impl Walk<'_> {
    fn depth_exhausted(&self, depth: usize) -> bool {
        self.scanner
            .config
            .max_depth
            .is_some_and(|max| depth >= max)
    }

    fn reserve_slot(&self) -> Result<(), Stop> {
        let max = self.scanner.config.max_files;
        let previous = self
            .emitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (max == 0 || n < max).then_some(n + 1)
            })
            .map_err(|_| Stop::Limit)?;

        if let Some(progress) = &self.scanner.config.progress {
            let _ = progress.send(previous as u64 + 1);
        }
        Ok(())
    }

    fn make_node(&self, entry: DirEntry) -> Node {
        let mut node = Node::new(entry.name, entry.is_dir).with_path(&entry.path);
        if self.scanner.config.show_hash && !entry.is_dir {
            node.hash = self.scanner.hash(&entry.path);
        }
        node.info = Some(entry.info);
        node
    }

    fn scan_dir(&self, node: &mut Node, dir: &Path, depth: usize) -> Result<(), Stop> {
        if self.cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        if self.depth_exhausted(depth) {
            return Ok(());
        }

        let entries = match list_directory(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        self.scan_entries(node, entries, depth)
    }

    fn scan_entries(
        &self,
        node: &mut Node,
        entries: Vec<DirEntry>,
        depth: usize,
    ) -> Result<(), Stop> {
        if self.depth_exhausted(depth) {
            return Ok(());
        }

        for entry in entries {
            if !self.scanner.admits(&entry) {
                continue;
            }
            self.reserve_slot()?;

            let dir = entry.is_dir.then(|| entry.path.clone());
            let mut child = self.make_node(entry);

            if let Some(dir) = dir {
                // Keep the partial subtree even when the walk stops inside it.
                let result = self.scan_dir(&mut child, &dir, depth + 1);
                node.push_child(child);
                result?;
            } else {
                node.push_child(child);
            }
        }

        Ok(())
    }

    fn scan_root_parallel(
        &self,
        root: &mut Node,
        entries: Vec<DirEntry>,
        workers: usize,
    ) -> Result<(), Stop> {
        if self.depth_exhausted(0) {
            return Ok(());
        }

        let mut jobs = Vec::new();
        for entry in entries {
            if !self.scanner.admits(&entry) {
                continue;
            }
            self.reserve_slot()?;

            if entry.is_dir {
                jobs.push((root.children.len(), entry.path.clone()));
            }
            root.push_child(self.make_node(entry));
        }

        if jobs.is_empty() {
            return Ok(());
        }

        let workers = workers.min(jobs.len());
        debug!(
            "Fanning out {} subdirectories to {} workers",
            jobs.len(),
            workers
        );

        let (job_tx, job_rx) = mpsc::sync_channel(jobs.len());
        for (index, path) in jobs {
            let node = std::mem::replace(&mut root.children[index], Node::dir(String::new()));
            // Capacity equals the job count, so this never blocks. The
            // receiver is alive until the end of this function.
            let _ = job_tx.send((index, node, path));
        }
        drop(job_tx);

        let job_rx = Mutex::new(job_rx);
        let (done_tx, done_rx) = mpsc::channel();

        thread::scope(|s| {
            for _ in 0..workers {
                let done_tx = done_tx.clone();
                let job_rx = &job_rx;
                s.spawn(move || {
                    // Workers drain the queue even after a stop so every
                    // subtree is handed back; a stopped walk returns at once.
                    loop {
                        let job = job_rx.lock().recv();
                        let Ok((index, mut node, path)) = job else {
                            break;
                        };
                        let result = self.scan_dir(&mut node, &path, 1);
                        if done_tx.send((index, node, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(done_tx);

        let mut stop = None;
        for (index, node, result) in done_rx {
            root.children[index] = node;
            match result {
                Err(Stop::Cancelled) => stop = Some(Stop::Cancelled),
                Err(Stop::Limit) if stop.is_none() => stop = Some(Stop::Limit),
                _ => {}
            }
        }

        match stop {
            Some(stop) => Err(stop),
            None => Ok(()),
        }
    }
}
