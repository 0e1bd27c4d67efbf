//! High level operations combining the scanner, parser, formatter, builder
//! and comparer under one set of configuration.

use crate::builder::{BuildConfig, BuildError, BuildResult, Builder};
use crate::cancel::CancelToken;
use crate::comparer::{CompareConfig, CompareResult, compare};
use crate::formatter::{FormatConfig, Formatter};
use crate::node::{Node, TreeStats};
use crate::parser::{ParseError, parse};
use crate::scanner::{ScanConfig, ScanError, ScanOutcome, Scanner};
use crate::snapshot::{Snapshot, SnapshotError};
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TwigError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub output: String,
    pub stats: TreeStats,
    pub root: Node,
    pub max_files_reached: bool,
}

#[derive(Debug, Clone)]
pub struct Created {
    pub root: Node,
    pub build: BuildResult,
}

#[derive(Debug, Clone, Default)]
pub struct Twig {
    scan: ScanConfig,
    format: FormatConfig,
    build: BuildConfig,
    compare: CompareConfig,
}

impl Twig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan = config;
        self
    }

    pub fn with_format_config(mut self, config: FormatConfig) -> Self {
        self.format = config;
        self
    }

    pub fn with_build_config(mut self, config: BuildConfig) -> Self {
        self.build = config;
        self
    }

    pub fn with_compare_config(mut self, config: CompareConfig) -> Self {
        self.compare = config;
        self
    }

    pub fn scan(&self, cancel: &CancelToken, path: &Path) -> Result<ScanOutcome, TwigError> {
        let scanner = Scanner::new(self.scan.clone())?;
        Ok(scanner.scan(cancel, path)?)
    }

    /// Scans `path` and renders it with the configured formatter.
    pub fn generate(&self, cancel: &CancelToken, path: &Path) -> Result<Generated, TwigError> {
        let outcome = self.scan(cancel, path)?;
        let stats = TreeStats::calculate(&outcome.root);
        let output = self.format(&outcome.root);

        Ok(Generated {
            output,
            stats,
            root: outcome.root,
            max_files_reached: outcome.max_files_reached,
        })
    }

    pub fn generate_json(
        &self,
        cancel: &CancelToken,
        path: &Path,
        include_stats: bool,
    ) -> Result<String, TwigError> {
        let outcome = self.scan(cancel, path)?;
        let stats = include_stats.then(|| TreeStats::calculate(&outcome.root));
        Ok(Formatter::new(self.format.clone()).format_json(&outcome.root, stats.as_ref())?)
    }

    /// Scans `path` and writes it to `writer` as newline-delimited JSON,
    /// stats included.
    pub fn generate_json_stream<W: Write>(
        &self,
        cancel: &CancelToken,
        path: &Path,
        writer: W,
    ) -> Result<(), TwigError> {
        let outcome = self.scan(cancel, path)?;
        let stats = TreeStats::calculate(&outcome.root);
        Formatter::new(self.format.clone()).format_json_stream(
            writer,
            &outcome.root,
            Some(&stats),
        )?;
        Ok(())
    }

    /// Scans `path` into a snapshot carrying its stats.
    pub fn snapshot(&self, cancel: &CancelToken, path: &Path) -> Result<Snapshot, TwigError> {
        let outcome = self.scan(cancel, path)?;
        let stats = TreeStats::calculate(&outcome.root);
        Ok(Snapshot::new(outcome.root, Some(stats)))
    }

    pub fn parse(&self, text: &str) -> Result<Node, TwigError> {
        Ok(parse(text)?)
    }

    pub fn format(&self, root: &Node) -> String {
        Formatter::new(self.format.clone()).format(root)
    }

    pub fn build(
        &self,
        cancel: &CancelToken,
        root: &Node,
        target: &Path,
    ) -> Result<BuildResult, TwigError> {
        Ok(Builder::new(self.build.clone()).build(cancel, root, target)?)
    }

    /// Parses tree notation and materializes it under `target`.
    pub fn create_from_str(
        &self,
        cancel: &CancelToken,
        text: &str,
        target: &Path,
    ) -> Result<Created, TwigError> {
        let root = self.parse(text)?;
        let build = self.build(cancel, &root, target)?;
        Ok(Created { root, build })
    }

    pub fn compare(&self, left: Option<&Node>, right: Option<&Node>) -> CompareResult {
        compare(left, right, &self.compare)
    }

    /// A directory is scanned, anything else is loaded as a snapshot file.
    pub fn load_tree(&self, cancel: &CancelToken, path: &Path) -> Result<Node, TwigError> {
        if path.is_dir() {
            Ok(self.scan(cancel, path)?.root)
        } else {
            Ok(Snapshot::load(path)?.tree)
        }
    }

    /// Like [`Twig::compare_snapshots`], but either side may also be a live
    /// directory.
    pub fn compare_paths(
        &self,
        cancel: &CancelToken,
        left_path: &Path,
        right_path: &Path,
    ) -> Result<CompareResult, TwigError> {
        let left = self.load_tree(cancel, left_path)?;
        let right = self.load_tree(cancel, right_path)?;

        Ok(self
            .compare(Some(&left), Some(&right))
            .with_labels(left_path.display().to_string(), right_path.display().to_string()))
    }

    /// Loads two snapshot files and compares their trees.
    pub fn compare_snapshots(
        &self,
        left_path: &Path,
        right_path: &Path,
    ) -> Result<CompareResult, TwigError> {
        let left = Snapshot::load(left_path)?;
        let right = Snapshot::load(right_path)?;

        let result = self
            .compare(Some(&left.tree), Some(&right.tree))
            .with_labels(left_path.display().to_string(), right_path.display().to_string());

        info!(
            "Compared {} with {}: {}",
            left_path.display(),
            right_path.display(),
            result.summary
        );

        Ok(result)
    }
}
