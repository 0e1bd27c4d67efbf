//! Scan directory trees into a tree model, draw them as `tree`-style text,
//! parse that text back, materialize it on disk and diff two snapshots.

pub mod builder;
pub mod cancel;
pub mod checksum;
pub mod comparer;
pub mod dir_list;
pub mod formatter;
pub mod node;
pub mod parser;
pub mod scanner;
pub mod snapshot;
pub mod twig;

pub use builder::{BuildConfig, BuildError, BuildResult, Builder, ConflictPolicy};
pub use cancel::CancelToken;
pub use comparer::{Change, ChangeKind, CompareConfig, CompareResult, Summary, compare};
pub use formatter::{FormatConfig, Formatter};
pub use node::{FileInfo, Node, TreeStats};
pub use parser::{ParseError, parse, parse_reader};
pub use scanner::{DEFAULT_IGNORE_PATTERNS, ScanConfig, ScanError, ScanOutcome, Scanner};
pub use snapshot::{Snapshot, SnapshotError, SnapshotStats};
pub use twig::{Created, Generated, Twig, TwigError};
