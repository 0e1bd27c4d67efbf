pub(super) const ROOT_LONG_ABOUT: &str = "\
Scan, draw, rebuild and diff directory trees

Twig works with directory trees in three forms: the directory on disk, the
familiar drawing printed by `tree`, and a snapshot file (JSON or TOML) that
records names, kinds and optionally SHA-256 hashes.

COMMANDS:

  generate
    Scan a directory and draw it. Can also print hashes, sizes, dates,
    statistics or JSON, and save a snapshot for later comparison.

  create
    Read a drawing (from a file or stdin) and create the directories and
    empty files it describes. Existing entries are left alone.

  compare
    Compare two snapshots, or a snapshot and a directory, and list what was
    added, removed, modified or moved.

TYPICAL WORKFLOW:

  1. Record the current state of a project:
     $ twig generate --hash -o before.json

  2. Work on the project, then see what changed:
     $ twig compare before.json . --detect-moves

  3. Scaffold a new layout from a sketch:
     $ twig create layout.txt my-app

LOGGING:

  Diagnostics go to stderr. Use -v for progress messages, -vv for per-entry
  detail, or --log-level. Without either, RUST_LOG is honoured and the
  default is to show warnings and errors only.

EXIT CODES:

  0    Success
  1    compare found differences
  255  Any error
";

pub(super) const GENERATE_LONG_ABOUT: &str = "\
Draw a directory as a tree

Entries are listed directories first, then files, each group by name. Hidden
entries and the built-in ignore patterns (.git, node_modules, .DS_Store,
__pycache__, *.pyc, .idea, .vscode) are skipped unless --all or
--no-default-ignores say otherwise.

The drawing marks directories with a trailing slash, so it can be fed back
into `twig create` to reproduce the layout.

With --max-files the scan stops once that many entries were collected. The
partial tree is still printed and a warning is logged.

--json-stream prints one JSON object per line: a begin record, one node
record per entry, the statistics and an end record.

Use --hash when saving a snapshot with -o if you want `twig compare` to
detect modified and moved files.

EXAMPLES:

  $ twig generate
  $ twig generate src -L 2 -I '*.log'
  $ twig generate --hash --size --date
  $ twig generate --flat-hashes > SHA256SUMS
  $ twig generate --hash -s -o snapshot.toml
  $ twig generate --json-stream | jq -c 'select(.type == \"node\")'
";

pub(super) const CREATE_LONG_ABOUT: &str = "\
Create files and directories from a drawn tree

INPUT is a file containing a drawing in `tree` style, or - to read it from
stdin. The first line names the root; entries ending in / are directories,
everything else becomes an empty file.

  my-app/
  ├── src/
  │   └── main.rs
  └── Cargo.toml

The root maps onto TARGET, which defaults to a directory named after the
root in the current directory. Existing directories and files are kept as
they are; an existing file where a directory should be (or the other way
around) is an error. Nothing is rolled back on error.

--skip-existing leaves every existing entry alone, whatever its kind, and
does not fill in existing directories. --abort-on-conflict fails as soon as
the target or any entry already exists.

The created paths are printed one per line. --dry-run prints the same list
without touching the filesystem.
";

pub(super) const COMPARE_LONG_ABOUT: &str = "\
Compare two snapshots or directories

LEFT and RIGHT are snapshot files written by `twig generate -o`, or
directories, which are scanned with hashing on. Paths are compared starting
at each root's name, so compare snapshots of the same directory.

OUTPUT:

  - path            removed
  + path            added
  ~ path            modified (both sides hashed, hashes differ)
  > path (from old) moved (--detect-moves)

followed by a summary line. --json prints the full result instead.

The exit code is 0 when nothing differs and 1 otherwise.
";
