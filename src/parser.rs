//! Parsing of tree notation (the output of `tree`, or hand-drawn diagrams
//! in the same style) into a [`Node`] tree.
//!
//! ```text
//! project/
//! ├── src/
//! │   └── main.go
//! └── README.md
//! ```
//!
//! Depth comes from the width of the indentation in front of the connector,
//! in four-column units. Input that is indented inconsistently is not rejected: a line
//! attaches to the closest open directory that is indented less than it.

use crate::node::Node;
use std::io::BufRead;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty tree structure")]
    EmptyInput,
    #[error("Line {line}: entry has no name")]
    EmptyName { line: usize },
    #[error("Line {line}: invalid entry name {name:?}")]
    InvalidName { line: usize, name: String },
    #[error("Line {line}: duplicate entry {name:?}")]
    DuplicateName { line: usize, name: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const CONNECTORS: &[&str] = &["├──", "└──", "|--", "`--", "+--"];
const FILLERS: &[char] = &['│', '|', ' '];
const INDENT_WIDTH: usize = 4;

pub fn parse(text: &str) -> Result<Node, ParseError> {
    let mut state = ParseState::default();
    for (index, line) in text.lines().enumerate() {
        state.feed(index + 1, line)?;
    }
    state.finish()
}

pub fn parse_reader<R: BufRead>(reader: R) -> Result<Node, ParseError> {
    let mut state = ParseState::default();
    for (index, line) in reader.lines().enumerate() {
        state.feed(index + 1, &line?)?;
    }
    state.finish()
}

#[derive(Default)]
struct ParseState {
    /// Open directories with their depth; the root is at the bottom, depth 0.
    stack: Vec<(usize, Node)>,
    root_marked_dir: bool,
}

impl ParseState {
    fn feed(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        let line = line.trim_end_matches('\r');
        if is_blank(line) {
            return Ok(());
        }

        if self.stack.is_empty() {
            let (name, is_dir) = split_dir_marker(line);
            if name.is_empty() {
                return Err(ParseError::EmptyName { line: line_number });
            }
            self.root_marked_dir = is_dir;
            self.stack.push((0, Node::dir(name)));
            return Ok(());
        }

        let (depth, rest) = measure(line);
        let (name, is_dir) = split_dir_marker(rest);
        if name.is_empty() {
            return Err(ParseError::EmptyName { line: line_number });
        }
        if name == "." || name == ".." || name.contains('/') {
            return Err(ParseError::InvalidName {
                line: line_number,
                name: name.to_string(),
            });
        }

        while self.stack.len() > 1 && self.stack.last().is_some_and(|(d, _)| *d >= depth) {
            self.close_top();
        }

        let Some((_, parent)) = self.stack.last_mut() else {
            return Err(ParseError::EmptyInput);
        };
        if parent.child(name).is_some() {
            return Err(ParseError::DuplicateName {
                line: line_number,
                name: name.to_string(),
            });
        }

        let node = Node::new(name, is_dir);
        if is_dir {
            self.stack.push((depth, node));
        } else {
            parent.push_child(node);
        }
        Ok(())
    }

    fn close_top(&mut self) {
        if let Some((_, node)) = self.stack.pop()
            && let Some((_, parent)) = self.stack.last_mut()
        {
            parent.push_child(node);
        }
    }

    fn finish(mut self) -> Result<Node, ParseError> {
        while self.stack.len() > 1 {
            self.close_top();
        }
        let (_, mut root) = self.stack.pop().ok_or(ParseError::EmptyInput)?;
        root.is_dir = self.root_marked_dir || !root.children.is_empty();
        Ok(root)
    }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c.is_whitespace() || FILLERS.contains(&c))
}

/// Strips one trailing `/`, reporting whether it was there. Whitespace after
/// the marker is dropped; whitespace in the name itself is kept.
fn split_dir_marker(name: &str) -> (&str, bool) {
    match name.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    }
}

/// Returns the depth of an entry line and its name text.
///
/// Everything in front of the first connector is indentation, as long as it
/// is made of filler columns and tabs. Its width is rounded to the nearest
/// four-column unit, so drawings indented by two or three columns still nest.
/// Lines without a connector are indented the same way and trimmed.
fn measure(line: &str) -> (usize, &str) {
    let mut width = 0;

    for (index, c) in line.char_indices() {
        let rest = &line[index..];
        if let Some(after) = CONNECTORS.iter().find_map(|conn| rest.strip_prefix(conn)) {
            let name = after.strip_prefix(' ').unwrap_or(after);
            return (depth_for(width), name);
        }
        match c {
            '\t' => width += INDENT_WIDTH,
            c if FILLERS.contains(&c) => width += 1,
            _ => return (depth_for(width), rest.trim_end()),
        }
    }

    (depth_for(width), "")
}

fn depth_for(width: usize) -> usize {
    (width + INDENT_WIDTH / 2) / INDENT_WIDTH + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn parses_nested_structure() {
        let text = "\
project/
├── src/
│   ├── main.go
│   └── util/
│       └── helpers.go
├── docs/
└── README.md
";

        let root = parse(text).unwrap();

        assert_eq!(root.name, "project");
        assert!(root.is_dir);
        assert_eq!(names(&root), ["src", "docs", "README.md"]);

        let src = root.child("src").unwrap();
        assert!(src.is_dir);
        assert_eq!(names(src), ["main.go", "util"]);
        assert!(!src.child("main.go").unwrap().is_dir);
        assert_eq!(names(src.child("util").unwrap()), ["helpers.go"]);

        let docs = root.child("docs").unwrap();
        assert!(docs.is_dir);
        assert!(docs.children.is_empty());
        assert!(!root.child("README.md").unwrap().is_dir);
        assert!(root.path.is_none());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse(""), Err(ParseError::EmptyInput)));
        assert!(matches!(parse("\n   \n\t\n"), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        let root = parse("\n\nroot/\n└── a\n").unwrap();

        assert_eq!(root.name, "root");
        assert_eq!(names(&root), ["a"]);
    }

    #[test]
    fn root_without_slash_is_a_directory_when_it_has_children() {
        let root = parse("root\n└── a").unwrap();
        assert!(root.is_dir);

        let lone = parse("notes.txt").unwrap();
        assert!(!lone.is_dir);

        let empty_dir = parse("empty/").unwrap();
        assert!(empty_dir.is_dir);
        assert_eq!(empty_dir.name, "empty");
    }

    #[test]
    fn tolerates_ascii_connectors_and_missing_spaces() {
        let text = "\
root/
|-- a/
|   `-- b.txt
+--c/
`--d";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), ["a", "c", "d"]);
        assert_eq!(names(root.child("a").unwrap()), ["b.txt"]);
        assert!(root.child("c").unwrap().is_dir);
    }

    #[test]
    fn tolerates_blank_filler_columns() {
        let text = "\
root/
└── a/
    └── b/
        └── c.txt";

        let root = parse(text).unwrap();

        let b = root.child("a").unwrap().child("b").unwrap();
        assert_eq!(names(b), ["c.txt"]);
    }

    #[test]
    fn handles_crlf_and_bar_only_lines() {
        let text = "root/\r\n├── a/\r\n│\r\n│   └── x\r\n└── b\r\n";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), ["a", "b"]);
        assert_eq!(names(root.child("a").unwrap()), ["x"]);
    }

    #[test]
    fn over_indented_line_attaches_to_nearest_directory() {
        let text = "\
root/
├── a/
│   │   │   └── deep.txt
│   └── near.txt
└── b.txt";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), ["a", "b.txt"]);
        assert_eq!(names(root.child("a").unwrap()), ["deep.txt", "near.txt"]);
    }

    #[test]
    fn narrow_indentation_still_nests() {
        let three = parse("root/\n├── a/\n│  └── b.txt\n└── c.txt").unwrap();

        assert_eq!(names(&three), ["a", "c.txt"]);
        assert_eq!(names(three.child("a").unwrap()), ["b.txt"]);

        let two = parse("root/\n  ├── x\n  └── y").unwrap();

        assert_eq!(names(&two), ["x", "y"]);
    }

    #[test]
    fn tab_indentation_counts_as_one_level() {
        let root = parse("root/\n├── a/\n\t└── b\n└── c").unwrap();

        assert_eq!(names(&root), ["a", "c"]);
        assert_eq!(names(root.child("a").unwrap()), ["b"]);
    }

    #[test]
    fn whitespace_inside_names_is_kept() {
        let text = "root/\n├──  lead\n├── trail \n├── mid dle/   \n└── last";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), [" lead", "trail ", "mid dle", "last"]);
        assert!(root.child("mid dle").unwrap().is_dir);
    }

    #[test]
    fn lines_under_a_file_attach_to_its_directory() {
        let text = "\
root/
├── file.txt
│   └── orphan.txt
└── last.txt";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), ["file.txt", "orphan.txt", "last.txt"]);
        assert!(root.child("file.txt").unwrap().children.is_empty());
    }

    #[test]
    fn plain_indented_lines_without_connectors() {
        let text = "root/\nsrc/\n    lib.rs\nCargo.toml";

        let root = parse(text).unwrap();

        assert_eq!(names(&root), ["src", "Cargo.toml"]);
        assert_eq!(names(root.child("src").unwrap()), ["lib.rs"]);
    }

    #[test]
    fn empty_name_reports_line() {
        let result = parse("root/\n├── a\n└── ");

        assert!(matches!(result, Err(ParseError::EmptyName { line: 3 })));
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["..", ".", "a/b"] {
            let result = parse(&format!("root/\n└── {name}"));
            assert!(
                matches!(result, Err(ParseError::InvalidName { line: 2, .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_siblings_are_rejected() {
        let text = "root/\n├── a/\n│   └── x\n└── a/";

        let result = parse(text);

        match result {
            Err(ParseError::DuplicateName { line, name }) => {
                assert_eq!(line, 4);
                assert_eq!(name, "a");
            }
            other => panic!("Expected DuplicateName, got {other:?}"),
        }
    }

    #[test]
    fn same_name_in_different_directories_is_fine() {
        let text = "root/\n├── a/\n│   └── mod.rs\n└── b/\n    └── mod.rs";

        let root = parse(text).unwrap();

        assert_eq!(names(root.child("b").unwrap()), ["mod.rs"]);
    }

    #[test]
    fn reader_and_string_agree() {
        let text = "root/\n├── a/\n│   └── x\n└── b\n";

        let from_reader = parse_reader(std::io::Cursor::new(text)).unwrap();

        assert_eq!(from_reader, parse(text).unwrap());
    }
}
