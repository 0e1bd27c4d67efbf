use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::Path;

pub fn twig_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("twig");
    cmd.arg("-C").arg(cwd);
    cmd
}

// Each integration test file is compiled as its own crate, and not all of
// them build the sample project.
#[allow(dead_code)]
pub fn write_project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/main.go"), "X").unwrap();
    fs::write(root.join("README.md"), "Y").unwrap();
}

#[allow(dead_code)]
pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("failed to run `twig`");
    String::from_utf8(output.stdout).expect("stdout should be UTF-8")
}
