use std::process::Command;

use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_issuemake"))
}

fn create(root: &std::path::Path, title: &str) {
    let output = bin()
        .arg("--root")
        .arg(root)
        .arg("create")
        .arg(title)
        .arg("--desc")
        .arg("desc")
        .output()
        .expect("run create");
    assert!(output.status.success());
}

#[test]
fn find_matches_fuzzy_title() {
    let temp = TempDir::new().expect("tempdir");
    create(temp.path(), "Add User Authentication Feature");

    let output = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("find")
        .arg("auth")
        .output()
        .expect("run find");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Add User Authentication Feature"));
}

#[test]
fn find_reports_no_match() {
    let temp = TempDir::new().expect("tempdir");
    create(temp.path(), "Add User Authentication Feature");

    let output = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("find")
        .arg("nonexistent")
        .output()
        .expect("run find");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No issue matches"));
}

#[test]
fn find_by_number_after_open() {
    let temp = TempDir::new().expect("tempdir");
    create(temp.path(), "First");
    create(temp.path(), "Second");

    bin()
        .arg("--root")
        .arg(temp.path())
        .arg("open")
        .arg("1")
        .output()
        .expect("run open");

    let output = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("find")
        .arg("1")
        .output()
        .expect("run find");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("doing"));
    assert!(stdout.contains("Second"));
}
