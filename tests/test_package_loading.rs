//! Tests for the one-shot buffer query and on-disk package loading.
//!
//! These exercise `locate_declaration`: the queried buffer plus its
//! on-disk siblings form the package, with the buffer content taking
//! precedence over the file's saved state.

use gosource::base::TextSize;
use gosource::ide::{DeclError, locate_declaration};

fn offset_of(src: &str, needle: &str) -> TextSize {
    TextSize::from(src.find(needle).expect("needle in src") as u32)
}

#[test]
fn test_buffer_resolves_against_disk_siblings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("util.go"),
        "package main\n\nfunc helper() int {\n\treturn 1\n}\n",
    )
    .unwrap();

    let main_path = dir.path().join("main.go");
    let buffer = "package main\n\nfunc run() int {\n\treturn helper()\n}\n";
    std::fs::write(&main_path, buffer).unwrap();

    let span = locate_declaration(&main_path, buffer, offset_of(buffer, "helper")).unwrap();
    assert!(span.path.ends_with("util.go"));
    assert_eq!(span.start.line, 3);
    assert_eq!(span.start.column, 6);
}

#[test]
fn test_unsaved_buffer_wins_over_disk_content() {
    let dir = tempfile::tempdir().unwrap();
    let main_path = dir.path().join("main.go");
    // The saved file declares nothing useful.
    std::fs::write(&main_path, "package main\n").unwrap();

    // The unsaved buffer has both declaration and use.
    let buffer = "package main\n\nvar fresh = 1\nvar twice = fresh + fresh\n";
    let span = locate_declaration(&main_path, buffer, offset_of(buffer, "fresh +")).unwrap();
    assert_eq!(span.start.line, 3);
    assert_eq!(span.start.column, 5);
}

#[test]
fn test_broken_sibling_does_not_poison_the_query() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.go"), "package main\nfunc {").unwrap();
    std::fs::write(
        dir.path().join("util.go"),
        "package main\nfunc helper() {}\n",
    )
    .unwrap();

    let main_path = dir.path().join("main.go");
    let buffer = "package main\nfunc run() {\n\thelper()\n}\n";
    let span = locate_declaration(&main_path, buffer, offset_of(buffer, "helper")).unwrap();
    assert!(span.path.ends_with("util.go"));
}

#[test]
fn test_sibling_of_other_package_does_not_leak_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("other.go"),
        "package other\nfunc helper() {}\n",
    )
    .unwrap();

    let main_path = dir.path().join("main.go");
    let buffer = "package main\nfunc run() {\n\thelper()\n}\n";
    let err = locate_declaration(&main_path, buffer, offset_of(buffer, "helper")).unwrap_err();
    assert!(matches!(err, DeclError::UnresolvedIdentifier(_)));
}

#[test]
fn test_parse_error_in_buffer_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let main_path = dir.path().join("main.go");
    let buffer = "package main\nfunc run() {\n";
    let err = locate_declaration(&main_path, buffer, TextSize::from(0)).unwrap_err();
    assert!(matches!(err, DeclError::Parse(_)));
}
