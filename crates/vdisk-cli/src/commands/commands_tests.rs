use clap::Parser;
use tempfile::TempDir;

use super::run;
use crate::cli::Cli;

fn exec(dir: &TempDir, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["vdisk-cli", "--disk-dir", dir.path().to_str().expect("utf-8 path")];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("arguments parse");
    let mut out = Vec::new();
    run(&cli, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

fn formatted() -> TempDir {
    let dir = TempDir::new().expect("tmp dir");
    exec(&dir, &["format", "unit", "--capacity", "128", "--block-size", "64"]).unwrap();
    dir
}

#[test]
fn format_creates_image_and_rejects_duplicates() {
    let dir = formatted();
    assert_eq!(
        std::fs::metadata(dir.path().join("unit")).unwrap().len(),
        128 * 64
    );
    assert!(exec(&dir, &["format", "unit", "--capacity", "128", "--block-size", "64"]).is_err());
    assert!(exec(&dir, &["format", "odd", "--capacity", "100"]).is_err());
}

#[test]
fn info_reports_geometry() {
    let dir = formatted();
    let out = exec(&dir, &["info", "unit"]).unwrap();
    assert!(out.contains("capacity:         128 blocks"));
    assert!(out.contains("block size:       64 bytes"));
    assert!(out.contains("inodes:           81"));
}

#[test]
fn write_cat_append_round_trip() {
    let dir = formatted();
    exec(&dir, &["write", "unit", "/notes", "first line"]).unwrap();
    assert_eq!(exec(&dir, &["cat", "unit", "notes"]).unwrap(), "first line\n");

    exec(&dir, &["append", "unit", "/notes", " and more"]).unwrap();
    assert_eq!(exec(&dir, &["cat", "unit", "/notes"]).unwrap(), "first line and more\n");

    exec(&dir, &["write", "unit", "/notes", "replaced"]).unwrap();
    assert_eq!(exec(&dir, &["cat", "unit", "/notes"]).unwrap(), "replaced\n");
}

#[test]
fn nested_directories_and_listing() {
    let dir = formatted();
    exec(&dir, &["mkdir", "unit", "/docs"]).unwrap();
    exec(&dir, &["mkdir", "unit", "/docs/drafts"]).unwrap();
    exec(&dir, &["write", "unit", "/docs/drafts/plan", "step one"]).unwrap();
    exec(&dir, &["write", "unit", "/docs/readme", "hi"]).unwrap();

    assert_eq!(exec(&dir, &["ls", "unit"]).unwrap(), "d docs\n");
    assert_eq!(exec(&dir, &["ls", "unit", "/docs"]).unwrap(), "d drafts\n- readme\n");
    assert_eq!(
        exec(&dir, &["cat", "unit", "/docs/drafts/plan"]).unwrap(),
        "step one\n"
    );
    assert!(exec(&dir, &["mkdir", "unit", "/docs"]).is_err());
    assert!(exec(&dir, &["cat", "unit", "/docs"]).is_err());
    assert!(exec(&dir, &["ls", "unit", "/docs/readme"]).is_err());
    assert!(exec(&dir, &["cat", "unit", "/missing/file"]).is_err());
}

#[test]
fn rm_restores_free_space_and_refuses_non_empty() {
    let dir = formatted();
    let before = exec(&dir, &["info", "unit"]).unwrap();

    exec(&dir, &["mkdir", "unit", "/tmp"]).unwrap();
    exec(&dir, &["write", "unit", "/tmp/big", "x".repeat(2000).as_str()]).unwrap();
    assert!(exec(&dir, &["rm", "unit", "/tmp"]).is_err());
    assert!(exec(&dir, &["ls", "unit", "/tmp"]).unwrap().contains("big"));

    exec(&dir, &["rm", "unit", "/tmp/big"]).unwrap();
    exec(&dir, &["rm", "unit", "/tmp"]).unwrap();
    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), before);
    assert!(exec(&dir, &["rm", "unit", "/tmp"]).is_err());
}

#[test]
fn destroy_removes_image() {
    let dir = formatted();
    exec(&dir, &["destroy", "unit"]).unwrap();
    assert!(!dir.path().join("unit").exists());
    assert!(exec(&dir, &["destroy", "unit"]).is_err());
    assert!(exec(&dir, &["info", "unit"]).is_err());
}

#[test]
fn disk_names_cannot_escape_directory() {
    let dir = TempDir::new().unwrap();
    assert!(exec(&dir, &["format", "../escape"]).is_err());
    assert!(exec(&dir, &["format", ""]).is_err());
}

#[test]
fn rejected_names_leave_free_space_unchanged() {
    let dir = formatted();
    let before = exec(&dir, &["info", "unit"]).unwrap();

    assert!(exec(&dir, &["write", "unit", "/1bad", "hello"]).is_err());
    assert!(exec(&dir, &["mkdir", "unit", "/_dir"]).is_err());
    exec(&dir, &["write", "unit", "/source", "hello"]).unwrap();
    let with_source = exec(&dir, &["info", "unit"]).unwrap();
    assert!(exec(&dir, &["cp", "unit", "/source", "/2copy"]).is_err());

    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), with_source);
    exec(&dir, &["rm", "unit", "/source"]).unwrap();
    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), before);
}

#[test]
fn failed_link_releases_the_new_inode() {
    let dir = formatted();
    // 113 blocks across every tier leaves one free block, and the root
    // directory's single inline slot is taken by this file.
    exec(&dir, &["write", "unit", "/big", "x".repeat(6700).as_str()]).unwrap();
    let full = exec(&dir, &["info", "unit"]).unwrap();
    assert!(full.contains("free blocks:      1\n"));

    assert!(exec(&dir, &["write", "unit", "/small", "hi"]).is_err());
    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), full);
    assert!(exec(&dir, &["mkdir", "unit", "/sub"]).is_err());
    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), full);
    assert_eq!(exec(&dir, &["ls", "unit"]).unwrap(), "- big\n");
}

#[test]
fn cp_makes_an_independent_copy() {
    let dir = formatted();
    exec(&dir, &["mkdir", "unit", "/docs"]).unwrap();
    exec(&dir, &["write", "unit", "/alpha", "first version"]).unwrap();
    exec(&dir, &["cp", "unit", "/alpha", "/docs/beta"]).unwrap();
    assert_eq!(exec(&dir, &["cat", "unit", "/docs/beta"]).unwrap(), "first version\n");

    exec(&dir, &["write", "unit", "/alpha", "second"]).unwrap();
    assert_eq!(exec(&dir, &["cat", "unit", "/docs/beta"]).unwrap(), "first version\n");

    assert!(exec(&dir, &["cp", "unit", "/alpha", "/docs/beta"]).is_err());
    assert!(exec(&dir, &["cp", "unit", "/docs", "/gamma"]).is_err());
    assert!(exec(&dir, &["cp", "unit", "/missing", "/gamma"]).is_err());
}

#[test]
fn drmdir_removes_a_whole_tree() {
    let dir = formatted();
    let before = exec(&dir, &["info", "unit"]).unwrap();

    exec(&dir, &["mkdir", "unit", "/top"]).unwrap();
    exec(&dir, &["mkdir", "unit", "/top/mid"]).unwrap();
    exec(&dir, &["mkdir", "unit", "/top/mid/empty"]).unwrap();
    exec(&dir, &["write", "unit", "/top/mid/leaf", "y".repeat(500).as_str()]).unwrap();
    exec(&dir, &["write", "unit", "/top/note", "hi"]).unwrap();
    assert!(exec(&dir, &["drmdir", "unit", "/top/note"]).is_err());

    exec(&dir, &["drmdir", "unit", "/top"]).unwrap();
    assert_eq!(exec(&dir, &["ls", "unit"]).unwrap(), "");
    assert_eq!(exec(&dir, &["info", "unit"]).unwrap(), before);
    assert!(exec(&dir, &["drmdir", "unit", "/top"]).is_err());
}

#[test]
fn find_searches_every_directory() {
    let dir = formatted();
    exec(&dir, &["mkdir", "unit", "/docs"]).unwrap();
    exec(&dir, &["mkdir", "unit", "/docs/notes"]).unwrap();
    exec(&dir, &["write", "unit", "/docs/notes/todo", "a"]).unwrap();
    exec(&dir, &["write", "unit", "/notes", "b"]).unwrap();
    exec(&dir, &["write", "unit", "/other", "c"]).unwrap();

    assert_eq!(
        exec(&dir, &["find", "unit", "notes"]).unwrap(),
        "/docs/notes\n/notes\n"
    );
    assert_eq!(exec(&dir, &["find", "unit", "todo"]).unwrap(), "/docs/notes/todo\n");
    assert_eq!(exec(&dir, &["find", "unit", "zzz"]).unwrap(), "");
}

#[test]
fn showdisks_lists_only_disk_images() {
    let dir = TempDir::new().unwrap();
    assert!(exec(&dir, &["showdisks"]).unwrap().starts_with("no disks"));

    exec(&dir, &["format", "beta", "--capacity", "256", "--block-size", "32"]).unwrap();
    exec(&dir, &["format", "alpha", "--capacity", "128", "--block-size", "64"]).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    assert_eq!(
        exec(&dir, &["showdisks"]).unwrap(),
        "alpha 128 64\nbeta 256 32\n"
    );
}
