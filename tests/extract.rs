mod common;

use std::fs;

use common::*;
use sunzip::{Action, ExtractOptions, Overwrite, ZipExtractor, ZipStreamReader};

fn tree() -> Vec<u8> {
    archive(&[
        TestEntry::stored("docs/", b""),
        TestEntry::deflated("docs/readme.txt", &b"read me\n".repeat(50)),
        TestEntry::stored("src/main.rs", b"fn main() {}\n").with_descriptor(Descriptor::Signed),
        TestEntry::deflated("scratch.tmp", b"throwaway"),
    ])
}

#[test]
fn extracts_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    let data = tree();
    let mut archive = ZipStreamReader::new(&data[..]);

    let mut actions = Vec::new();
    let summary = ZipExtractor::default()
        .extract_to_dir(&mut archive, dir.path(), |entry, action| {
            actions.push((entry.name().into_owned(), action.clone()))
        })
        .unwrap();

    assert_eq!(summary.files, 3);
    assert_eq!(summary.dirs, 1);
    assert_eq!(
        fs::read(dir.path().join("docs/readme.txt")).unwrap(),
        b"read me\n".repeat(50)
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/main.rs")).unwrap(),
        "fn main() {}\n"
    );
    assert_eq!(actions[0].1, Action::CreatedDir(dir.path().join("docs")));
}

#[test]
fn filters_and_junk_paths() {
    let dir = tempfile::tempdir().unwrap();
    let data = tree();
    let mut archive = ZipStreamReader::new(&data[..]);
    let extractor = ZipExtractor::new(ExtractOptions {
        include: vec!["*.txt".into(), "main.rs".into(), "scratch.tmp".into()],
        exclude: vec!["*.tmp".into()],
        junk_paths: true,
        ..Default::default()
    });

    let summary = extractor
        .extract_to_dir(&mut archive, dir.path(), |_, _| {})
        .unwrap();
    assert_eq!(summary.files, 2);
    assert!(dir.path().join("readme.txt").is_file());
    assert!(dir.path().join("main.rs").is_file());
    assert!(!dir.path().join("docs").exists());
    assert!(!dir.path().join("scratch.tmp").exists());
}

#[test]
fn existing_files_follow_overwrite_policy() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("a.txt");
    fs::write(&target, "old").unwrap();
    let data = archive(&[TestEntry::stored("a.txt", b"new")]);

    let mut archive_stream = ZipStreamReader::new(&data[..]);
    let mut seen = None;
    ZipExtractor::default()
        .extract_to_dir(&mut archive_stream, dir.path(), |_, action| {
            seen = Some(action.clone())
        })
        .unwrap();
    assert_eq!(seen, Some(Action::Exists(target.clone())));
    assert_eq!(fs::read_to_string(&target).unwrap(), "old");

    let mut archive_stream = ZipStreamReader::new(&data[..]);
    let overwrite = ZipExtractor::new(ExtractOptions {
        overwrite: Overwrite::Always,
        ..Default::default()
    });
    overwrite
        .extract_to_dir(&mut archive_stream, dir.path(), |_, _| {})
        .unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
}

#[test]
fn unsafe_names_stay_inside_the_destination() {
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("out");
    let data = archive(&[
        TestEntry::stored("../escape.txt", b"no"),
        TestEntry::stored("/abs.txt", b"no"),
        TestEntry::stored("ok.txt", b"yes"),
    ]);
    let mut archive_stream = ZipStreamReader::new(&data[..]);
    let mut unsafe_count = 0;
    ZipExtractor::default()
        .extract_to_dir(&mut archive_stream, &dest, |_, action| {
            if *action == Action::UnsafePath {
                unsafe_count += 1;
            }
        })
        .unwrap();
    assert_eq!(unsafe_count, 2);
    assert!(!root.path().join("escape.txt").exists());
    assert_eq!(fs::read_to_string(dest.join("ok.txt")).unwrap(), "yes");
}

#[test]
fn pipes_selected_entries() {
    let data = tree();
    let mut archive_stream = ZipStreamReader::new(&data[..]);
    let extractor = ZipExtractor::new(ExtractOptions {
        include: vec!["src/*".into(), "scratch.tmp".into()],
        ..Default::default()
    });
    let mut out = Vec::new();
    let summary = extractor
        .extract_to_writer(&mut archive_stream, &mut out, |_, _| {})
        .unwrap();
    assert_eq!(summary.files, 2);
    assert_eq!(out, b"fn main() {}\nthrowaway");
}
