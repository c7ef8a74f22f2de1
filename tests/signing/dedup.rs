//! Duplicate detection across inputs.

use batchsign::{BatchSigner, CopyInstruction, SignDecision};

use crate::common::image::native_image;
use crate::common::{default_policy, name_table, Workspace};

#[test]
fn test_same_path_twice() {
    let ws = Workspace::new();
    let lib = ws.file("Lib.dll", &native_image(false));

    let plan = BatchSigner::new(ws.config(), name_table(&[("Lib.dll", "CertA")]), default_policy())
        .run(&[&lib, &lib])
        .unwrap();
    assert_eq!(plan.files_to_sign.len(), 1);
    assert_eq!(
        plan.copies,
        vec![CopyInstruction {
            source: lib.clone(),
            destination: lib,
        }]
    );
}

#[test]
fn test_identical_file_in_two_directories() {
    let ws = Workspace::new();
    let image = native_image(false);
    let first = ws.file("net472/Lib.dll", &image);
    let second = ws.file("netstandard2.0/Lib.dll", &image);

    let plan = BatchSigner::new(ws.config(), name_table(&[("Lib.dll", "CertA")]), default_policy())
        .run(&[&first, &second])
        .unwrap();
    assert_eq!(plan.files_to_sign.len(), 1);
    assert_eq!(plan.files_to_sign[0].path, first);
    assert_eq!(plan.copies.len(), 1);
    assert_eq!(plan.copies[0].source, first);
    assert_eq!(plan.copies[0].destination, second);
}

#[test]
fn test_same_bytes_under_different_names_are_separate() {
    let ws = Workspace::new();
    let image = native_image(false);
    let one = ws.file("One.dll", &image);
    let two = ws.file("Two.dll", &image);
    let tables = name_table(&[("One.dll", "CertA"), ("Two.dll", "CertB")]);

    let plan = BatchSigner::new(ws.config(), tables, default_policy())
        .run(&[&one, &two])
        .unwrap();
    assert!(plan.copies.is_empty());
    let decisions: Vec<_> = plan.files_to_sign.iter().map(|f| &f.decision).collect();
    assert_eq!(
        decisions,
        [
            &SignDecision::ShouldSign("CertA".into()),
            &SignDecision::ShouldSign("CertB".into()),
        ]
    );
    assert_eq!(plan.files_to_sign[0].hash, plan.files_to_sign[1].hash);
}

#[test]
fn test_duplicates_of_ignored_files_still_copy() {
    let ws = Workspace::new();
    let first = ws.file("a/readme.txt", b"docs");
    let second = ws.file("b/readme.txt", b"docs");

    let plan = BatchSigner::new(ws.config(), name_table(&[("readme.txt", "None")]), default_policy())
        .run(&[&first, &second])
        .unwrap();
    assert!(plan.files_to_sign.is_empty());
    assert_eq!(plan.copies.len(), 1);
}
