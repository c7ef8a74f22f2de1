//! Emitted plans and the suggestions report.

use batchsign::{BatchSigner, SignToolError, SigningPlan};

use crate::common::image::native_image;
use crate::common::{default_policy, name_table, Workspace};

#[test]
fn test_plan_json_round_trip() {
    let ws = Workspace::new();
    let lib = native_image(false);
    let loose = ws.file("Lib.dll", &lib);
    let copy = ws.file("copy/Lib.dll", &lib);
    let zip = ws.zip("Bundle.zip", &[("tools/Tool.exe", &lib[..])]);
    let tables = name_table(&[("Lib.dll", "CertA"), ("Tool.exe", "CertB"), ("Bundle.zip", "None")]);

    let plan = BatchSigner::new(ws.config(), tables, default_policy())
        .run(&[&loose, &copy, &zip])
        .unwrap();
    let json = plan.to_json().unwrap();
    assert_eq!(SigningPlan::from_json(&json).unwrap(), plan);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["files_to_sign"][0]["decision"]["action"], "ShouldSign");
    assert_eq!(value["files_to_sign"][0]["decision"]["certificate"], "CertA");
    let container_key = value["containers"].as_object().unwrap().keys().next().unwrap();
    assert_eq!(container_key.len(), 64);
}

#[test]
fn test_summary_counts() {
    let ws = Workspace::new();
    let lib = native_image(false);
    let first = ws.file("a/Lib.dll", &lib);
    let second = ws.file("b/Lib.dll", &lib);
    let zip = ws.zip("Bundle.zip", &[("x/Tool.exe", &lib[..]), ("y/Tool.exe", &lib[..])]);
    let tables = name_table(&[("Lib.dll", "CertA"), ("Tool.exe", "CertB"), ("Bundle.zip", "None")]);

    let plan = BatchSigner::new(ws.config(), tables, default_policy())
        .run(&[&first, &second, &zip])
        .unwrap();
    let summary = plan.summary();
    assert_eq!(summary.files_to_sign, 2);
    assert_eq!(summary.containers, 1);
    assert_eq!(summary.nested_parts, 2);
    assert_eq!(summary.copies, 1);
}

#[test]
fn test_suggestions_report_sorted_and_unique() {
    let ws = Workspace::new();
    let image = native_image(false);
    let inputs = [
        ws.file("b/Zeta.dll", &image),
        ws.file("Alpha.exe", b"MZ not really a program"),
        ws.file("a/Zeta.dll", b"other bytes"),
        ws.file("Package.nupkg", &empty_zip()),
    ];

    let config = ws.config();
    let expected_report = config.suggestions_path();
    let result = BatchSigner::new(config, name_table(&[]), default_policy()).run(&inputs);
    let report = match result {
        Err(SignToolError::MissingCertificates { entries, report }) => {
            assert_eq!(entries.len(), 4);
            report
        }
        other => panic!("expected missing certificates, got {other:?}"),
    };
    assert_eq!(report, expected_report);
    assert!(report.starts_with(ws.temp_dir()));

    let text = std::fs::read_to_string(&report).unwrap();
    assert_eq!(
        text,
        "<Project>\n  <ItemGroup>\n\
         \x20   <FileSignInfo Include=\"Alpha.exe\" CertificateName=\"Microsoft400\" />\n\
         \x20   <FileSignInfo Include=\"Package.nupkg\" CertificateName=\"NuGet\" />\n\
         \x20   <FileSignInfo Include=\"Zeta.dll\" CertificateName=\"Microsoft400\" />\n\
         \x20 </ItemGroup>\n</Project>\n"
    );
}

#[test]
fn test_no_report_on_success() {
    let ws = Workspace::new();
    let lib = ws.file("Lib.dll", &native_image(false));
    let config = ws.config();
    let report = config.suggestions_path();

    BatchSigner::new(config, name_table(&[("Lib.dll", "CertA")]), default_policy())
        .run(&[&lib])
        .unwrap();
    assert!(!report.exists());
}

fn empty_zip() -> Vec<u8> {
    crate::common::test_utils::zip_bytes(&[])
}
