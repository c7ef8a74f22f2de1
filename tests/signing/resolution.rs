//! Certificate resolution against inspected images.

use batchsign::inspect::{inspect_bytes, public_key_token};
use batchsign::{
    BatchSigner, CertificateTables, ExplicitCertificateKey, ExtensionPolicy, SignDecision,
    SignToolConfig, SignToolError,
};

use crate::common::image::{native_image, ManagedAssembly, ECMA_PUBLIC_KEY};
use crate::common::{default_policy, name_table, Workspace};

const ECMA_TOKEN: &str = "b77a5c561934e089";
const NET472: &str = ".NETFramework,Version=v4.7.2";

fn signer(config: SignToolConfig, tables: CertificateTables) -> BatchSigner {
    BatchSigner::new(config, tables, default_policy())
}

#[test]
fn test_name_only_match_for_strong_named_assembly() {
    let ws = Workspace::new();
    let key: Vec<u8> = (1..=160u8).collect();
    let app = ws.file("app.dll", &ManagedAssembly::new("app.dll").public_key(&key).build());

    let plan = signer(ws.config(), name_table(&[("app.dll", "CertA")]))
        .run(&[&app])
        .unwrap();
    assert_eq!(plan.files_to_sign.len(), 1);
    assert_eq!(plan.files_to_sign[0].path, app);
    assert_eq!(
        plan.files_to_sign[0].decision,
        SignDecision::ShouldSign("CertA".into())
    );
    assert!(!public_key_token(&key).is_empty());
}

#[test]
fn test_most_specific_key_wins() {
    let ws = Workspace::new();
    let image = ManagedAssembly::new("Lib.dll")
        .public_key(&ECMA_PUBLIC_KEY)
        .framework(NET472)
        .build();
    let lib = ws.file("Lib.dll", &image);

    let tables = name_table(&[("Lib.dll", "NameCert")])
        .with_explicit(
            ExplicitCertificateKey::new("Lib.dll", Some(ECMA_TOKEN), None),
            "TokenCert",
        )
        .with_explicit(
            ExplicitCertificateKey::new("Lib.dll", Some(ECMA_TOKEN), Some(NET472)),
            "FullCert",
        );
    let plan = signer(ws.config(), tables).run(&[&lib]).unwrap();
    assert_eq!(
        plan.files_to_sign[0].decision,
        SignDecision::ShouldSign("FullCert".into())
    );
}

#[test]
fn test_token_key_without_framework_match() {
    let ws = Workspace::new();
    let image = ManagedAssembly::new("Lib.dll")
        .public_key(&ECMA_PUBLIC_KEY)
        .framework(".NETCoreApp,Version=v3.1")
        .build();
    let lib = ws.file("Lib.dll", &image);

    let tables = name_table(&[("Lib.dll", "NameCert")])
        .with_explicit(
            ExplicitCertificateKey::new("Lib.dll", Some(ECMA_TOKEN), None),
            "TokenCert",
        )
        .with_explicit(
            ExplicitCertificateKey::new("Lib.dll", Some(ECMA_TOKEN), Some(NET472)),
            "FullCert",
        );
    let plan = signer(ws.config(), tables).run(&[&lib]).unwrap();
    assert_eq!(
        plan.files_to_sign[0].decision,
        SignDecision::ShouldSign("TokenCert".into())
    );
}

#[test]
fn test_ignore_sentinel_on_signed_file() {
    let ws = Workspace::new();
    let signed = ws.file("Vendor.dll", &native_image(true));
    let unsigned = ws.file("Skip.dll", &native_image(false));

    let tables = name_table(&[("Vendor.dll", "None"), ("Skip.dll", "None")]);
    let signer = signer(ws.config(), tables);
    let plan = signer.run(&[&signed, &unsigned]).unwrap();
    assert!(plan.files_to_sign.is_empty());

    let info = inspect_bytes(&native_image(true));
    assert_eq!(
        signer.resolver().resolve_info("Vendor.dll", &info).decision,
        SignDecision::Ignore
    );
}

#[test]
fn test_signed_file_keeps_signature_unless_dual_cert() {
    let ws = Workspace::new();
    let image = native_image(true);
    let single = ws.file("single/Tool.exe", &image);

    let tables = name_table(&[("Tool.exe", "Microsoft400")]);
    let plan = signer(ws.config(), tables.clone()).run(&[&single]).unwrap();
    assert!(plan.files_to_sign.is_empty());

    let config = SignToolConfig {
        resign_certificates: vec!["Microsoft400".into()],
        ..ws.config()
    };
    let plan = signer(config, tables).run(&[&single]).unwrap();
    assert_eq!(
        plan.files_to_sign[0].decision,
        SignDecision::ShouldSign("Microsoft400".into())
    );
}

#[test]
fn test_already_signed_without_entry_is_not_missing() {
    let ws = Workspace::new();
    let signed = ws.file("ThirdParty.dll", &native_image(true));
    let signer = signer(ws.config(), CertificateTables::new());
    let plan = signer.run(&[&signed]).unwrap();
    assert!(plan.files_to_sign.is_empty());

    let info = inspect_bytes(&native_image(true));
    assert_eq!(
        signer.resolver().resolve_info("ThirdParty.dll", &info).decision,
        SignDecision::AlreadySigned
    );
}

#[test]
fn test_one_missing_certificate_fails_the_run() {
    let ws = Workspace::new();
    let known = ws.file("Known.dll", &native_image(false));
    let unknown = ws.file("Unknown.dll", &native_image(false));

    let result = signer(ws.config(), name_table(&[("Known.dll", "CertA")]))
        .run(&[&known, &unknown]);
    match result {
        Err(SignToolError::MissingCertificates { entries, report }) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].file_name, "Unknown.dll");
            assert_eq!(entries[0].suggested_certificate, "Microsoft400");
            assert!(report.exists());
        }
        other => panic!("expected missing certificates, got {other:?}"),
    }
}

#[test]
fn test_suggestion_uses_extension_policy() {
    let ws = Workspace::new();
    let package = ws.zip("Pkg.nupkg", &[]);
    let policy = ExtensionPolicy::new().with(".nupkg", "NuGet");

    let result = BatchSigner::new(ws.config(), CertificateTables::new(), policy).run(&[&package]);
    match result {
        Err(SignToolError::MissingCertificates { entries, .. }) => {
            assert_eq!(entries[0].suggested_certificate, "NuGet");
        }
        other => panic!("expected missing certificates, got {other:?}"),
    }
}
