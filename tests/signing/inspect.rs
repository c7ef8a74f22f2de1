//! Binary inspection of synthetic images.

use batchsign::inspect::{inspect, inspect_bytes, public_key_token, AssemblyKind, BinaryInfo};
use batchsign::io::error::IoError;
use batchsign::io::IOLimits;

use crate::common::image::{native_image, ManagedAssembly, ECMA_PUBLIC_KEY};
use crate::common::Workspace;

#[test]
fn test_native_image() {
    let info = inspect_bytes(&native_image(false));
    assert_eq!(info.kind, AssemblyKind::Native);
    assert!(info.is_structured_executable());
    assert!(!info.is_signed);
    assert!(info.public_key_token.is_empty());
    assert!(info.target_framework.is_empty());
}

#[test]
fn test_signed_native_image() {
    let info = inspect_bytes(&native_image(true));
    assert_eq!(info.kind, AssemblyKind::Native);
    assert!(info.is_signed);
}

#[test]
fn test_managed_identity() {
    let image = ManagedAssembly::new("Lib.dll")
        .public_key(&ECMA_PUBLIC_KEY)
        .framework(".NETFramework,Version=v4.7.2")
        .build();
    let info = inspect_bytes(&image);
    assert_eq!(info.kind, AssemblyKind::Managed);
    assert!(!info.is_signed);
    assert_eq!(info.public_key_token, "b77a5c561934e089");
    assert_eq!(info.target_framework, ".NETFramework,Version=v4.7.2");
}

#[test]
fn test_signed_managed_image() {
    let image = ManagedAssembly::new("Lib.dll").signed().build();
    let info = inspect_bytes(&image);
    assert_eq!(info.kind, AssemblyKind::Managed);
    assert!(info.is_signed);
    assert!(info.public_key_token.is_empty());
}

#[test]
fn test_framework_is_normalized() {
    let image = ManagedAssembly::new("App.exe")
        .framework(" .NETCoreApp , Version = 3.1")
        .build();
    assert_eq!(inspect_bytes(&image).target_framework, ".NETCoreApp,Version=v3.1");
}

#[test]
fn test_unparsable_framework_is_empty() {
    let image = ManagedAssembly::new("App.exe").framework("garbage").build();
    let info = inspect_bytes(&image);
    assert_eq!(info.kind, AssemblyKind::Managed);
    assert!(info.target_framework.is_empty());
}

#[test]
fn test_module_level_framework_is_ignored() {
    let image = ManagedAssembly::new("Lib.dll")
        .module_framework(".NETStandard,Version=v2.0")
        .build();
    assert!(inspect_bytes(&image).target_framework.is_empty());

    let image = ManagedAssembly::new("Lib.dll")
        .module_framework(".NETStandard,Version=v2.0")
        .framework(".NETFramework,Version=v4.6.1")
        .build();
    assert_eq!(
        inspect_bytes(&image).target_framework,
        ".NETFramework,Version=v4.6.1"
    );
}

#[test]
fn test_netmodule_has_no_token() {
    let image = ManagedAssembly::new("Part.netmodule")
        .module_framework(".NETStandard,Version=v2.0")
        .netmodule()
        .build();
    let info = inspect_bytes(&image);
    assert_eq!(info.kind, AssemblyKind::Managed);
    assert!(info.public_key_token.is_empty());
    assert!(info.target_framework.is_empty());
}

#[test]
fn test_full_size_public_key() {
    let key: Vec<u8> = (0..160u32).map(|i| (i * 7 % 251) as u8).collect();
    let image = ManagedAssembly::new("Big.dll").public_key(&key).build();
    let info = inspect_bytes(&image);
    assert_eq!(info.public_key_token, public_key_token(&key));
    assert_eq!(info.public_key_token.len(), 16);
}

#[test]
fn test_corrupt_metadata_is_native() {
    let mut image = ManagedAssembly::new("Lib.dll")
        .public_key(&ECMA_PUBLIC_KEY)
        .build();
    let at = image
        .windows(4)
        .position(|w| w == b"BSJB")
        .expect("metadata signature");
    image[at..at + 4].copy_from_slice(b"XXXX");
    let info = inspect_bytes(&image);
    assert_eq!(info.kind, AssemblyKind::Native);
    assert!(info.public_key_token.is_empty());
}

#[test]
fn test_non_pe_content() {
    for content in [&b""[..], &b"MZ"[..], &b"PK\x03\x04"[..], &b"plain text"[..]] {
        let info = inspect_bytes(content);
        assert_eq!(info.kind, AssemblyKind::Unrecognized);
        assert!(!info.is_signed);
    }
}

#[test]
fn test_inspect_from_disk() {
    let ws = Workspace::new();
    let path = ws.file(
        "Lib.dll",
        &ManagedAssembly::new("Lib.dll")
            .public_key(&ECMA_PUBLIC_KEY)
            .build(),
    );
    let info = inspect(&path, &IOLimits::default()).unwrap();
    assert_eq!(info.public_key_token, "b77a5c561934e089");

    let empty = ws.file("empty.dll", b"");
    assert_eq!(
        inspect(&empty, &IOLimits::default()).unwrap().kind,
        AssemblyKind::Unrecognized
    );
}

#[test]
fn test_oversized_image_is_left_unclassified() {
    let ws = Workspace::new();
    let path = ws.file("Native.dll", &native_image(false));
    let limits = IOLimits {
        max_file_size: 64,
        ..Default::default()
    };
    let info = inspect(&path, &limits).unwrap();
    assert_eq!(info.kind, AssemblyKind::Unrecognized);

    let limits = IOLimits {
        max_read_bytes: 64,
        ..Default::default()
    };
    assert_eq!(inspect(&path, &limits).unwrap().kind, AssemblyKind::Unrecognized);
}

#[test]
fn test_oversized_non_pe_is_sniffed() {
    let ws = Workspace::new();
    let path = ws.file("big.ps1", &[b'#'; 200]);
    let limits = IOLimits {
        max_file_size: 100,
        ..Default::default()
    };
    assert_eq!(inspect(&path, &limits).unwrap(), BinaryInfo::default());
}

#[test]
fn test_missing_file_is_an_error() {
    let ws = Workspace::new();
    assert!(matches!(
        inspect(ws.root().join("absent.dll"), &IOLimits::default()),
        Err(IoError::StdIo(_))
    ));
}
