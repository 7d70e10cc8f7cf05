//! Integration tests for Mach-O classification on synthetic binaries.

mod helpers;

use std::fs;
use std::os::unix::fs::symlink;

use helpers::{fat_macho, thin_macho, write_binary, TestEnv, CPU_ARM64, CPU_X86_64};
use relopy::macho::{classify, is_macho_file, mach_files, Arch, FileClass};

#[test]
fn test_thin_binary_classification() {
    let env = TestEnv::new();
    let path = env.root.join("bin/python3.14");

    let info = match classify(&path) {
        FileClass::Mach(info) => info,
        other => panic!("expected Mach-O, got {:?}", other),
    };

    assert!(!info.is_universal());
    assert!(info.archs.contains(&Arch::Arm64));
    assert_eq!(info.archs.len(), 1);
    assert!(info.load_refs.is_empty());
    assert!(is_macho_file(&path));
}

#[test]
fn test_universal_binary_reports_both_slices() {
    let env = TestEnv::new();
    let path = env.root.join("lib/libuniversal.dylib");
    write_binary(&path, &fat_macho(&[CPU_ARM64, CPU_X86_64]));

    let info = match classify(&path) {
        FileClass::Mach(info) => info,
        other => panic!("expected Mach-O, got {:?}", other),
    };

    // Universal detection and the arch set must agree.
    assert!(info.is_universal());
    assert_eq!(info.archs.len(), 2);
    assert!(info.archs.contains(&Arch::Arm64));
    assert!(info.archs.contains(&Arch::X86_64));
}

#[test]
fn test_single_slice_fat_container_is_not_universal() {
    let env = TestEnv::new();
    let path = env.root.join("lib/libonearch.dylib");
    write_binary(&path, &fat_macho(&[CPU_ARM64]));

    let info = match classify(&path) {
        FileClass::Mach(info) => info,
        other => panic!("expected Mach-O, got {:?}", other),
    };

    assert!(!info.is_universal());
    assert_eq!(info.archs.len(), 1);
}

#[test]
fn test_truncated_binary_classifies_as_data() {
    let env = TestEnv::new();
    let path = env.root.join("lib/truncated.dylib");
    let bytes = thin_macho(CPU_ARM64);
    fs::write(&path, &bytes[..8]).unwrap();

    assert!(matches!(classify(&path), FileClass::Data));
}

#[test]
fn test_mach_files_skips_symlinks_and_scripts() {
    let env = TestEnv::new();
    symlink("python3.14", env.root.join("bin/python3")).unwrap();

    let found = mach_files(&env.root);

    assert_eq!(found.len(), 6);
    assert!(found.iter().all(|(path, _)| !path.ends_with("python3")));
    assert!(found.iter().all(|(path, _)| !path.ends_with("pip3.14")));
}
