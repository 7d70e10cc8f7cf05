//! Integration tests for the component removal engine.

mod helpers;

use std::fs;

use helpers::{assert_exists, assert_missing, thin_macho, write_binary, TestEnv, CPU_ARM64};
use relopy::trim::trim;

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_component_removes_dir_module_and_extension() {
    let env = TestEnv::new();
    let stdlib = env.root.join("lib/python3.14");

    fs::create_dir_all(stdlib.join("moduleA")).unwrap();
    fs::write(stdlib.join("moduleA/core.py"), "").unwrap();
    fs::write(stdlib.join("moduleA.py"), "").unwrap();
    write_binary(
        &stdlib.join("lib-dynload/_moduleA.cpython-314-darwin.so"),
        &thin_macho(CPU_ARM64),
    );

    let report = trim(&env.layout(), &strings(&["moduleA"]), false).unwrap();

    assert_missing(&stdlib.join("moduleA"));
    assert_missing(&stdlib.join("moduleA.py"));
    assert_missing(&stdlib.join("lib-dynload/_moduleA.cpython-314-darwin.so"));

    assert_eq!(report.components.len(), 1);
    assert!(report.components[0].matched());
    assert_eq!(report.components[0].removed.len(), 3);
    assert!(!report.nothing_matched());
}

#[test]
fn test_unmatched_component_is_reported_not_fatal() {
    let env = TestEnv::new();

    let report = trim(&env.layout(), &strings(&["nosuchcomponent"]), false).unwrap();

    assert!(report.nothing_matched());
    assert_eq!(report.unmatched(), vec!["nosuchcomponent"]);
}

#[test]
fn test_trim_twice_is_a_noop() {
    let env = TestEnv::new();
    let components = strings(&["json"]);

    let first = trim(&env.layout(), &components, false).unwrap();
    assert!(first.components[0].matched());

    let second = trim(&env.layout(), &components, false).unwrap();
    assert!(second.nothing_matched());
}

#[test]
fn test_duplicate_components_are_noops() {
    let env = TestEnv::new();

    let report = trim(&env.layout(), &strings(&["json", "json"]), false).unwrap();

    assert_eq!(report.components.len(), 2);
    assert!(report.components[0].matched());
    assert!(!report.components[1].matched());
}

#[test]
fn test_guard_partial_overlap_keeps_openssl() {
    let env = TestEnv::new();

    let report = trim(&env.layout(), &strings(&["ssl"]), false).unwrap();

    // The ssl component itself is gone...
    assert_missing(&env.root.join("lib/python3.14/ssl.py"));
    assert_missing(
        &env.root
            .join("lib/python3.14/lib-dynload/_ssl.cpython-314-darwin.so"),
    );

    // ...but hashlib still needs the shared dylibs.
    assert_exists(&env.root.join("lib/libssl.3.dylib"));
    assert_exists(&env.root.join("lib/libcrypto.3.dylib"));
    assert!(report.shared_resources_removed.is_empty());
}

#[test]
fn test_guard_full_set_removes_openssl() {
    let env = TestEnv::new();

    let report = trim(&env.layout(), &strings(&["ssl", "hashlib"]), false).unwrap();

    assert_missing(&env.root.join("lib/libssl.3.dylib"));
    assert_missing(&env.root.join("lib/libcrypto.3.dylib"));
    assert_eq!(report.shared_resources_removed.len(), 2);
}

#[test]
fn test_guard_is_order_independent() {
    let env = TestEnv::new();

    let report = trim(&env.layout(), &strings(&["hashlib", "ssl"]), false).unwrap();

    assert_missing(&env.root.join("lib/libssl.3.dylib"));
    assert_missing(&env.root.join("lib/libcrypto.3.dylib"));
    assert_eq!(report.shared_resources_removed.len(), 2);
}

#[test]
fn test_pycache_component_removes_caches_tree_wide() {
    let env = TestEnv::new();
    fs::create_dir_all(env.root.join("lib/python3.14/json/__pycache__")).unwrap();
    fs::write(
        env.root.join("lib/python3.14/json/__pycache__/x.cpython-314.pyc"),
        b"\x00",
    )
    .unwrap();

    let report = trim(&env.layout(), &strings(&["pycache"]), false).unwrap();

    assert_missing(&env.root.join("lib/python3.14/__pycache__"));
    assert_missing(&env.root.join("lib/python3.14/json/__pycache__"));
    assert!(report.components[0].matched());
}

#[test]
fn test_headers_component_removes_include_tree() {
    let env = TestEnv::new();

    trim(&env.layout(), &strings(&["headers"]), false).unwrap();

    assert_missing(&env.root.join("include"));
}

#[test]
fn test_dist_info_component_keeps_package_code() {
    let env = TestEnv::new();

    trim(&env.layout(), &strings(&["dist-info"]), false).unwrap();

    assert_missing(
        &env.root
            .join("lib/python3.14/site-packages/pip-25.0.dist-info"),
    );
    assert_exists(&env.root.join("lib/python3.14/site-packages/pip"));
}

#[test]
fn test_bin_script_rule_removes_runtime_scripts() {
    let env = TestEnv::new();

    trim(&env.layout(), &strings(&["pip"]), false).unwrap();

    // Script interpreted by the runtime's own python, plus the
    // site-packages entries prefixed by the component name.
    assert_missing(&env.root.join("bin/pip3.14"));
    assert_missing(&env.root.join("lib/python3.14/site-packages/pip"));
    assert_missing(
        &env.root
            .join("lib/python3.14/site-packages/pip-25.0.dist-info"),
    );
}

#[test]
fn test_bin_script_with_foreign_interpreter_is_kept() {
    let env = TestEnv::new();
    fs::write(env.root.join("bin/pipewire-helper"), "#!/bin/bash\nexit 0\n").unwrap();

    trim(&env.layout(), &strings(&["pip"]), false).unwrap();

    assert_exists(&env.root.join("bin/pipewire-helper"));
}

#[test]
fn test_substring_matching_over_matches_by_design() {
    let env = TestEnv::new();
    let dynload = env.root.join("lib/python3.14/lib-dynload");
    write_binary(
        &dynload.join("_multibytecodec.cpython-314-darwin.so"),
        &thin_macho(CPU_ARM64),
    );

    trim(&env.layout(), &strings(&["codec"]), false).unwrap();

    assert_missing(&dynload.join("_multibytecodec.cpython-314-darwin.so"));
}

#[test]
fn test_strict_matching_requires_name_prefix() {
    let env = TestEnv::new();
    let dynload = env.root.join("lib/python3.14/lib-dynload");
    write_binary(
        &dynload.join("_multibytecodec.cpython-314-darwin.so"),
        &thin_macho(CPU_ARM64),
    );

    let report = trim(&env.layout(), &strings(&["codec"]), true).unwrap();

    assert_exists(&dynload.join("_multibytecodec.cpython-314-darwin.so"));
    assert!(report.nothing_matched());
}
