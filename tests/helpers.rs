//! Shared test utilities for relopy tests.
//!
//! Builds a mock CPython installation tree in a temp directory, with
//! synthetic Mach-O files that goblin parses but that contain no real
//! code. No test here shells out to Apple tools.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use relopy::layout::RuntimeLayout;

/// Mach-O cputype constants (CPU_ARCH_ABI64 | base type).
pub const CPU_ARM64: u32 = 0x0100_000C;
pub const CPU_X86_64: u32 = 0x0100_0007;
/// 32-bit ARM; used to fabricate "universal but wrong slices" binaries.
pub const CPU_ARM32: u32 = 0x0000_000C;

/// A minimal 64-bit Mach-O header with zero load commands.
pub fn thin_macho(cputype: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(&0xFEED_FACF_u32.to_le_bytes()); // MH_MAGIC_64
    bytes.extend_from_slice(&cputype.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // cpusubtype
    bytes.extend_from_slice(&2u32.to_le_bytes()); // filetype: MH_EXECUTE
    bytes.extend_from_slice(&0u32.to_le_bytes()); // ncmds
    bytes.extend_from_slice(&0u32.to_le_bytes()); // sizeofcmds
    bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
    bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
    bytes
}

/// A fat (universal) Mach-O containing one thin slice per cputype.
///
/// The fat header and arch table are big-endian, as on disk.
pub fn fat_macho(cputypes: &[u32]) -> Vec<u8> {
    let header_len = 8 + 20 * cputypes.len();

    let mut table = Vec::new();
    let mut slices = Vec::new();
    let mut offset = header_len;
    for &cputype in cputypes {
        let slice = thin_macho(cputype);
        table.extend_from_slice(&cputype.to_be_bytes());
        table.extend_from_slice(&0u32.to_be_bytes()); // cpusubtype
        table.extend_from_slice(&(offset as u32).to_be_bytes());
        table.extend_from_slice(&(slice.len() as u32).to_be_bytes());
        table.extend_from_slice(&0u32.to_be_bytes()); // align
        offset += slice.len();
        slices.push(slice);
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes()); // FAT_MAGIC
    bytes.extend_from_slice(&(cputypes.len() as u32).to_be_bytes());
    bytes.extend(table);
    for slice in slices {
        bytes.extend(slice);
    }
    bytes
}

/// Test environment with a mock runtime tree.
pub struct TestEnv {
    /// Temporary directory (kept alive for the lifetime of TestEnv).
    pub _temp_dir: TempDir,
    /// Root of the mock runtime installation.
    pub root: PathBuf,
}

impl TestEnv {
    /// Create a mock CPython 3.14 installation.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("python");

        let dirs = [
            "bin",
            "lib/python3.14/json",
            "lib/python3.14/__pycache__",
            "lib/python3.14/lib-dynload",
            "lib/python3.14/site-packages/pip",
            "lib/python3.14/site-packages/pip-25.0.dist-info",
            "include/python3.14",
        ];
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).expect("Failed to create mock dir");
        }

        // Native binaries
        write_binary(&root.join("bin/python3.14"), &thin_macho(CPU_ARM64));
        write_binary(&root.join("lib/libpython3.14.dylib"), &thin_macho(CPU_ARM64));
        write_binary(&root.join("lib/libcrypto.3.dylib"), &thin_macho(CPU_ARM64));
        write_binary(&root.join("lib/libssl.3.dylib"), &thin_macho(CPU_ARM64));
        write_binary(
            &root.join("lib/python3.14/lib-dynload/_ssl.cpython-314-darwin.so"),
            &thin_macho(CPU_ARM64),
        );
        write_binary(
            &root.join("lib/python3.14/lib-dynload/_hashlib.cpython-314-darwin.so"),
            &thin_macho(CPU_ARM64),
        );

        // Helper script interpreted by the runtime itself
        let shebang = format!("#!{}/bin/python3.14\nimport pip\n", root.display());
        fs::write(root.join("bin/pip3.14"), shebang).expect("Failed to write script");

        // Pure-source stdlib and packages
        fs::write(root.join("lib/python3.14/os.py"), "import abc\n").unwrap();
        fs::write(root.join("lib/python3.14/ssl.py"), "import _ssl\n").unwrap();
        fs::write(root.join("lib/python3.14/hashlib.py"), "import _hashlib\n").unwrap();
        fs::write(root.join("lib/python3.14/json/__init__.py"), "").unwrap();
        fs::write(
            root.join("lib/python3.14/__pycache__/os.cpython-314.pyc"),
            b"\x00",
        )
        .unwrap();
        fs::write(root.join("lib/python3.14/site-packages/pip/__init__.py"), "").unwrap();
        fs::write(
            root.join("lib/python3.14/site-packages/pip-25.0.dist-info/METADATA"),
            "Name: pip\n",
        )
        .unwrap();
        fs::write(root.join("include/python3.14/Python.h"), "#define PY\n").unwrap();

        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Discover the layout of the mock tree.
    pub fn layout(&self) -> RuntimeLayout {
        RuntimeLayout::discover(&self.root).expect("mock tree should discover")
    }
}

/// Write a file and mark it executable.
pub fn write_binary(path: &Path, bytes: &[u8]) {
    fs::write(path, bytes).expect("Failed to write mock binary");
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// Assert that a path exists.
pub fn assert_exists(path: &Path) {
    assert!(path.exists(), "Expected to exist: {}", path.display());
}

/// Assert that a path is gone (not even a symlink).
pub fn assert_missing(path: &Path) {
    assert!(
        fs::symlink_metadata(path).is_err(),
        "Expected to be removed: {}",
        path.display()
    );
}
