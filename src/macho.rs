//! Mach-O inspection and script detection.
//!
//! Classifies files in the distribution tree without spawning external
//! tools: Mach-O headers (thin and fat) are read directly with `goblin`,
//! the same way `otool` would read them but without executing anything.
//! Mutation of link metadata is done elsewhere via `install_name_tool`;
//! this module is strictly read-only.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use goblin::mach::{Mach, MachO};
use goblin::Hint;
use serde::Serialize;
use walkdir::WalkDir;

/// CPU architecture of a Mach-O slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm64,
    X86_64,
    Other(u32),
}

impl Arch {
    fn from_cputype(cputype: u32) -> Self {
        use goblin::mach::cputype::{CPU_TYPE_ARM64, CPU_TYPE_X86_64};
        match cputype {
            CPU_TYPE_ARM64 => Self::Arm64,
            CPU_TYPE_X86_64 => Self::X86_64,
            other => Self::Other(other),
        }
    }

    /// Architecture name as `lipo` spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            _ => Err(format!(
                "Unknown architecture '{}' (expected arm64 or x86_64)",
                s
            )),
        }
    }
}

/// Link metadata of a Mach-O file (thin or fat).
#[derive(Debug, Clone, Default)]
pub struct MachInfo {
    /// Architecture slices present in the file.
    pub archs: BTreeSet<Arch>,
    /// Install name (`LC_ID_DYLIB`), present on dylibs only.
    pub install_name: Option<String>,
    /// Load references (`LC_LOAD_DYLIB` and friends).
    pub load_refs: Vec<String>,
}

impl MachInfo {
    /// True if the file carries more than one architecture slice.
    pub fn is_universal(&self) -> bool {
        self.archs.len() > 1
    }
}

/// What a regular file in the tree turned out to be.
#[derive(Debug, Clone)]
pub enum FileClass {
    /// A native Mach-O binary (executable, dylib, or extension module).
    Mach(MachInfo),
    /// A `#!` script; the interpreter is the shebang target's basename,
    /// with `env` indirection resolved.
    Script { interpreter: Option<String> },
    /// Anything else (pure-source module, resource, unreadable file).
    Data,
}

/// Classify a filesystem object.
///
/// Never fails: unreadable files, directories, and unparseable binaries
/// all classify as [`FileClass::Data`]. Classification is computed fresh
/// on every call; callers must not cache it across mutations.
pub fn classify(path: &Path) -> FileClass {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(_) => return FileClass::Data,
    };

    if data.starts_with(b"#!") {
        return FileClass::Script {
            interpreter: parse_shebang(&data),
        };
    }

    match parse_mach_bytes(&data) {
        Some(info) => FileClass::Mach(info),
        None => FileClass::Data,
    }
}

/// Check whether a file is Mach-O by peeking at its magic bytes.
///
/// Cheaper than [`classify`] when only the yes/no answer is needed.
pub fn is_macho_file(path: &Path) -> bool {
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut bytes = [0u8; 16];
    if file.read_exact(&mut bytes).is_err() {
        return false;
    }

    matches!(
        goblin::mach::peek_bytes(&bytes),
        Ok(Hint::Mach(_) | Hint::MachFat(_))
    )
}

/// Parse Mach-O data, returning None for non-Mach-O content.
fn parse_mach_bytes(data: &[u8]) -> Option<MachInfo> {
    match Mach::parse(data).ok()? {
        Mach::Binary(macho) => Some(parse_thin(&macho)),
        Mach::Fat(fat) => {
            let mut info = MachInfo::default();

            // The arch set comes from the fat headers; slice payloads are
            // parsed for link metadata where they are well-formed.
            for arch in fat.iter_arches().flatten() {
                info.archs.insert(Arch::from_cputype(arch.cputype()));

                let start = arch.offset as usize;
                let Some(end) = start.checked_add(arch.size as usize) else {
                    continue;
                };
                let Some(slice) = data.get(start..end) else {
                    continue;
                };
                if let Ok(macho) = MachO::parse(slice, 0) {
                    let parsed = parse_thin(&macho);
                    info.install_name = info.install_name.or(parsed.install_name);
                    for load_ref in parsed.load_refs {
                        if !info.load_refs.contains(&load_ref) {
                            info.load_refs.push(load_ref);
                        }
                    }
                }
            }

            if info.archs.is_empty() {
                None
            } else {
                Some(info)
            }
        }
    }
}

fn parse_thin(macho: &MachO) -> MachInfo {
    MachInfo {
        archs: BTreeSet::from([Arch::from_cputype(macho.header.cputype())]),
        install_name: macho.name.map(ToString::to_string),
        // goblin keeps an implicit "self" entry at libs[0] for two-level
        // namespace ordinals; it is not a real load command.
        load_refs: macho
            .libs
            .iter()
            .filter(|&lib| lib != &"self")
            .map(ToString::to_string)
            .collect(),
    }
}

/// Enumerate every Mach-O file under a root, in stable path order.
///
/// Symlinks are skipped so a binary reachable through several links is
/// processed once, at its real location.
pub fn mach_files(root: &Path) -> Vec<(PathBuf, MachInfo)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        if let FileClass::Mach(info) = classify(entry.path()) {
            found.push((entry.path().to_path_buf(), info));
        }
    }
    found
}

/// Extract the interpreter basename from a shebang line.
///
/// `#!/prefix/bin/python3.14` yields `python3.14`;
/// `#!/usr/bin/env python3` resolves the `env` indirection to `python3`.
pub fn parse_shebang(data: &[u8]) -> Option<String> {
    let rest = data.strip_prefix(b"#!")?;
    let line_end = rest.iter().position(|b| *b == b'\n').unwrap_or(rest.len());
    let line = String::from_utf8_lossy(&rest[..line_end]);

    let mut tokens = line.split_whitespace();
    let target = tokens.next()?;
    let basename = Path::new(target).file_name()?.to_string_lossy();

    if basename == "env" {
        tokens.next().map(|name| {
            Path::new(name)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string())
        })
    } else {
        Some(basename.into_owned())
    }
}
