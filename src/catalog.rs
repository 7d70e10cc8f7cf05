//! Declarative component catalog.
//!
//! Components are described as data: each name resolves to a list of
//! removal rules that the trim engine interprets. The catalog is an
//! open-ended lookup with a generic fallback, so a component that was
//! never cataloged still resolves to the directory/module/extension/
//! site-package rules and can be trimmed without a code change.
//!
//! ```text
//! Catalog entry (DATA)          →     Trim engine (LOGIC)
//! ──────────────────────────         ─────────────────────
//! "pycache" => [BytecodeCaches]      for rule in rules_for(name) {
//! "tkinter" => GENERIC_RULES             apply_rule(layout, rule)?;
//!                                    }
//! ```

/// A single removal rule, evaluated independently; matches are unioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalRule {
    /// Stdlib package directory: `lib/<ver>/<component>`.
    StdlibDir,
    /// Single stdlib module: `lib/<ver>/<component>.py`.
    StdlibModule,
    /// Native extension in `lib/<ver>/lib-dynload/` whose filename matches
    /// the component name (substring by default, `<component>.` prefix in
    /// strict mode).
    DynloadExtension,
    /// Entry under `lib/<ver>/site-packages/` whose name is prefixed by the
    /// component name (covers installer metadata directories).
    SitePackage,
    /// Helper script in `bin/` named after the component and interpreted by
    /// the runtime's own python.
    BinScript,
    /// All `__pycache__` directories and `*.pyc` files, tree-wide.
    BytecodeCaches,
    /// The SDK header tree under `include/`.
    HeaderTrees,
    /// All `*.dist-info` / `*.egg-info` installer metadata, tree-wide.
    InstallerMetadata,
}

/// Rules applied to any component without a dedicated catalog entry.
pub const GENERIC_RULES: &[RemovalRule] = &[
    RemovalRule::StdlibDir,
    RemovalRule::StdlibModule,
    RemovalRule::DynloadExtension,
    RemovalRule::SitePackage,
    RemovalRule::BinScript,
];

/// Resolve a component name to its removal rules.
///
/// Special-cased components are named here, not inferred; everything else
/// falls back to [`GENERIC_RULES`]. The fallback can over-match (a name
/// that is a substring of an unrelated extension's filename); that is the
/// documented compatibility behavior, with strict matching as an opt-in.
pub fn rules_for(component: &str) -> &'static [RemovalRule] {
    match component {
        "pycache" => &[RemovalRule::BytecodeCaches],
        "headers" => &[RemovalRule::HeaderTrees],
        "dist-info" => &[RemovalRule::InstallerMetadata],
        _ => GENERIC_RULES,
    }
}

/// Whether a lib-dynload filename matches a component.
///
/// Default mode preserves the original substring semantics
/// (`cmath` matches `cmath.cpython-314-darwin.so`, but also any extension
/// merely containing "cmath"). Strict mode requires the filename to start
/// with `<component>.`.
pub fn extension_matches(file_name: &str, component: &str, strict: bool) -> bool {
    if strict {
        file_name.starts_with(&format!("{}.", component))
    } else {
        file_name.contains(component)
    }
}

/// A resource shared by several components, deleted only when every
/// declared dependent is being removed in the same invocation.
#[derive(Debug, Clone, Copy)]
pub struct SharedResourceGuard {
    /// Name for reporting.
    pub name: &'static str,
    /// Components that load the resource.
    pub dependents: &'static [&'static str],
    /// Filename prefixes of the guarded dylibs in `lib/`.
    pub lib_prefixes: &'static [&'static str],
}

impl SharedResourceGuard {
    /// Pure function over the full requested-component set.
    ///
    /// Evaluated once after all per-component removal so the outcome is
    /// independent of component ordering. Partial overlap leaves the
    /// resource untouched.
    pub fn triggered_by(&self, requested: &[String]) -> bool {
        self.dependents
            .iter()
            .all(|dep| requested.iter().any(|r| r == dep))
    }
}

/// The bundled OpenSSL dylibs are shared by the `ssl` and `hashlib`
/// extension modules; removing only one of them must keep the dylibs.
pub const SHARED_RESOURCE_GUARDS: &[SharedResourceGuard] = &[SharedResourceGuard {
    name: "openssl",
    dependents: &["ssl", "hashlib"],
    lib_prefixes: &["libssl", "libcrypto"],
}];
