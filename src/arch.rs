//! Target architectures and the rules mapping a manifest source path onto each of them

use crate::common::ValidateError;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

pub const SOURCE_DIR_VAR: &str = "$(var.SourceDir)";
pub const GLIB_ARCH_VAR: &str = "$(var.GLIB_ARCH)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::X86, Arch::X64];

    /// Prefix of the distribution package built for this architecture
    pub fn package_prefix(self) -> &'static str {
        match self {
            Self::X86 => "mingw32",
            Self::X64 => "mingw64",
        }
    }

    /// Value of `$(var.GLIB_ARCH)`
    pub fn glib_arch(self) -> &'static str {
        match self {
            Self::X86 => "win32",
            Self::X64 => "win64",
        }
    }

    pub fn package_name(self, base: &str) -> String {
        format!("{}-{}", self.package_prefix(), base)
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArchRule {
    pub pattern: Regex,
    /// architecture for which a matching path does not exist
    pub excluded: Arch,
}

/// Files that only exist for one architecture
///
/// Manifests select them with `<?if?>` conditionals, which are not evaluated; these rules
/// null out the resolved path for the architecture that doesn't ship the file.
#[derive(Debug, Clone)]
pub struct ArchRules {
    rules: Vec<ArchRule>,
}

/// (pattern, architecture the pattern is invalid for), evaluated in order
pub const STANDARD_RULES: &[(&str, Arch)] = &[
    // gcc runtime: SEH unwinding on 64-bit, DWARF-2 on 32-bit
    (r"libgcc_s_seh-1\.dll", Arch::X86),
    (r"libgcc_s_dw2-1\.dll", Arch::X64),
    // openssl only tags the 64-bit libraries
    (r"lib(ssl|crypto)-[^-]+-x64\.dll", Arch::X86),
    (r"lib(ssl|crypto)-[^-]+\.dll", Arch::X64),
    // explicit architecture in the path, e.g. gstreamer plugin scanners
    (r"x86_64", Arch::X86),
    (r"i686", Arch::X64),
];

impl ArchRules {
    pub fn new(rules: &[(&str, Arch)]) -> Result<Self, ValidateError> {
        let rules = rules
            .iter()
            .map(|(p, excluded)| {
                Ok(ArchRule {
                    pattern: Regex::new(p)?,
                    excluded: *excluded,
                })
            })
            .collect::<Result<Vec<_>, ValidateError>>()?;
        Ok(Self { rules })
    }

    pub fn standard() -> Result<Self, ValidateError> {
        Self::new(STANDARD_RULES)
    }

    /// true if `source`, with `$(var.GLIB_ARCH)` already expanded for `arch`, must be dropped
    pub fn excludes(&self, arch: Arch, source: &str) -> bool {
        self.rules
            .iter()
            .filter(|r| r.excluded == arch)
            .any(|r| r.pattern.is_match(source))
    }

    /// Concrete path of `source` for `arch`, or None if the file doesn't exist for it
    ///
    /// Rules see the source with only `$(var.GLIB_ARCH)` expanded, never the sysroot.
    pub fn resolve(&self, source: &str, arch: Arch, sysroot: &Path) -> Option<String> {
        let source = source.replace(GLIB_ARCH_VAR, arch.glib_arch());
        if self.excludes(arch, &source) {
            return None;
        }
        Some(source.replace(SOURCE_DIR_VAR, &sysroot.to_string_lossy()))
    }
}
