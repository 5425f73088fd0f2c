//! Parameters of a validation run

use crate::arch::Arch;
use std::path::{Path, PathBuf};

pub const SYSROOT32_VAR: &str = "WXI_VALIDATE_SYSROOT32";
pub const SYSROOT64_VAR: &str = "WXI_VALIDATE_SYSROOT64";
pub const RPM_VAR: &str = "WXI_VALIDATE_RPM";
pub const OBJDUMP_VAR: &str = "WXI_VALIDATE_OBJDUMP";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Root of the 32-bit mingw installation, substituted for `$(var.SourceDir)`
    pub sysroot32: PathBuf,
    /// Root of the 64-bit mingw installation, substituted for `$(var.SourceDir)`
    pub sysroot64: PathBuf,
    /// Package manager used to query install status and file lists
    pub rpm: String,
    /// External import table dumper; the built-in PE reader is used when unset
    pub objdump: Option<String>,
    /// Extension of the sidecar file holding ignore patterns for a manifest
    pub ignore_extension: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sysroot32: PathBuf::from("/usr/i686-w64-mingw32/sys-root/mingw"),
            sysroot64: PathBuf::from("/usr/x86_64-w64-mingw32/sys-root/mingw"),
            rpm: "rpm".to_owned(),
            objdump: None,
            ignore_extension: "ignore".to_owned(),
        }
    }
}

impl Settings {
    /// defaults, overridden by the WXI_VALIDATE_* environment variables that are set
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut ret = Self::default();
        if let Some(s) = lookup(SYSROOT32_VAR) {
            ret.sysroot32 = PathBuf::from(s);
        }
        if let Some(s) = lookup(SYSROOT64_VAR) {
            ret.sysroot64 = PathBuf::from(s);
        }
        if let Some(s) = lookup(RPM_VAR) {
            ret.rpm = s;
        }
        ret.objdump = lookup(OBJDUMP_VAR).filter(|s| !s.is_empty());
        ret
    }

    pub fn sysroot(&self, arch: Arch) -> &Path {
        match arch {
            Arch::X86 => &self.sysroot32,
            Arch::X64 => &self.sysroot64,
        }
    }
}
