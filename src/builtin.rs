//! Libraries and drivers shipped with Windows itself
//!
//! A binary may import these freely: no manifest is expected to declare them.

use crate::common::ValidateError;
use regex::Regex;

/// Base names (without the `.dll` suffix) of DLLs provided by the Windows runtime
///
/// Entries are regular expression fragments, so API set contracts can be matched as a family
pub const SYSTEM_DLLS: &[&str] = &[
    "advapi32",
    "api-ms-.*",
    "avrt",
    "bcrypt",
    "bcryptprimitives",
    "comctl32",
    "comdlg32",
    "crypt32",
    "dbghelp",
    "dwrite",
    "d2d1",
    "d3d10",
    "d3d11",
    "d3d12",
    "d3d9",
    "dnsapi",
    "dsound",
    "dwmapi",
    "dxgi",
    "gdi32",
    "gdiplus",
    "hid",
    "imm32",
    "iphlpapi",
    "kernel32",
    "ksuser",
    "mf",
    "mfplat",
    "mfreadwrite",
    "msimg32",
    "msvcrt",
    "mswsock",
    "ncrypt",
    "ntdll",
    "ole32",
    "oleaut32",
    "opengl32",
    "psapi",
    "secur32",
    "setupapi",
    "shell32",
    "shlwapi",
    "user32",
    "userenv",
    "usp10",
    "version",
    "winmm",
    "wldap32",
    "ws2_32",
];

/// Base names (without the `.drv` suffix) of drivers provided by Windows
pub const SYSTEM_DRIVERS: &[&str] = &["winspool"];

/// Matcher for the two allowlists, compiled once per run
#[derive(Debug, Clone)]
pub struct BuiltinLibraries {
    dlls: Regex,
    drivers: Regex,
}

impl BuiltinLibraries {
    pub fn new() -> Result<Self, ValidateError> {
        Ok(Self {
            dlls: Regex::new(&format!(r"^({})\.dll$", SYSTEM_DLLS.join("|")))?,
            drivers: Regex::new(&format!(r"^({})\.drv$", SYSTEM_DRIVERS.join("|")))?,
        })
    }

    /// `library` is expected lowercase, as normalized from the import table
    pub fn contains(&self, library: &str) -> bool {
        self.dlls.is_match(library) || self.drivers.is_match(library)
    }
}
