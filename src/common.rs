use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Manifest structure error: {0}")]
    ManifestError(String),

    #[error("Could not run {program}: {source}")]
    ToolError {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed on {}: {status}", .path.display())]
    ToolFailed {
        program: String,
        path: std::path::PathBuf,
        status: std::process::ExitStatus,
    },

    #[error("Not a PE file: {0}")]
    WrongFileFormatError(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    XmlError(#[from] roxmltree::Error),
    #[error(transparent)]
    RegexError(#[from] regex::Error),
    #[error(transparent)]
    PEError(#[from] pelite::Error),
}

/// What a declared or shipped file is, as far as dependency checking is concerned
///
/// Computed from the file extension, case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Library,
    Executable,
    Other,
}

impl FileKind {
    pub fn of<P: AsRef<Path>>(path: P) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("dll") => Self::Library,
            Some("exe") => Self::Executable,
            _ => Self::Other,
        }
    }

    /// DLLs and EXEs have an import table worth inspecting
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Library | Self::Executable)
    }
}

/// Lowercase file name of a path, as it would appear in an import table
pub fn library_name<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .file_name()
        .and_then(|f| f.to_str())
        .map(|f| f.to_lowercase())
}

pub fn path_to_string<P: AsRef<Path>>(p: P) -> String {
    p.as_ref().to_string_lossy().into_owned()
}
