//! Reading the import table of PE files, through goblin and pelite or an external objdump

use crate::common::ValidateError;
use fs_err as fs;
use pelite::pe32::Pe as _;
use pelite::pe64::Pe as _;
use regex::Regex;
use std::path::Path;
use std::process::Command;

/// Lists the DLLs a binary links against at load time
pub trait ImportInspector {
    /// names as they appear in the import table, lowercased, in table order
    fn imported_libraries(&self, path: &Path) -> Result<Vec<String>, ValidateError>;
}

/// Parses the file in-process
#[derive(Debug, Default, Clone, Copy)]
pub struct PeInspector;

impl ImportInspector for PeInspector {
    fn imported_libraries(&self, path: &Path) -> Result<Vec<String>, ValidateError> {
        let content = fs::read(path)?;
        Ok(read_dependencies(&content)?
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect())
    }
}

/// read the names of the DLLs this executable depends on
pub fn read_dependencies(content: &[u8]) -> Result<Vec<String>, ValidateError> {
    // prefer goblin since it seems to be less fragile
    match goblin::Object::parse(content) {
        Ok(goblin::Object::PE(pe)) => {
            return Ok(pe.libraries.iter().map(|i| i.to_string()).collect())
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("goblin could not parse PE file: {}", e),
    }

    let names: Vec<String> = match pelite::pe64::PeFile::from_bytes(content) {
        Ok(pefile) => pefile
            .imports()?
            .iter()
            .map(|desc| desc.dll_name())
            .collect::<Result<Vec<_>, pelite::Error>>()?
            .iter()
            .filter_map(|s| s.to_str().ok())
            .map(str::to_owned)
            .collect(),
        Err(pelite::Error::PeMagic) => pelite::pe32::PeFile::from_bytes(content)?
            .imports()?
            .iter()
            .map(|desc| desc.dll_name())
            .collect::<Result<Vec<_>, pelite::Error>>()?
            .iter()
            .filter_map(|s| s.to_str().ok())
            .map(str::to_owned)
            .collect(),
        Err(pelite::Error::BadMagic) => {
            return Err(ValidateError::WrongFileFormatError(
                "missing MZ signature".to_owned(),
            ))
        }
        Err(e) => return Err(ValidateError::PEError(e)),
    };
    Ok(names)
}

/// Runs `objdump -p` and scans its private headers dump
#[derive(Debug, Clone)]
pub struct ObjdumpInspector {
    program: String,
}

impl ObjdumpInspector {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
        }
    }
}

impl ImportInspector for ObjdumpInspector {
    fn imported_libraries(&self, path: &Path) -> Result<Vec<String>, ValidateError> {
        let output = Command::new(&self.program)
            .arg("-p")
            .arg(path)
            .output()
            .map_err(|source| ValidateError::ToolError {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ValidateError::ToolFailed {
                program: self.program.clone(),
                path: path.to_owned(),
                status: output.status,
            });
        }
        parse_objdump_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// extract the `DLL Name:` entries of the import tables section
pub fn parse_objdump_output(dump: &str) -> Result<Vec<String>, ValidateError> {
    let dll_name_re = Regex::new(r"DLL Name: (\S+)")?;
    Ok(dump
        .lines()
        .filter_map(|l| dll_name_re.captures(l))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect())
}
