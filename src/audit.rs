//! Finding files shipped by a package that its manifest forgot to list

use crate::common::{path_to_string, FileKind, ValidateError};
use crate::loader::ManifestInfo;
use crate::package::PackageCache;
use crate::report::{Problem, Report};
use fs_err as fs;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Paths a manifest intentionally leaves out, one regular expression per line of its sidecar file
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Regex>,
}

impl IgnorePatterns {
    /// blank lines and lines starting with `#` are skipped; invalid expressions are returned
    /// as problems instead of failing the whole file
    pub fn parse(content: &str) -> (Self, Vec<Problem>) {
        let mut patterns = Vec::new();
        let mut invalid = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Regex::new(line) {
                Ok(re) => patterns.push(re),
                Err(e) => invalid.push(Problem::InvalidIgnorePattern {
                    pattern: line.to_owned(),
                    reason: e.to_string(),
                }),
            }
        }
        (Self { patterns }, invalid)
    }

    /// the sidecar of `foo.wxi` is `foo.<extension>`; a missing sidecar ignores nothing
    pub fn read_sidecar(
        manifest: &Path,
        extension: &str,
    ) -> Result<(Self, Vec<Problem>), ValidateError> {
        let sidecar = sidecar_path(manifest, extension);
        if !sidecar.exists() {
            return Ok((Self::default(), Vec::new()));
        }
        Ok(Self::parse(&fs::read_to_string(&sidecar)?))
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

pub fn sidecar_path(manifest: &Path, extension: &str) -> PathBuf {
    manifest.with_extension(extension)
}

/// Report every DLL/EXE of the manifest's installed packages that it neither declares nor ignores
pub fn audit(manifest: &ManifestInfo, packages: &mut PackageCache, report: &mut Report) {
    for slot in manifest.packages.iter().filter(|s| s.installed) {
        let unlisted: Vec<PathBuf> = packages
            .files(&slot.name)
            .iter()
            .filter(|f| FileKind::of(f).is_binary())
            .filter(|f| !manifest.declared.contains(*f))
            .filter(|f| !manifest.ignore.is_ignored(&path_to_string(f)))
            .cloned()
            .collect();
        tracing::debug!(
            package = slot.name.as_str(),
            unlisted = unlisted.len(),
            "audited package"
        );
        for path in unlisted {
            report.push(
                &manifest.path,
                Problem::UnlistedFile {
                    path,
                    package: slot.name.clone(),
                },
            );
        }
    }
}
