//! Access to the distribution package database
//!
//! Queries are expensive (one subprocess each), and installed packages don't change during a run,
//! so every answer is cached per package name.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub trait PackageQuery {
    fn is_installed(&self, package: &str) -> bool;
    /// every path installed by `package`; empty if it can't be listed
    fn files(&self, package: &str) -> BTreeSet<PathBuf>;
}

/// Queries the RPM database through the `rpm` command line tool
#[derive(Debug, Clone)]
pub struct RpmDatabase {
    program: String,
}

impl RpmDatabase {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
        }
    }
}

impl PackageQuery for RpmDatabase {
    fn is_installed(&self, package: &str) -> bool {
        match Command::new(&self.program)
            .args(["-q", package])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("could not run {} -q {}: {}", self.program, package, e);
                false
            }
        }
    }

    fn files(&self, package: &str) -> BTreeSet<PathBuf> {
        let output = match Command::new(&self.program)
            .args(["-ql", package])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!("{} -ql {} exited with {}", self.program, package, output.status);
                return BTreeSet::new();
            }
            Err(e) => {
                warn!("could not run {} -ql {}: {}", self.program, package, e);
                return BTreeSet::new();
            }
        };
        parse_file_list(&String::from_utf8_lossy(&output.stdout))
    }
}

/// one absolute path per line, as printed by `rpm -ql`
pub fn parse_file_list(listing: &str) -> BTreeSet<PathBuf> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('/'))
        .map(PathBuf::from)
        .collect()
}

/// Write-once cache in front of a PackageQuery
pub struct PackageCache<'a> {
    query: &'a dyn PackageQuery,
    installed: HashMap<String, bool>,
    files: HashMap<String, BTreeSet<PathBuf>>,
}

impl<'a> PackageCache<'a> {
    pub fn new(query: &'a dyn PackageQuery) -> Self {
        Self {
            query,
            installed: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn is_installed(&mut self, package: &str) -> bool {
        if let Some(&installed) = self.installed.get(package) {
            return installed;
        }
        let installed = self.query.is_installed(package);
        debug!(package, installed, "queried package");
        self.installed.insert(package.to_owned(), installed);
        installed
    }

    pub fn files(&mut self, package: &str) -> &BTreeSet<PathBuf> {
        let query = self.query;
        self.files
            .entry(package.to_owned())
            .or_insert_with(|| query.files(package))
    }
}
