//! Consistency checks for WiX include manifests of mingw cross-built packages
//!
//! Every `.wxi` manifest declares one ComponentGroup, the files it ships, and the groups it
//! references. Validation cross-checks this against the import tables of the shipped DLL/EXE
//! files and against the contents of the installed distribution packages.

extern crate thiserror;

mod runner;

pub mod arch;
pub mod audit;
pub mod builtin;
pub mod common;
pub mod graph;
pub mod loader;
pub mod package;
pub mod pe;
pub mod report;
pub mod settings;
pub mod validator;
pub mod wxi;

pub use common::{path_to_string, FileKind, ValidateError};
pub use report::{Diagnostic, Problem, Report, Severity};
pub use runner::Collaborators;
pub use settings::Settings;

use package::RpmDatabase;
use pe::{ImportInspector, ObjdumpInspector, PeInspector};
use std::path::PathBuf;
use wxi::WxiSource;

/// Validate the given manifests, with everything they require, and collect the findings
pub fn validate(
    settings: &Settings,
    collaborators: &Collaborators,
    manifests: &[PathBuf],
) -> Result<Report, ValidateError> {
    runner::Runner::new(settings, collaborators)?.run(manifests)
}

/// Validate against the real filesystem, package database and binaries
pub fn validate_installed(settings: &Settings, manifests: &[PathBuf]) -> Result<Report, ValidateError> {
    let packages = RpmDatabase::new(&settings.rpm);
    let inspector: Box<dyn ImportInspector> = match &settings.objdump {
        Some(program) => Box::new(ObjdumpInspector::new(program)),
        None => Box::new(PeInspector),
    };
    let collaborators = Collaborators {
        source: &WxiSource,
        packages: &packages,
        inspector: inspector.as_ref(),
    };
    validate(settings, &collaborators, manifests)
}
