//! Findings of a validation run

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Every kind of inconsistency the validator can detect
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    // loading manifests
    #[error("Parsing failed: {reason}")]
    ParseFailure { reason: String },
    #[error("No ComponentGroup found")]
    MissingGroup,
    #[error("Expected exactly one ComponentGroup, found {count}")]
    MultipleGroups { count: usize },
    #[error("Require cycle: {} is required while it is still being loaded", .manifest.display())]
    RequireCycle { manifest: PathBuf },
    #[error("Cannot check, {package} not installed")]
    MissingPackage { package: String },
    #[error("Missing {}", .path.display())]
    MissingFile { path: PathBuf },
    #[error("Invalid ignore pattern {pattern}: {reason}")]
    InvalidIgnorePattern { pattern: String, reason: String },
    #[error("Cannot read ignore patterns from {}: {reason}", .path.display())]
    UnreadableIgnoreFile { path: PathBuf, reason: String },
    #[error("{library} declared by {replacement} overrides the declaration by {previous}")]
    DllConflict {
        library: String,
        previous: String,
        replacement: String,
    },

    // checking imports
    #[error("Referenced component {component} does not exist in {group}")]
    UnknownComponentRef { group: String, component: String },
    #[error("Group reference cycle: {}", .groups.join(" -> "))]
    GroupCycle { groups: Vec<String> },
    #[error("Cannot analyse missing file {}", .path.display())]
    CannotAnalyseMissingFile { path: PathBuf },
    #[error("Cannot inspect imports: {reason}")]
    InspectionUnavailable { reason: String },
    #[error("Unknown component for {library}")]
    UnknownComponent { library: String },
    #[error("Missing group reference {group} for {library}")]
    MissingGroupReference { group: String, library: String },

    // auditing packages
    #[error("{} in package {package} but not listed", .path.display())]
    UnlistedFile { path: PathBuf, package: String },
}

impl Problem {
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidIgnorePattern { .. }
            | Self::UnreadableIgnoreFile { .. }
            | Self::DllConflict { .. }
            | Self::InspectionUnavailable { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A problem, attached to the manifest or binary it was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub subject: PathBuf,
    pub severity: Severity,
    pub problem: Problem,
}

/// Ordered collection of everything found during a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<P: AsRef<Path>>(&mut self, subject: P, problem: Problem) {
        let severity = problem.severity();
        // the report itself is printed by write_to
        tracing::debug!("{}: {:?}: {}", subject.as_ref().display(), severity, problem);
        self.diagnostics.push(Diagnostic {
            subject: subject.as_ref().to_owned(),
            severity,
            problem,
        });
    }

    pub fn extend(&mut self, other: Report) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.diagnostics.iter().map(|d| &d.problem)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Print one header line per subject, followed by its problems
    ///
    /// Consecutive diagnostics about the same subject share the header.
    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        let mut current: Option<&Path> = None;
        for d in &self.diagnostics {
            if current != Some(d.subject.as_path()) {
                writeln!(w, " > {}", d.subject.display())?;
                current = Some(d.subject.as_path());
            }
            match d.severity {
                Severity::Error => writeln!(w, "     - {}", d.problem)?,
                Severity::Warning => writeln!(w, "     - warning: {}", d.problem)?,
            }
        }
        Ok(())
    }
}
