use crate::audit::audit;
use crate::builtin::BuiltinLibraries;
use crate::common::ValidateError;
use crate::graph::{AllowedSet, GroupId};
use crate::loader::Loader;
use crate::package::{PackageCache, PackageQuery};
use crate::pe::ImportInspector;
use crate::report::{Problem, Report};
use crate::settings::Settings;
use crate::validator;
use crate::wxi::ManifestSource;
use std::path::PathBuf;
use tracing::info;

/// External systems a validation run talks to
pub struct Collaborators<'a> {
    pub source: &'a dyn ManifestSource,
    pub packages: &'a dyn PackageQuery,
    pub inspector: &'a dyn ImportInspector,
}

/// Validates a list of manifests, in three phases: load, check imports, audit packages
///
/// Problems of one manifest never stop the others from being checked; everything is
/// collected in a single report.
pub(crate) struct Runner<'a> {
    settings: &'a Settings,
    collaborators: &'a Collaborators<'a>,
    builtin: BuiltinLibraries,
}

impl<'a> Runner<'a> {
    pub(crate) fn new(
        settings: &'a Settings,
        collaborators: &'a Collaborators<'a>,
    ) -> Result<Self, ValidateError> {
        Ok(Self {
            settings,
            collaborators,
            builtin: BuiltinLibraries::new()?,
        })
    }

    pub(crate) fn run(&self, manifests: &[PathBuf]) -> Result<Report, ValidateError> {
        let mut packages = PackageCache::new(self.collaborators.packages);

        let mut loader = Loader::new(self.settings, self.collaborators.source, &mut packages)?;
        let roots: Vec<GroupId> = manifests.iter().filter_map(|m| loader.load(m)).collect();
        let (graph, infos, mut report) = loader.finish();
        info!(
            "loaded {} manifests, {} root groups",
            infos.len(),
            roots.len()
        );

        for root in &roots {
            let mut allowed = AllowedSet::new();
            let cycles = graph.expand(root, &mut allowed);
            if let Some(group) = graph.group(root) {
                for groups in cycles {
                    report.push(&group.manifest, Problem::GroupCycle { groups });
                }
            }
            validator::check(
                &graph,
                root,
                &allowed,
                &self.builtin,
                self.collaborators.inspector,
                &mut report,
            );
        }

        // only what was asked for, not the manifests pulled in by <?require?>
        for manifest in manifests {
            if let Some(info) = infos.get(manifest) {
                audit(info, &mut packages, &mut report);
            }
        }

        info!(
            "{} problems found, {} of them errors",
            report.diagnostics().len(),
            report.error_count()
        );
        Ok(report)
    }
}
