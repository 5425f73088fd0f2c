//! Turning manifests into the declared dependency graph

use crate::arch::{Arch, ArchRules};
use crate::audit::{sidecar_path, IgnorePatterns};
use crate::common::{library_name, FileKind, ValidateError};
use crate::graph::{ComponentGroup, DependencyGraph, DllOwner, GroupId, ResolvedFile};
use crate::package::PackageCache;
use crate::report::{Problem, Report};
use crate::settings::Settings;
use crate::wxi::{ComponentDecl, ManifestSource};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Distribution package built from a manifest for one architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSlot {
    pub arch: Arch,
    pub name: String,
    pub installed: bool,
}

/// What the loader learned about one manifest file
#[derive(Debug, Clone)]
pub struct ManifestInfo {
    pub path: PathBuf,
    pub group: GroupId,
    pub packages: Vec<PackageSlot>,
    /// every resolved path the manifest declares, all architectures together
    pub declared: BTreeSet<PathBuf>,
    pub ignore: IgnorePatterns,
}

#[derive(Debug, Clone)]
enum LoadState {
    InProgress,
    Done(Option<GroupId>),
}

/// Package base name of a manifest: its file name without the .wxi extension
pub fn package_base_name(manifest: &Path) -> String {
    manifest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loads manifests and everything they require, once per path
pub struct Loader<'a, 'p> {
    settings: &'a Settings,
    source: &'a dyn ManifestSource,
    packages: &'a mut PackageCache<'p>,
    rules: ArchRules,
    states: HashMap<PathBuf, LoadState>,
    manifests: HashMap<PathBuf, ManifestInfo>,
    graph: DependencyGraph,
    report: Report,
}

impl<'a, 'p> Loader<'a, 'p> {
    pub fn new(
        settings: &'a Settings,
        source: &'a dyn ManifestSource,
        packages: &'a mut PackageCache<'p>,
    ) -> Result<Self, ValidateError> {
        Ok(Self {
            settings,
            source,
            packages,
            rules: ArchRules::standard()?,
            states: HashMap::new(),
            manifests: HashMap::new(),
            graph: DependencyGraph::new(),
            report: Report::new(),
        })
    }

    /// Load the manifest at `path`, after everything it requires
    ///
    /// Returns the id of its component group, or None if the manifest could not be used;
    /// the reason is recorded in the report. Loading the same path again returns the memoized
    /// result, and a path required while it is still being loaded is reported as a cycle.
    pub fn load(&mut self, path: &Path) -> Option<GroupId> {
        match self.states.get(path) {
            Some(LoadState::Done(group)) => return group.clone(),
            Some(LoadState::InProgress) => {
                self.report.push(
                    path,
                    Problem::RequireCycle {
                        manifest: path.to_owned(),
                    },
                );
                return None;
            }
            None => {}
        }

        self.states.insert(path.to_owned(), LoadState::InProgress);
        let group = self.load_uncached(path);
        self.states
            .insert(path.to_owned(), LoadState::Done(group.clone()));
        group
    }

    fn load_uncached(&mut self, path: &Path) -> Option<GroupId> {
        info!("loading {}", path.display());

        let base = package_base_name(path);
        let mut packages = Vec::new();
        for arch in Arch::ALL {
            let name = arch.package_name(&base);
            let installed = self.packages.is_installed(&name);
            if !installed {
                self.report
                    .push(path, Problem::MissingPackage { package: name.clone() });
            }
            packages.push(PackageSlot {
                arch,
                name,
                installed,
            });
        }

        let ignore =
            match IgnorePatterns::read_sidecar(path, &self.settings.ignore_extension) {
                Ok((patterns, invalid)) => {
                    for problem in invalid {
                        self.report.push(path, problem);
                    }
                    patterns
                }
                Err(e) => {
                    self.report.push(
                        path,
                        Problem::UnreadableIgnoreFile {
                            path: sidecar_path(path, &self.settings.ignore_extension),
                            reason: e.to_string(),
                        },
                    );
                    IgnorePatterns::default()
                }
            };

        // dependencies first, so their errors are reported before ours
        match self.source.requires(path) {
            Ok(required) => {
                for r in required {
                    self.load(&r);
                }
            }
            Err(e) => {
                self.report.push(
                    path,
                    Problem::ParseFailure {
                        reason: e.to_string(),
                    },
                );
                return None;
            }
        }

        let manifest = match self.source.parse(path) {
            Ok(m) => m,
            Err(e) => {
                self.report.push(
                    path,
                    Problem::ParseFailure {
                        reason: e.to_string(),
                    },
                );
                return None;
            }
        };

        let group_decl = match manifest.groups.as_slice() {
            [g] => g.clone(),
            [] => {
                self.report.push(path, Problem::MissingGroup);
                return None;
            }
            groups => {
                self.report.push(
                    path,
                    Problem::MultipleGroups {
                        count: groups.len(),
                    },
                );
                return None;
            }
        };
        let group_id = group_decl.id.clone();

        if let Some(previous) = self.graph.insert_group(ComponentGroup {
            id: group_decl.id,
            manifest: path.to_owned(),
            components: group_decl.components,
            groups: group_decl.groups,
        }) {
            warn!(
                "group {} of {} replaces the one declared in {}",
                group_id,
                path.display(),
                previous.manifest.display()
            );
        }

        let mut declared = BTreeSet::new();
        for component in &manifest.components {
            self.register_component(path, &group_id, component, &packages, &mut declared);
        }

        self.manifests.insert(
            path.to_owned(),
            ManifestInfo {
                path: path.to_owned(),
                group: group_id.clone(),
                packages,
                declared,
                ignore,
            },
        );
        Some(group_id)
    }

    fn register_component(
        &mut self,
        manifest: &Path,
        group: &str,
        component: &ComponentDecl,
        packages: &[PackageSlot],
        declared: &mut BTreeSet<PathBuf>,
    ) {
        self.graph.ensure_component(&component.id);

        for file in &component.files {
            // packages that aren't installed have nothing to check against
            for slot in packages.iter().filter(|s| s.installed) {
                let resolved = match self.rules.resolve(
                    &file.source,
                    slot.arch,
                    self.settings.sysroot(slot.arch),
                ) {
                    Some(r) => PathBuf::from(r),
                    None => continue,
                };
                if !resolved.exists() {
                    self.report.push(
                        manifest,
                        Problem::MissingFile {
                            path: resolved.clone(),
                        },
                    );
                }
                declared.insert(resolved.clone());
                let kind = FileKind::of(&resolved);
                self.graph.add_file(
                    &component.id,
                    ResolvedFile {
                        path: resolved,
                        arch: slot.arch,
                        kind,
                    },
                );
            }

            if FileKind::of(&file.source) != FileKind::Library {
                continue;
            }
            if let Some(library) = library_name(&file.source) {
                let owner = DllOwner {
                    component: component.id.clone(),
                    group: group.to_owned(),
                };
                if let Some(previous) = self.graph.register_dll(&library, owner) {
                    if previous.component != component.id {
                        self.report.push(
                            manifest,
                            Problem::DllConflict {
                                library,
                                previous: previous.component,
                                replacement: component.id.clone(),
                            },
                        );
                    }
                }
            }
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn manifest(&self, path: &Path) -> Option<&ManifestInfo> {
        self.manifests.get(path)
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Give up the loader, keeping the graph, the per-manifest data and the findings
    pub fn finish(self) -> (DependencyGraph, HashMap<PathBuf, ManifestInfo>, Report) {
        (self.graph, self.manifests, self.report)
    }
}
