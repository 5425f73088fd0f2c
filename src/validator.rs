//! Cross-checking declared dependencies against real import tables

use crate::builtin::BuiltinLibraries;
use crate::graph::{AllowedSet, DependencyGraph};
use crate::pe::ImportInspector;
use crate::report::{Problem, Report};
use tracing::debug;

/// Check every DLL/EXE owned by a component that `root` lists directly
///
/// Each import must be a Windows builtin, or be declared by a component in `allowed`.
/// Components of referenced groups are only allowed, not checked: they are the deliverables
/// of their own root group.
pub fn check(
    graph: &DependencyGraph,
    root: &str,
    allowed: &AllowedSet,
    builtin: &BuiltinLibraries,
    inspector: &dyn ImportInspector,
    report: &mut Report,
) {
    let group = match graph.group(root) {
        Some(g) => g,
        None => return,
    };

    for component_id in &group.components {
        let component = match graph.component(component_id) {
            Some(c) => c,
            None => {
                report.push(
                    &group.manifest,
                    Problem::UnknownComponentRef {
                        group: group.id.clone(),
                        component: component_id.clone(),
                    },
                );
                continue;
            }
        };

        for file in component.files.iter().filter(|f| f.kind.is_binary()) {
            if !file.path.is_file() {
                report.push(
                    &file.path,
                    Problem::CannotAnalyseMissingFile {
                        path: file.path.clone(),
                    },
                );
                continue;
            }

            let imports = match inspector.imported_libraries(&file.path) {
                Ok(imports) => imports,
                Err(e) => {
                    report.push(
                        &file.path,
                        Problem::InspectionUnavailable {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };
            debug!("{} imports {:?}", file.path.display(), imports);

            for library in imports.iter().map(|s| s.to_lowercase()) {
                if builtin.contains(&library) {
                    continue;
                }
                match graph.dll_owner(&library) {
                    None => report.push(&file.path, Problem::UnknownComponent { library }),
                    Some(owner) if allowed.contains(&owner.component) => {}
                    Some(owner) => report.push(
                        &file.path,
                        Problem::MissingGroupReference {
                            group: owner.group.clone(),
                            library,
                        },
                    ),
                }
            }
        }
    }
}
