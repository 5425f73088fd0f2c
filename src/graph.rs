//! Declared dependency graph: component groups, components and the DLL index

use crate::arch::Arch;
use crate::common::FileKind;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

pub type GroupId = String;
pub type ComponentId = String;

/// Components reachable from a root group; any DLL they provide may be imported
pub type AllowedSet = BTreeSet<ComponentId>;

/// The single `<ComponentGroup>` of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentGroup {
    pub id: GroupId,
    pub manifest: PathBuf,
    pub components: Vec<ComponentId>,
    pub groups: Vec<GroupId>,
}

/// A manifest file declaration resolved for one architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub arch: Arch,
    pub kind: FileKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub id: ComponentId,
    pub files: Vec<ResolvedFile>,
}

/// Who declares a given DLL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DllOwner {
    pub component: ComponentId,
    pub group: GroupId,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    groups: HashMap<GroupId, ComponentGroup>,
    // ids are global across manifests: a component declared twice accumulates files
    components: HashMap<ComponentId, Component>,
    // lowercase file name -> owner, last registration wins
    dlls: HashMap<String, DllOwner>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns the group previously registered under the same id, if any
    pub fn insert_group(&mut self, group: ComponentGroup) -> Option<ComponentGroup> {
        self.groups.insert(group.id.clone(), group)
    }

    pub fn group(&self, id: &str) -> Option<&ComponentGroup> {
        self.groups.get(id)
    }

    /// make sure the component exists, even if none of its files apply to any architecture
    pub fn ensure_component(&mut self, id: &str) -> &mut Component {
        self.components
            .entry(id.to_owned())
            .or_insert_with(|| Component {
                id: id.to_owned(),
                files: Vec::new(),
            })
    }

    pub fn add_file(&mut self, component: &str, file: ResolvedFile) {
        self.ensure_component(component).files.push(file);
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// index `library` (lowercase file name) as provided by `owner`
    ///
    /// Returns the owner it replaced, if any
    pub fn register_dll(&mut self, library: &str, owner: DllOwner) -> Option<DllOwner> {
        self.dlls.insert(library.to_owned(), owner)
    }

    pub fn dll_owner(&self, library: &str) -> Option<&DllOwner> {
        self.dlls.get(library)
    }

    /// Add to `allowed` every component reachable from `root` through group references
    ///
    /// An unknown group contributes nothing. A reference back to a group still being expanded
    /// is not followed; each such cycle is returned as the list of group ids along it, first
    /// id repeated at the end.
    pub fn expand(&self, root: &str, allowed: &mut AllowedSet) -> Vec<Vec<GroupId>> {
        let mut cycles = Vec::new();
        let mut on_path = Vec::new();
        let mut done = HashSet::new();
        self.expand_into(root, allowed, &mut on_path, &mut done, &mut cycles);
        cycles
    }

    fn expand_into<'g>(
        &'g self,
        id: &str,
        allowed: &mut AllowedSet,
        on_path: &mut Vec<&'g str>,
        done: &mut HashSet<&'g str>,
        cycles: &mut Vec<Vec<GroupId>>,
    ) {
        if let Some(start) = on_path.iter().position(|g| *g == id) {
            let mut cycle: Vec<GroupId> = on_path[start..].iter().map(|g| g.to_string()).collect();
            cycle.push(id.to_owned());
            cycles.push(cycle);
            return;
        }
        if done.contains(id) {
            return;
        }
        let group = match self.groups.get(id) {
            Some(g) => g,
            None => return,
        };

        allowed.extend(group.components.iter().cloned());

        on_path.push(group.id.as_str());
        for r in &group.groups {
            self.expand_into(r, allowed, on_path, done, cycles);
        }
        on_path.pop();
        done.insert(group.id.as_str());
    }
}
