//! Reading WiX include (.wxi) manifests into plain declaration records

use crate::common::ValidateError;
use fs_err as fs;
use regex::Regex;
use std::path::{Path, PathBuf};

/// `<File Source="...">`, with the path variables still unexpanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDecl {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDecl {
    pub id: String,
    pub files: Vec<FileDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDecl {
    pub id: String,
    /// `<ComponentRef>` ids, in document order
    pub components: Vec<String>,
    /// `<ComponentGroupRef>` ids, in document order
    pub groups: Vec<String>,
}

/// Declarations found in one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub groups: Vec<GroupDecl>,
    pub components: Vec<ComponentDecl>,
}

/// Where manifests come from
pub trait ManifestSource {
    /// paths of the manifests required by the one at `path`, in declaration order
    fn requires(&self, path: &Path) -> Result<Vec<PathBuf>, ValidateError>;
    fn parse(&self, path: &Path) -> Result<Manifest, ValidateError>;
}

/// Reads .wxi files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct WxiSource;

impl ManifestSource for WxiSource {
    fn requires(&self, path: &Path) -> Result<Vec<PathBuf>, ValidateError> {
        let content = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(scan_requires(&content)?
            .into_iter()
            .map(|name| dir.join(name))
            .collect())
    }

    fn parse(&self, path: &Path) -> Result<Manifest, ValidateError> {
        let content = fs::read_to_string(path)?;
        parse_wxi(&content)
    }
}

/// Extract the targets of `<?require NAME?>` directives
///
/// This works on the raw text so dependencies can be loaded even if the markup is broken
pub fn scan_requires(content: &str) -> Result<Vec<String>, ValidateError> {
    let require_re = Regex::new(r"<\?require\s+(\S+?)\s*\?>")?;
    Ok(require_re
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .collect())
}

fn required_id(n: &roxmltree::Node) -> Result<String, ValidateError> {
    n.attribute("Id").map(str::to_owned).ok_or_else(|| {
        ValidateError::ManifestError(format!(
            "<{}> without Id attribute",
            n.tag_name().name()
        ))
    })
}

fn extract_group(n: &roxmltree::Node) -> Result<GroupDecl, ValidateError> {
    let mut ret = GroupDecl {
        id: required_id(n)?,
        components: Vec::new(),
        groups: Vec::new(),
    };
    for child in n.children().filter(|c| c.is_element()) {
        if child.has_tag_name("ComponentRef") {
            ret.components.push(required_id(&child)?);
        } else if child.has_tag_name("ComponentGroupRef") {
            ret.groups.push(required_id(&child)?);
        }
    }
    Ok(ret)
}

fn extract_component(n: &roxmltree::Node) -> Result<ComponentDecl, ValidateError> {
    Ok(ComponentDecl {
        id: required_id(n)?,
        files: n
            .children()
            .filter(|c| c.has_tag_name("File"))
            .filter_map(|c| c.attribute("Source"))
            .map(|s| FileDecl {
                source: s.to_owned(),
            })
            .collect(),
    })
}

/// Parse the markup of a .wxi file; tag names are matched regardless of XML namespace
pub fn parse_wxi(content: &str) -> Result<Manifest, ValidateError> {
    let doc = roxmltree::Document::parse(content)?;
    let groups = doc
        .descendants()
        .filter(|n| n.has_tag_name("ComponentGroup"))
        .map(|n| extract_group(&n))
        .collect::<Result<Vec<_>, ValidateError>>()?;
    let components = doc
        .descendants()
        .filter(|n| n.has_tag_name("Component"))
        .map(|n| extract_component(&n))
        .collect::<Result<Vec<_>, ValidateError>>()?;
    Ok(Manifest { groups, components })
}
