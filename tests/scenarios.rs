use fs_err as fs;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use wxi_validate::package::PackageQuery;
use wxi_validate::pe::ImportInspector;
use wxi_validate::wxi::WxiSource;
use wxi_validate::{validate, Collaborators, Problem, Report, Settings, ValidateError};

/// Installed packages, with the files each of them ships
#[derive(Default)]
struct Packages(HashMap<String, BTreeSet<PathBuf>>);

impl PackageQuery for Packages {
    fn is_installed(&self, package: &str) -> bool {
        self.0.contains_key(package)
    }

    fn files(&self, package: &str) -> BTreeSet<PathBuf> {
        self.0.get(package).cloned().unwrap_or_default()
    }
}

/// Import tables keyed by file name, the same for both architectures
#[derive(Default)]
struct Imports(HashMap<String, Vec<String>>);

impl ImportInspector for Imports {
    fn imported_libraries(&self, path: &Path) -> Result<Vec<String>, ValidateError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.0.get(&name).cloned().unwrap_or_default())
    }
}

struct Sandbox {
    dir: tempfile::TempDir,
    settings: Settings,
    packages: Packages,
    imports: Imports,
}

impl Sandbox {
    fn new() -> Result<Self, ValidateError> {
        let dir = tempfile::tempdir()?;
        let settings = Settings {
            sysroot32: dir.path().join("sysroot32"),
            sysroot64: dir.path().join("sysroot64"),
            ..Settings::default()
        };
        Ok(Self {
            dir,
            settings,
            packages: Packages::default(),
            imports: Imports::default(),
        })
    }

    fn manifest(&self, name: &str, content: &str) -> Result<PathBuf, ValidateError> {
        let path = self.dir.path().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// put `relative` into both sysroots, and into the package of `base` for each architecture
    fn ship(&mut self, base: &str, relative: &str) -> Result<(), ValidateError> {
        for (prefix, sysroot) in [
            ("mingw32", self.settings.sysroot32.clone()),
            ("mingw64", self.settings.sysroot64.clone()),
        ] {
            let path = sysroot.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, b"")?;
            self.packages
                .0
                .entry(format!("{prefix}-{base}"))
                .or_default()
                .insert(path);
        }
        Ok(())
    }

    fn install(&mut self, base: &str) {
        for prefix in ["mingw32", "mingw64"] {
            self.packages.0.entry(format!("{prefix}-{base}")).or_default();
        }
    }

    fn imports(&mut self, file: &str, libraries: &[&str]) {
        self.imports.0.insert(
            file.to_owned(),
            libraries.iter().map(|s| s.to_string()).collect(),
        );
    }

    fn run(&self, manifests: &[PathBuf]) -> Result<Report, ValidateError> {
        let collaborators = Collaborators {
            source: &WxiSource,
            packages: &self.packages,
            inspector: &self.imports,
        };
        validate(&self.settings, &collaborators, manifests)
    }
}

fn wxi(requires: &[&str], group: &str, groups: &[&str], components: &[(&str, &str)]) -> String {
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    s.push_str("<Include xmlns=\"http://schemas.microsoft.com/wix/2006/wi\">\n");
    for r in requires {
        s.push_str(&format!("  <?require {r}?>\n"));
    }
    s.push_str("  <Fragment>\n    <DirectoryRef Id=\"INSTALLDIR\">\n");
    for (id, source) in components {
        s.push_str(&format!(
            "      <Component Id=\"{id}\" Guid=\"*\">\n        <File Id=\"fil{id}\" Source=\"{source}\"/>\n      </Component>\n"
        ));
    }
    s.push_str("    </DirectoryRef>\n  </Fragment>\n  <Fragment>\n");
    s.push_str(&format!("    <ComponentGroup Id=\"{group}\">\n"));
    for g in groups {
        s.push_str(&format!("      <ComponentGroupRef Id=\"{g}\"/>\n"));
    }
    for (id, _) in components {
        s.push_str(&format!("      <ComponentRef Id=\"{id}\"/>\n"));
    }
    s.push_str("    </ComponentGroup>\n  </Fragment>\n</Include>\n");
    s
}

fn messages(report: &Report) -> Vec<String> {
    report.problems().map(|p| p.to_string()).collect()
}

#[test]
fn declared_and_present_file_is_clean() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.ship("foo", "bin/foo.dll")?;
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&[], "CG.foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.dll")]),
    )?;

    let report = sandbox.run(&[foo])?;
    assert_eq!(messages(&report), Vec::<String>::new());
    assert!(!report.has_errors());
    Ok(())
}

#[test]
fn absent_file_is_reported_missing() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.install("foo");
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&[], "CG.foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.dll")]),
    )?;

    let report = sandbox.run(&[foo])?;
    assert!(report.has_errors());
    let missing = sandbox.settings.sysroot32.join("bin/foo.dll");
    assert!(messages(&report).contains(&format!("Missing {}", missing.display())));
    Ok(())
}

#[test]
fn unreferenced_group_is_a_missing_group_reference() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.ship("bar", "bin/bar.dll")?;
    sandbox.ship("foo", "bin/foo.exe")?;
    sandbox.imports("foo.exe", &["bar.dll"]);
    let bar = sandbox.manifest(
        "bar.wxi",
        &wxi(&[], "Bar", &[], &[("cmpbar", "$(var.SourceDir)/bin/bar.dll")]),
    )?;
    // required, so bar.dll is known, but the group is never referenced
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&["bar.wxi"], "Foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.exe")]),
    )?;

    let report = sandbox.run(&[foo.clone()])?;
    assert!(report.has_errors());
    let msgs = messages(&report);
    assert_eq!(
        msgs.iter()
            .filter(|m| *m == "Missing group reference Bar for bar.dll")
            .count(),
        2,
        "one per architecture: {msgs:?}"
    );

    // referencing the group fixes it
    sandbox.manifest(
        "foo.wxi",
        &wxi(&["bar.wxi"], "Foo", &["Bar"], &[("cmpfoo", "$(var.SourceDir)/bin/foo.exe")]),
    )?;
    let report = sandbox.run(&[foo, bar])?;
    assert_eq!(messages(&report), Vec::<String>::new());
    Ok(())
}

#[test]
fn system_libraries_are_never_reported() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.ship("foo", "bin/foo.exe")?;
    sandbox.imports("foo.exe", &["KERNEL32.dll", "msvcrt.dll", "WINSPOOL.DRV"]);
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&[], "CG.foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.exe")]),
    )?;

    let report = sandbox.run(&[foo])?;
    assert!(!report.has_errors());
    Ok(())
}

#[test]
fn unlisted_file_is_reported_until_ignored() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.ship("foo", "bin/foo.dll")?;
    sandbox.ship("foo", "bin/extra.dll")?;
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&[], "CG.foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.dll")]),
    )?;

    let report = sandbox.run(&[foo.clone()])?;
    let unlisted: Vec<&Problem> = report
        .problems()
        .filter(|p| matches!(p, Problem::UnlistedFile { .. }))
        .collect();
    assert_eq!(unlisted.len(), 2);
    assert!(report.has_errors());
    assert!(messages(&report).contains(&format!(
        "{} in package mingw64-foo but not listed",
        sandbox.settings.sysroot64.join("bin/extra.dll").display()
    )));

    fs::write(sandbox.dir.path().join("foo.ignore"), "# not shipped\n/bin/extra\\.dll$\n")?;
    let report = sandbox.run(&[foo])?;
    assert!(!report.has_errors(), "{:?}", messages(&report));
    Ok(())
}

#[test]
fn missing_package_and_parse_failure_are_distinguishable() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.ship("foo", "bin/foo.dll")?;
    let broken = sandbox.manifest("broken.wxi", "<Include>\n  <Fragment>\n")?;
    let foo = sandbox.manifest(
        "foo.wxi",
        &wxi(&[], "CG.foo", &[], &[("cmpfoo", "$(var.SourceDir)/bin/foo.dll")]),
    )?;

    let report = sandbox.run(&[broken, foo])?;
    let msgs = messages(&report);
    assert!(msgs.contains(&"Cannot check, mingw32-broken not installed".to_owned()));
    assert!(msgs.iter().any(|m| m.starts_with("Parsing failed: ")));
    // the good manifest is still validated
    assert!(report
        .diagnostics()
        .iter()
        .all(|d| !d.subject.ends_with("foo.wxi")));
    Ok(())
}

#[test]
fn group_cycle_is_reported_once() -> Result<(), ValidateError> {
    let mut sandbox = Sandbox::new()?;
    sandbox.install("a");
    sandbox.install("b");
    let a = sandbox.manifest("a.wxi", &wxi(&["b.wxi"], "A", &["B"], &[]))?;
    sandbox.manifest("b.wxi", &wxi(&[], "B", &["A"], &[]))?;

    let report = sandbox.run(&[a])?;
    let cycles: Vec<&Problem> = report
        .problems()
        .filter(|p| matches!(p, Problem::GroupCycle { .. }))
        .collect();
    assert_eq!(cycles.len(), 1);
    Ok(())
}
