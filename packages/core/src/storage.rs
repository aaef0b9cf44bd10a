//! Persistent storage wiring
//!
//! Redirects backend data directories (model weights, generated outputs) onto
//! a persistent volume by replacing each directory with a symlink into the
//! volume. Data already present in a directory is moved into the volume
//! first, never deleted, and running the wiring again changes nothing.
//!
//! Storage is optional: a missing or read-only root turns the whole step into
//! a logged no-op, and per-directory failures are downgraded to warnings.

use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Suffix given to moved entries whose name already exists in storage
const PRESERVED_SUFFIX: &str = "preserved";

/// One directory redirect: `source` becomes a link to `<root>/<subdir>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub source: PathBuf,
    pub subdir: PathBuf,
}

/// Ordered set of directory redirects, at most one per source path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageMapping {
    entries: Vec<MappingEntry>,
}

impl StorageMapping {
    /// Build a mapping from `(source, subdir)` pairs
    ///
    /// If several pairs share a source path, the last one wins and keeps the
    /// position of the first occurrence.
    pub fn new<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, PathBuf)>,
    {
        let mut index_by_source: HashMap<PathBuf, usize> = HashMap::new();
        let mut entries: Vec<MappingEntry> = Vec::new();

        for (source, subdir) in pairs {
            match index_by_source.get(&source) {
                Some(&idx) => entries[idx].subdir = subdir,
                None => {
                    index_by_source.insert(source.clone(), entries.len());
                    entries.push(MappingEntry { source, subdir });
                }
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of looking for a usable storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelection {
    /// The explicitly configured root is usable
    Configured(PathBuf),
    /// A well-known candidate root was found
    Detected(PathBuf),
    /// No usable root; wiring is skipped
    Unavailable { reason: String },
}

impl RootSelection {
    pub fn root(&self) -> Option<&Path> {
        match self {
            RootSelection::Configured(path) | RootSelection::Detected(path) => Some(path),
            RootSelection::Unavailable { .. } => None,
        }
    }
}

/// Pick the storage root
///
/// An explicit root is used only if it is usable; candidates are not probed
/// as a fallback for a broken explicit setting. Without an explicit root the
/// first usable candidate wins. Nothing on disk is modified.
pub fn resolve_storage_root(configured: Option<&Path>, candidates: &[PathBuf]) -> RootSelection {
    if let Some(root) = configured {
        return match check_root(root).and_then(|()| absolute_root(root)) {
            Ok(root) => RootSelection::Configured(root),
            Err(reason) => RootSelection::Unavailable {
                reason: format!("configured root {}: {reason}", root.display()),
            },
        };
    }

    for candidate in candidates {
        match check_root(candidate).and_then(|()| absolute_root(candidate)) {
            Ok(root) => return RootSelection::Detected(root),
            Err(reason) => debug!("Storage candidate {} rejected: {}", candidate.display(), reason),
        }
    }

    RootSelection::Unavailable {
        reason: "no storage root configured or detected".to_string(),
    }
}

/// Link values are resolved against the link's own directory, so the root
/// written into them must not depend on the supervisor's cwd
fn absolute_root(root: &Path) -> Result<PathBuf, &'static str> {
    std::path::absolute(root).map_err(|_| "cannot be made absolute")
}

fn check_root(root: &Path) -> Result<(), &'static str> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {
            if is_writable(root) {
                Ok(())
            } else {
                Err("not writable")
            }
        }
        Ok(_) => Err("not a directory"),
        Err(_) => Err("does not exist"),
    }
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

/// What wiring did for one mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WireAction {
    /// Source did not exist or was an empty directory; link installed
    Linked,
    /// Source held data that was moved into storage before linking
    Migrated {
        entries: usize,
        /// Entries stored under a `.preserved` name to avoid overwriting
        renamed: Vec<String>,
    },
    /// Source was a link to somewhere else; only the link was replaced
    Relinked { previous: PathBuf },
    /// Source already links to the storage subdir
    AlreadyWired,
}

/// A mapping that could not be wired; the run continues without it
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}: {message}", path.display())]
pub struct StorageWireWarning {
    pub path: PathBuf,
    pub message: String,
}

/// A successfully wired mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WiredPath {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(flatten)]
    pub action: WireAction,
}

/// Result of the wiring step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageReport {
    /// Storage root in use, `None` when wiring was skipped
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
    pub wired: Vec<WiredPath>,
    pub warnings: Vec<StorageWireWarning>,
}

impl StorageReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// True when a root was found, even if some mappings failed
    pub fn is_wired(&self) -> bool {
        self.root.is_some()
    }

    /// True when a root was found and every mapping succeeded
    pub fn is_complete(&self) -> bool {
        self.is_wired() && self.warnings.is_empty()
    }

    /// Storage-side directory for a wired source, or the path itself
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.wired
            .iter()
            .find(|wired| wired.source == path)
            .map(|wired| wired.target.clone())
            .unwrap_or_else(|| path.to_path_buf())
    }
}

/// Wire every mapping onto the selected root
///
/// Never fails: an unavailable root skips the step without touching the
/// filesystem, and a failing mapping is reported as a warning.
pub fn wire_storage(selection: &RootSelection, mapping: &StorageMapping) -> StorageReport {
    let root = match selection {
        RootSelection::Configured(root) | RootSelection::Detected(root) => root,
        RootSelection::Unavailable { reason } => {
            info!("Storage wiring skipped: {}", reason);
            return StorageReport::skipped(reason.clone());
        }
    };

    info!("Wiring {} path(s) onto storage root {}", mapping.entries().len(), root.display());
    let mut report = StorageReport {
        root: Some(root.clone()),
        ..StorageReport::default()
    };

    for entry in mapping.entries() {
        if !is_relative_inside(&entry.subdir) {
            let warning = StorageWireWarning {
                path: entry.source.clone(),
                message: format!(
                    "subdir {} escapes the storage root",
                    entry.subdir.display()
                ),
            };
            warn!("Storage wiring skipped for {}", warning);
            report.warnings.push(warning);
            continue;
        }

        let target = root.join(&entry.subdir);
        match wire_path(&entry.source, &target) {
            Ok(action) => {
                log_action(&entry.source, &target, &action);
                report.wired.push(WiredPath {
                    source: entry.source.clone(),
                    target,
                    action,
                });
            }
            Err(e) => {
                let warning = StorageWireWarning {
                    path: entry.source.clone(),
                    message: e.to_string(),
                };
                warn!("Storage wiring failed, continuing without it: {}", warning);
                report.warnings.push(warning);
            }
        }
    }

    report
}

fn log_action(source: &Path, target: &Path, action: &WireAction) {
    match action {
        WireAction::Linked => info!("Linked {} -> {}", source.display(), target.display()),
        WireAction::Migrated { entries, renamed } => {
            info!(
                "Moved {} entr{} from {} into {} and linked",
                entries,
                if *entries == 1 { "y" } else { "ies" },
                source.display(),
                target.display()
            );
            for name in renamed {
                warn!("Kept existing storage entry; moved data stored as {}", name);
            }
        }
        WireAction::Relinked { previous } => warn!(
            "Replaced link {} -> {} with -> {}",
            source.display(),
            previous.display(),
            target.display()
        ),
        WireAction::AlreadyWired => debug!("{} already linked to {}", source.display(), target.display()),
    }
}

fn is_relative_inside(subdir: &Path) -> bool {
    subdir.components().any(|c| matches!(c, Component::Normal(_)))
        && subdir
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Wire a single source path to `target`
fn wire_path(source: &Path, target: &Path) -> io::Result<WireAction> {
    fs::create_dir_all(target)?;

    let meta = match fs::symlink_metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = source.parent() {
                fs::create_dir_all(parent)?;
            }
            make_link(target, source)?;
            return Ok(WireAction::Linked);
        }
        Err(e) => return Err(e),
    };

    if meta.file_type().is_symlink() {
        let previous = fs::read_link(source)?;
        if links_to(source, &previous, target) {
            return Ok(WireAction::AlreadyWired);
        }
        fs::remove_file(source)?;
        make_link(target, source)?;
        return Ok(WireAction::Relinked { previous });
    }

    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        ));
    }

    let (entries, renamed) = migrate_contents(source, target)?;
    fs::remove_dir(source)?;
    make_link(target, source)?;

    if entries == 0 {
        Ok(WireAction::Linked)
    } else {
        Ok(WireAction::Migrated { entries, renamed })
    }
}

fn links_to(source: &Path, link_value: &Path, target: &Path) -> bool {
    if target.is_absolute() && link_value == target {
        return true;
    }
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(resolved), Ok(expected)) => resolved == expected,
        _ => false,
    }
}

/// Move every entry of `source` into `target` without overwriting
fn migrate_contents(source: &Path, target: &Path) -> io::Result<(usize, Vec<String>)> {
    let mut moved = 0;
    let mut renamed = Vec::new();

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        let mut destination = target.join(&name);
        if exists_no_follow(&destination) {
            destination = preserved_destination(target, &name);
            renamed.push(
                destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }
        move_entry(&entry.path(), &destination)?;
        moved += 1;
    }

    Ok((moved, renamed))
}

fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// First free `<name>.preserved`, `<name>.preserved-2`, ... in `dir`
fn preserved_destination(dir: &Path, name: &std::ffi::OsStr) -> PathBuf {
    let mut counter = 1u32;
    loop {
        let mut candidate = OsString::from(name);
        if counter == 1 {
            candidate.push(format!(".{PRESERVED_SUFFIX}"));
        } else {
            candidate.push(format!(".{PRESERVED_SUFFIX}-{counter}"));
        }
        let path = dir.join(candidate);
        if !exists_no_follow(&path) {
            return path;
        }
        counter += 1;
    }
}

/// Rename, falling back to copy + remove when crossing filesystems
fn move_entry(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Copying {} across filesystems", from.display());
            copy_recursive(from, to)?;
            remove_recursive(from)
        }
        Err(e) => Err(e),
    }
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        make_link(&fs::read_link(from)?, to)
    } else if meta.is_dir() {
        fs::create_dir(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

fn remove_recursive(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Relative path -> file contents / link target / "<dir>"
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
        fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                let rel = path.strip_prefix(base).unwrap().to_path_buf();
                let meta = fs::symlink_metadata(&path).unwrap();
                if meta.file_type().is_symlink() {
                    let target = fs::read_link(&path).unwrap();
                    out.insert(rel, format!("-> {}", target.display()));
                } else if meta.is_dir() {
                    out.insert(rel, "<dir>".to_string());
                    walk(base, &path, out);
                } else {
                    out.insert(rel, fs::read_to_string(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(root, root, &mut out);
        out
    }

    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            fs::create_dir_all(tmp.path().join("volume")).unwrap();
            fs::create_dir_all(tmp.path().join("app")).unwrap();
            Self { tmp }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.tmp.path().join(rel)
        }

        fn selection(&self) -> RootSelection {
            resolve_storage_root(Some(&self.path("volume")), &[])
        }

        fn mapping(&self, pairs: &[(&str, &str)]) -> StorageMapping {
            StorageMapping::new(
                pairs
                    .iter()
                    .map(|(src, sub)| (self.path(src), PathBuf::from(sub))),
            )
        }
    }

    #[test]
    fn migrates_existing_files_and_links_source() {
        let fx = Fixture::new();
        let output = fx.path("app/output");
        fs::create_dir_all(&output).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(output.join(name), name).unwrap();
        }

        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "output")]));

        assert!(report.is_complete());
        let target = fx.path("volume/output");
        assert_eq!(
            report.wired[0].action,
            WireAction::Migrated {
                entries: 3,
                renamed: Vec::new()
            }
        );
        assert!(fs::symlink_metadata(&output).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&output).unwrap(), target);
        for name in ["a.png", "b.png", "c.png"] {
            assert_eq!(fs::read_to_string(target.join(name)).unwrap(), name);
            assert_eq!(fs::read_to_string(output.join(name)).unwrap(), name);
        }
    }

    #[test]
    fn wiring_twice_matches_wiring_once() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("app/models/checkpoints")).unwrap();
        fs::write(fx.path("app/models/checkpoints/sd.safetensors"), "weights").unwrap();
        let mapping = fx.mapping(&[
            ("app/models", "models"),
            ("app/output", "output"),
            ("app/input", "input"),
        ]);

        let first = wire_storage(&fx.selection(), &mapping);
        let after_first = snapshot(fx.tmp.path());
        let second = wire_storage(&fx.selection(), &mapping);
        let after_second = snapshot(fx.tmp.path());

        assert!(first.is_complete());
        assert!(second.is_complete());
        assert_eq!(after_first, after_second);
        assert!(
            second
                .wired
                .iter()
                .all(|w| w.action == WireAction::AlreadyWired)
        );
    }

    #[test]
    fn name_conflicts_keep_both_copies() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("volume/output")).unwrap();
        fs::write(fx.path("volume/output/img.png"), "stored").unwrap();
        fs::create_dir_all(fx.path("app/output")).unwrap();
        fs::write(fx.path("app/output/img.png"), "local").unwrap();
        fs::write(fx.path("app/output/other.png"), "other").unwrap();

        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "output")]));

        assert_eq!(
            report.wired[0].action,
            WireAction::Migrated {
                entries: 2,
                renamed: vec!["img.png.preserved".to_string()]
            }
        );
        let output = fx.path("app/output");
        assert_eq!(fs::read_to_string(output.join("img.png")).unwrap(), "stored");
        assert_eq!(
            fs::read_to_string(output.join("img.png.preserved")).unwrap(),
            "local"
        );
        assert_eq!(fs::read_to_string(output.join("other.png")).unwrap(), "other");
    }

    #[test]
    fn preserved_names_count_up() {
        let fx = Fixture::new();
        let dir = fx.path("volume");
        fs::write(dir.join("x.preserved"), "").unwrap();
        assert_eq!(
            preserved_destination(&dir, std::ffi::OsStr::new("x")),
            dir.join("x.preserved-2")
        );
    }

    #[test]
    fn missing_root_performs_no_mutations() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("app/output")).unwrap();
        fs::write(fx.path("app/output/keep.png"), "data").unwrap();
        let before = snapshot(fx.tmp.path());

        let selection = resolve_storage_root(None, &[fx.path("runpod-volume")]);
        assert!(matches!(selection, RootSelection::Unavailable { .. }));
        let report = wire_storage(&selection, &fx.mapping(&[("app/output", "output")]));

        assert!(!report.is_wired());
        assert!(report.skipped_reason.is_some());
        assert!(report.wired.is_empty());
        assert_eq!(before, snapshot(fx.tmp.path()));
    }

    #[test]
    fn detected_candidate_is_used_when_no_root_configured() {
        let fx = Fixture::new();
        let selection = resolve_storage_root(None, &[fx.path("absent"), fx.path("volume")]);
        assert_eq!(selection, RootSelection::Detected(fx.path("volume")));
    }

    #[test]
    fn broken_configured_root_does_not_fall_back() {
        let fx = Fixture::new();
        let selection = resolve_storage_root(Some(&fx.path("absent")), &[fx.path("volume")]);
        match selection {
            RootSelection::Unavailable { reason } => assert!(reason.contains("does not exist")),
            other => panic!("unexpected selection: {other:?}"),
        }

        fs::write(fx.path("file-root"), "").unwrap();
        let selection = resolve_storage_root(Some(&fx.path("file-root")), &[]);
        assert!(selection.root().is_none());
    }

    #[test]
    fn relative_root_is_linked_by_absolute_path() {
        let cwd = std::env::current_dir().unwrap();
        let tmp = tempfile::tempdir_in(&cwd).unwrap();
        fs::create_dir_all(tmp.path().join("volume")).unwrap();
        fs::create_dir_all(tmp.path().join("app/output")).unwrap();
        fs::write(tmp.path().join("app/output/a.png"), "png").unwrap();
        let relative_root = tmp.path().strip_prefix(&cwd).unwrap().join("volume");
        assert!(relative_root.is_relative());

        let selection = resolve_storage_root(Some(&relative_root), &[]);
        let root = selection.root().unwrap().to_path_buf();
        assert!(root.is_absolute());

        let source = tmp.path().join("app/output");
        let mapping = StorageMapping::new([(source.clone(), PathBuf::from("output"))]);
        let report = wire_storage(&selection, &mapping);
        assert!(report.is_complete());
        assert_eq!(fs::read_link(&source).unwrap(), root.join("output"));
        assert_eq!(fs::read_to_string(source.join("a.png")).unwrap(), "png");
        assert_eq!(report.resolve(&source), root.join("output"));

        let again = wire_storage(&selection, &mapping);
        assert_eq!(again.wired[0].action, WireAction::AlreadyWired);
    }

    #[test]
    fn broken_relative_link_is_repaired() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("volume/output")).unwrap();
        fs::write(fx.path("volume/output/a.png"), "png").unwrap();
        std::os::unix::fs::symlink("volume/output", fx.path("app/output")).unwrap();

        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "output")]));

        assert!(matches!(report.wired[0].action, WireAction::Relinked { .. }));
        assert_eq!(fs::read_to_string(fx.path("app/output/a.png")).unwrap(), "png");
    }

    #[test]
    fn missing_source_gets_linked_with_parents() {
        let fx = Fixture::new();
        let report = wire_storage(
            &fx.selection(),
            &fx.mapping(&[("app/nested/models", "models")]),
        );
        assert_eq!(report.wired[0].action, WireAction::Linked);
        assert_eq!(
            fs::read_link(fx.path("app/nested/models")).unwrap(),
            fx.path("volume/models")
        );
    }

    #[test]
    fn stale_link_is_replaced_without_touching_its_data() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("old-volume/output")).unwrap();
        fs::write(fx.path("old-volume/output/keep.png"), "old").unwrap();
        std::os::unix::fs::symlink(fx.path("old-volume/output"), fx.path("app/output")).unwrap();

        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "output")]));

        assert_eq!(
            report.wired[0].action,
            WireAction::Relinked {
                previous: fx.path("old-volume/output")
            }
        );
        assert_eq!(
            fs::read_link(fx.path("app/output")).unwrap(),
            fx.path("volume/output")
        );
        assert_eq!(
            fs::read_to_string(fx.path("old-volume/output/keep.png")).unwrap(),
            "old"
        );
    }

    #[test]
    fn regular_file_at_source_becomes_a_warning() {
        let fx = Fixture::new();
        fs::write(fx.path("app/output"), "not a dir").unwrap();

        let report = wire_storage(
            &fx.selection(),
            &fx.mapping(&[("app/output", "output"), ("app/models", "models")]),
        );

        assert!(report.is_wired());
        assert!(!report.is_complete());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, fx.path("app/output"));
        assert_eq!(report.wired.len(), 1);
        assert_eq!(
            fs::read_to_string(fx.path("app/output")).unwrap(),
            "not a dir"
        );
    }

    #[test]
    fn escaping_subdir_is_rejected() {
        let fx = Fixture::new();
        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "../escape")]));
        assert_eq!(report.warnings.len(), 1);
        assert!(!fx.path("escape").exists());
    }

    #[test]
    fn duplicate_sources_keep_last_subdir() {
        let mapping = StorageMapping::new([
            (PathBuf::from("/app/output"), PathBuf::from("output")),
            (PathBuf::from("/app/models"), PathBuf::from("models")),
            (PathBuf::from("/app/output"), PathBuf::from("renders")),
        ]);
        assert_eq!(mapping.entries().len(), 2);
        assert_eq!(mapping.entries()[0].source, PathBuf::from("/app/output"));
        assert_eq!(mapping.entries()[0].subdir, PathBuf::from("renders"));
    }

    #[test]
    fn report_resolves_wired_paths() {
        let fx = Fixture::new();
        let report = wire_storage(&fx.selection(), &fx.mapping(&[("app/output", "output")]));
        assert_eq!(report.resolve(&fx.path("app/output")), fx.path("volume/output"));
        assert_eq!(report.resolve(&fx.path("app/input")), fx.path("app/input"));
    }
}
