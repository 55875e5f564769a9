use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::decl::{Declaration, OwnerId};
use crate::error::{AnnotationsError, Result};
use crate::external_name::{external_name, ExternalName};
use crate::listener::AnnotationsListener;
use crate::record::{AnnotationAttribute, AnnotationRecord};
use crate::root::{AnnotationRoot, RootId};
use crate::tracker::{ChangeReason, InvalidationTracker};
use crate::util::atomic_write;
use crate::xml::{self, PackageFile, ANNOTATIONS_FILE_NAME};

/// Bulk operation aborted through its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Result of a successful mutation.
///
/// `previous` holds what the mutation displaced (the replaced or removed records) so the caller
/// can undo it with the inverse mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub changed: bool,
    pub previous: Vec<AnnotationRecord>,
}

/// A package file discovered on disk (not parsed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFileRef {
    pub root: RootId,
    pub package: String,
    pub path: PathBuf,
}

enum Edit<'a> {
    Upsert(AnnotationRecord),
    Remove(&'a str),
    /// Upsert one record and drop others from the same item in a single write.
    Replace {
        record: AnnotationRecord,
        remove: &'a [&'a str],
    },
}

/// External-annotation storage over any number of registered roots.
pub struct AnnotationStore {
    tracker: Arc<InvalidationTracker>,
    roots: RwLock<Vec<Arc<AnnotationRoot>>>,
    next_root_id: AtomicU32,
    listeners: RwLock<Vec<Arc<dyn AnnotationsListener>>>,
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("roots", &*self.roots.read())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl AnnotationStore {
    pub fn new(tracker: Arc<InvalidationTracker>) -> Self {
        Self {
            tracker,
            roots: RwLock::new(Vec::new()),
            next_root_id: AtomicU32::new(0),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Builds a store and registers every root listed in configuration.
    pub fn from_config(
        tracker: Arc<InvalidationTracker>,
        config: &nova_config::ExternalAnnotationsConfig,
    ) -> Self {
        let store = Self::new(tracker);
        for root in &config.roots {
            store.register_root(
                OwnerId::new(root.owner.clone()),
                root.path.clone(),
                !root.read_only,
            );
        }
        store
    }

    pub fn tracker(&self) -> &Arc<InvalidationTracker> {
        &self.tracker
    }

    pub fn add_listener(&self, listener: Arc<dyn AnnotationsListener>) {
        self.listeners.write().push(listener);
    }

    /// Registers `dir` as an annotation root of `owner`. Registering the same directory twice
    /// for one owner returns the existing root.
    pub fn register_root(
        &self,
        owner: OwnerId,
        dir: impl Into<PathBuf>,
        writable: bool,
    ) -> Arc<AnnotationRoot> {
        let dir = dir.into();
        let mut roots = self.roots.write();
        if let Some(existing) = roots
            .iter()
            .find(|root| root.owner() == &owner && root.dir() == dir)
        {
            return existing.clone();
        }

        let id = RootId::from_raw(self.next_root_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            target = "nova.annotations",
            root = %id,
            owner = %owner,
            dir = %dir.display(),
            writable,
            "registered external annotation root"
        );
        let root = Arc::new(AnnotationRoot::new(id, owner, dir, writable));
        roots.push(root.clone());
        self.tracker.bump(ChangeReason::RootsChanged);
        root
    }

    pub fn unregister_root(&self, id: RootId) -> bool {
        let mut roots = self.roots.write();
        let before = roots.len();
        roots.retain(|root| root.id() != id);
        let removed = roots.len() != before;
        if removed {
            self.tracker.bump(ChangeReason::RootsChanged);
        }
        removed
    }

    pub fn root(&self, id: RootId) -> Option<Arc<AnnotationRoot>> {
        self.roots.read().iter().find(|r| r.id() == id).cloned()
    }

    /// Like [`AnnotationStore::root`], for callers holding an id across root changes.
    pub fn try_root(&self, id: RootId) -> Result<Arc<AnnotationRoot>> {
        self.root(id)
            .ok_or(AnnotationsError::UnknownRoot { root: id })
    }

    pub fn roots(&self) -> Vec<Arc<AnnotationRoot>> {
        self.roots.read().clone()
    }

    /// Roots attached to `owner`, in registration order.
    pub fn roots_for_owner(&self, owner: &OwnerId) -> Vec<Arc<AnnotationRoot>> {
        self.roots
            .read()
            .iter()
            .filter(|root| root.owner() == owner)
            .cloned()
            .collect()
    }

    pub fn roots_for(&self, decl: &Declaration) -> Vec<Arc<AnnotationRoot>> {
        match &decl.owner {
            Some(owner) => self.roots_for_owner(owner),
            None => Vec::new(),
        }
    }

    /// Module/library roots changed: drop every parsed file.
    pub fn on_roots_changed(&self) {
        for root in self.roots.read().iter() {
            root.invalidate_all();
        }
        self.tracker.bump(ChangeReason::RootsChanged);
    }

    /// An `annotations.xml` was changed by something other than this store.
    ///
    /// Returns whether `path` belongs to a registered root.
    pub fn on_external_file_changed(&self, path: &Path) -> bool {
        if path.file_name().map_or(true, |name| name != ANNOTATIONS_FILE_NAME) {
            return false;
        }

        let mut matched = false;
        for root in self.roots.read().iter() {
            if let Some(package) = root.package_for_path(path) {
                root.invalidate_package(&package);
                matched = true;
            }
        }
        if !matched {
            return false;
        }

        self.tracker.bump(ChangeReason::ExternalFileChanged);
        for listener in self.listeners.read().iter() {
            listener.external_annotations_changed();
        }
        true
    }

    /// Annotations recorded for `name` in `package` under `root`. Never fails; unreadable files
    /// read as empty.
    pub fn find(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
    ) -> Vec<AnnotationRecord> {
        root.load(package)
            .file()
            .and_then(|file| file.item(name.as_str()))
            .map(|item| item.annotations.clone())
            .unwrap_or_default()
    }

    pub fn upsert(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
        record: AnnotationRecord,
    ) -> Result<MutationOutcome> {
        self.mutate(root, package, name, Edit::Upsert(record))
    }

    pub fn remove(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
        qualified_name: &str,
    ) -> Result<MutationOutcome> {
        self.mutate(root, package, name, Edit::Remove(qualified_name))
    }

    /// Upserts `record` and removes every annotation in `remove` from the same item, in one
    /// write.
    pub fn replace(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
        record: AnnotationRecord,
        remove: &[&str],
    ) -> Result<MutationOutcome> {
        self.mutate(root, package, name, Edit::Replace { record, remove })
    }

    fn mutate(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
        edit: Edit<'_>,
    ) -> Result<MutationOutcome> {
        let result = {
            let _guard = root.lock_writes();
            self.mutate_locked(root, package, name, edit)
        };

        if let Err(err) = &result {
            tracing::warn!(
                target = "nova.annotations",
                root = %root.id(),
                item = %name,
                error = %err,
                "external annotation write failed"
            );
        }

        let success = result.is_ok();
        for listener in self.listeners.read().iter() {
            listener.after_annotation_changed(name, success);
        }
        result
    }

    fn mutate_locked(
        &self,
        root: &AnnotationRoot,
        package: &str,
        name: &ExternalName,
        edit: Edit<'_>,
    ) -> Result<MutationOutcome> {
        let path = root
            .package_path(package)
            .ok_or_else(|| AnnotationsError::InvalidPackage {
                package: package.to_string(),
            })?;
        if !root.is_writable() {
            return Err(AnnotationsError::ReadOnly {
                path: root.dir().to_path_buf(),
            });
        }

        let (mut file, existing) = read_for_write(&path)?;
        let before = file.clone();

        let mut outcome = MutationOutcome::default();
        match edit {
            Edit::Upsert(record) => outcome.previous.extend(file.upsert(name, record)),
            Edit::Remove(qualified_name) => {
                outcome.previous.extend(file.remove(name.as_str(), qualified_name))
            }
            Edit::Replace { record, remove } => {
                for qualified_name in remove {
                    if *qualified_name != record.qualified_name {
                        outcome
                            .previous
                            .extend(file.remove(name.as_str(), qualified_name));
                    }
                }
                outcome.previous.extend(file.upsert(name, record));
            }
        }

        if file == before {
            return Ok(outcome);
        }
        let text = file.to_xml();
        if existing.as_deref() == Some(text.as_str()) {
            return Ok(outcome);
        }

        atomic_write(&path, text.as_bytes()).map_err(|err| classify_write_error(&path, err))?;

        root.install(package, file);
        self.tracker.bump(ChangeReason::AnnotationWrite);
        outcome.changed = true;
        Ok(outcome)
    }

    /// External annotations for `decl` across all of its owner's roots. When several roots
    /// annotate the same type, the first registered root wins.
    pub fn find_for_declaration(&self, decl: &Declaration) -> Vec<AnnotationRecord> {
        let Some(name) = external_name(decl) else {
            return Vec::new();
        };
        let Some(package) = decl.kind.package() else {
            return Vec::new();
        };

        let mut out: Vec<AnnotationRecord> = Vec::new();
        for root in self.roots_for(decl) {
            for record in self.find(&root, package, &name) {
                if !out.iter().any(|r| r.qualified_name == record.qualified_name) {
                    out.push(record);
                }
            }
        }
        out
    }

    pub fn annotate(
        &self,
        root: &AnnotationRoot,
        decl: &Declaration,
        record: AnnotationRecord,
    ) -> Result<MutationOutcome> {
        let (package, name) = declaration_key(decl)?;
        self.upsert(root, package, &name, record)
    }

    /// Replaces the attributes of the `qualified_name` annotation on `decl` in `root`.
    pub fn edit(
        &self,
        root: &AnnotationRoot,
        decl: &Declaration,
        qualified_name: &str,
        attributes: Vec<AnnotationAttribute>,
    ) -> Result<MutationOutcome> {
        let record = AnnotationRecord {
            qualified_name: qualified_name.to_string(),
            attributes,
        };
        self.annotate(root, decl, record)
    }

    /// Removes `qualified_name` from `decl` in every writable root that has it.
    pub fn deannotate(
        &self,
        decl: &Declaration,
        qualified_name: &str,
    ) -> Result<MutationOutcome> {
        let (package, name) = declaration_key(decl)?;
        let mut outcome = MutationOutcome::default();
        for root in self.roots_for(decl) {
            if !root.is_writable() {
                continue;
            }
            let present = self
                .find(&root, package, &name)
                .iter()
                .any(|r| r.qualified_name == qualified_name);
            if !present {
                continue;
            }
            let removed = self.remove(&root, package, &name, qualified_name)?;
            outcome.changed |= removed.changed;
            outcome.previous.extend(removed.previous);
        }
        Ok(outcome)
    }

    /// Enumerates package files under `root` without parsing them.
    pub fn all_packages_under(
        &self,
        root: &AnnotationRoot,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<PackageFileRef>, Cancelled> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(root.dir())
            .follow_links(false)
            .sort_by_file_name()
        {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(
                        target = "nova.annotations",
                        root = %root.id(),
                        error = %err,
                        "skipping unreadable entry in annotation root"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(package) = root.package_for_path(entry.path()) {
                out.push(PackageFileRef {
                    root: root.id(),
                    package,
                    path: entry.into_path(),
                });
            }
        }
        Ok(out)
    }

    /// Package files under `root` whose text mentions `name`. Uses a plain text scan, so it may
    /// report files where the name only appears inside another item's key.
    pub fn find_item_files(
        &self,
        root: &AnnotationRoot,
        name: &ExternalName,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<PackageFileRef>, Cancelled> {
        let needle = format!("\"{}", xml::escape(name.as_str()));
        let mut out = Vec::new();
        for file in self.all_packages_under(root, cancel)? {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            match std::fs::read_to_string(&file.path) {
                Ok(text) if text.contains(&needle) => out.push(file),
                Ok(_) => {}
                Err(err) => tracing::debug!(
                    target = "nova.annotations",
                    path = %file.path.display(),
                    error = %err,
                    "failed to read annotations file during search"
                ),
            }
        }
        Ok(out)
    }
}

fn declaration_key(decl: &Declaration) -> Result<(&str, ExternalName)> {
    let name = external_name(decl).ok_or(AnnotationsError::NoExternalName)?;
    let package = decl.kind.package().ok_or(AnnotationsError::NoExternalName)?;
    Ok((package, name))
}

/// Reads the current on-disk contents for a read-modify-write cycle. Unlike lazy reads, a
/// malformed file is an error here: rewriting it would discard whatever it contained.
fn read_for_write(path: &Path) -> Result<(PackageFile, Option<String>)> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let readonly = std::fs::metadata(path)
                .map(|meta| meta.permissions().readonly())
                .unwrap_or(false);
            if readonly {
                return Err(AnnotationsError::ReadOnly {
                    path: path.to_path_buf(),
                });
            }
            let file = PackageFile::parse(&text).map_err(|err| AnnotationsError::Malformed {
                path: path.to_path_buf(),
                message: err.message,
            })?;
            Ok((file, Some(text)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok((PackageFile::new(), None)),
        Err(err) => Err(AnnotationsError::io(path, err)),
    }
}

fn classify_write_error(path: &Path, err: io::Error) -> AnnotationsError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        AnnotationsError::ReadOnly {
            path: path.to_path_buf(),
        }
    } else {
        AnnotationsError::io(path, err)
    }
}
