use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::decl::OwnerId;
use crate::xml::{PackageFile, ANNOTATIONS_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u32);

impl RootId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) enum PackageState {
    Missing,
    Parsed(PackageFile),
    Malformed,
}

impl PackageState {
    pub(crate) fn file(&self) -> Option<&PackageFile> {
        match self {
            PackageState::Parsed(file) => Some(file),
            PackageState::Missing | PackageState::Malformed => None,
        }
    }
}

/// A directory of per-package `annotations.xml` files attached to one owner (library, SDK or
/// module), plus a lazily populated in-memory index of the files read so far.
pub struct AnnotationRoot {
    id: RootId,
    owner: OwnerId,
    dir: PathBuf,
    writable: bool,
    /// Advanced whenever an index entry is replaced or dropped. Lazy loads that raced with such
    /// a change are not installed.
    generation: AtomicU64,
    packages: RwLock<HashMap<String, Arc<PackageState>>>,
    write_lock: Mutex<()>,
}

impl fmt::Debug for AnnotationRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationRoot")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("dir", &self.dir)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}

impl AnnotationRoot {
    pub(crate) fn new(id: RootId, owner: OwnerId, dir: PathBuf, writable: bool) -> Self {
        Self {
            id,
            owner,
            dir,
            writable,
            generation: AtomicU64::new(0),
            packages: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the host allows writing into this root. Bundled (SDK) roots are typically
    /// registered read-only.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Per-root modification count.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Location of the `annotations.xml` for `package` (`""` is the default package).
    ///
    /// Returns `None` for names that would escape the root directory.
    pub fn package_path(&self, package: &str) -> Option<PathBuf> {
        let mut path = self.dir.clone();
        if !package.is_empty() {
            for segment in package.split('.') {
                if !is_valid_segment(segment) {
                    return None;
                }
                path.push(segment);
            }
        }
        path.push(ANNOTATIONS_FILE_NAME);
        Some(path)
    }

    /// Inverse of [`AnnotationRoot::package_path`].
    pub fn package_for_path(&self, path: &Path) -> Option<String> {
        if path.file_name()? != ANNOTATIONS_FILE_NAME {
            return None;
        }
        let rel = path.parent()?.strip_prefix(&self.dir).ok()?;
        let segments = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("."))
    }

    pub(crate) fn load(&self, package: &str) -> Arc<PackageState> {
        if let Some(state) = self.packages.read().get(package) {
            return state.clone();
        }

        let generation = self.generation();
        let Some(path) = self.package_path(package) else {
            return Arc::new(PackageState::Missing);
        };

        let state = match std::fs::read_to_string(&path) {
            Ok(text) => match PackageFile::parse(&text) {
                Ok(file) => PackageState::Parsed(file),
                Err(err) => {
                    tracing::warn!(
                        target = "nova.annotations",
                        path = %path.display(),
                        error = %err,
                        "failed to parse external annotations; treating file as empty"
                    );
                    PackageState::Malformed
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => PackageState::Missing,
            Err(err) => {
                tracing::warn!(
                    target = "nova.annotations",
                    path = %path.display(),
                    error = %err,
                    "failed to read external annotations"
                );
                // Transient; don't remember the failure.
                return Arc::new(PackageState::Missing);
            }
        };

        let state = Arc::new(state);
        let mut packages = self.packages.write();
        if self.generation() != generation {
            return state;
        }
        packages
            .entry(package.to_string())
            .or_insert(state)
            .clone()
    }

    /// Replaces the index entry for `package` with freshly written contents.
    pub(crate) fn install(&self, package: &str, file: PackageFile) {
        let mut packages = self.packages.write();
        packages.insert(package.to_string(), Arc::new(PackageState::Parsed(file)));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn invalidate_package(&self, package: &str) {
        let mut packages = self.packages.write();
        packages.remove(package);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn invalidate_all(&self) {
        let mut packages = self.packages.write();
        packages.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Serializes writers to this root for the whole read-modify-write cycle.
    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock()
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_whitespace())
}
