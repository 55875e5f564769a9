//! Choosing which annotation root receives a new external annotation.

use std::path::PathBuf;
use std::sync::Arc;

use crate::decl::{Declaration, OwnerId};
use crate::root::AnnotationRoot;
use crate::store::AnnotationStore;

/// Which roots exist for an owner, and how to add one. Implemented by [`AnnotationStore`];
/// hosts with their own project model can supply another implementation.
pub trait AnnotationRootIndex: Send + Sync {
    fn annotation_roots(&self, owner: &OwnerId) -> Vec<Arc<AnnotationRoot>>;

    fn register_annotation_root(&self, owner: &OwnerId, dir: PathBuf) -> Arc<AnnotationRoot>;
}

impl AnnotationRootIndex for AnnotationStore {
    fn annotation_roots(&self, owner: &OwnerId) -> Vec<Arc<AnnotationRoot>> {
        self.roots_for_owner(owner)
    }

    fn register_annotation_root(&self, owner: &OwnerId, dir: PathBuf) -> Arc<AnnotationRoot> {
        self.register_root(owner.clone(), dir, true)
    }
}

/// Host-provided UI for root selection.
pub trait RootChooser {
    /// Pick a directory for a brand-new root. `None` means the user cancelled.
    fn choose_new_root(&self, candidates: &[PathBuf]) -> Option<PathBuf>;

    /// Pick one of several existing roots. `None` means the user cancelled.
    fn choose_existing_root(
        &self,
        roots: &[Arc<AnnotationRoot>],
    ) -> Option<Arc<AnnotationRoot>>;
}

#[derive(Debug, Clone)]
pub enum RootChoice {
    Selected(Arc<AnnotationRoot>),
    NeedsUserChoice(Vec<Arc<AnnotationRoot>>),
    NeedsCreation,
}

#[derive(Debug, Clone)]
pub enum RootSelection {
    Root(Arc<AnnotationRoot>),
    /// The host's chooser was shown and dismissed.
    Cancelled,
    /// No writable root exists and none can be created without a chooser.
    CannotAnnotate,
}

pub struct RootSelector<'a> {
    index: &'a dyn AnnotationRootIndex,
}

impl<'a> RootSelector<'a> {
    pub fn new(index: &'a dyn AnnotationRootIndex) -> Self {
        Self { index }
    }

    /// Writable roots attached to the declaration's owner, in registration order.
    pub fn roots_for(&self, decl: &Declaration) -> Vec<Arc<AnnotationRoot>> {
        let Some(owner) = &decl.owner else {
            return Vec::new();
        };
        self.index
            .annotation_roots(owner)
            .into_iter()
            .filter(|root| root.is_writable())
            .collect()
    }

    pub fn choose_root(mut candidates: Vec<Arc<AnnotationRoot>>) -> RootChoice {
        match candidates.len() {
            0 => RootChoice::NeedsCreation,
            1 => RootChoice::Selected(candidates.remove(0)),
            _ => RootChoice::NeedsUserChoice(candidates),
        }
    }

    /// Runs the full policy for `decl`.
    ///
    /// Without a `host`, several candidates resolve to the first registered one and zero
    /// candidates resolve to [`RootSelection::CannotAnnotate`]. `suggested_dirs` are offered to
    /// the host when a new root has to be created. A chosen directory that is already registered
    /// read-only also resolves to [`RootSelection::CannotAnnotate`].
    pub fn select(
        &self,
        decl: &Declaration,
        host: Option<&dyn RootChooser>,
        suggested_dirs: &[PathBuf],
    ) -> RootSelection {
        let Some(owner) = &decl.owner else {
            return RootSelection::CannotAnnotate;
        };

        match Self::choose_root(self.roots_for(decl)) {
            RootChoice::Selected(root) => RootSelection::Root(root),
            RootChoice::NeedsUserChoice(roots) => match host {
                Some(host) => host
                    .choose_existing_root(&roots)
                    .map_or(RootSelection::Cancelled, RootSelection::Root),
                None => RootSelection::Root(roots[0].clone()),
            },
            RootChoice::NeedsCreation => {
                let Some(host) = host else {
                    return RootSelection::CannotAnnotate;
                };
                let Some(dir) = host.choose_new_root(suggested_dirs) else {
                    return RootSelection::Cancelled;
                };
                // Registering a directory that is already known returns the existing root.
                let root = self.index.register_annotation_root(owner, dir);
                if root.is_writable() {
                    RootSelection::Root(root)
                } else {
                    tracing::debug!(
                        target = "nova.annotations",
                        root = %root.id(),
                        dir = %root.dir().display(),
                        "chosen annotation root is read-only"
                    );
                    RootSelection::CannotAnnotate
                }
            }
        }
    }
}
