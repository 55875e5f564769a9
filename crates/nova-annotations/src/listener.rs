use crate::external_name::ExternalName;

/// Observer of external-annotation changes (gutter refresh, undo bookkeeping, ...).
///
/// Callbacks run on the mutating thread after the root's write lock has been released.
pub trait AnnotationsListener: Send + Sync {
    /// Called after every mutation attempt on the item `key`.
    fn after_annotation_changed(&self, key: &ExternalName, success: bool);

    /// Called after an `annotations.xml` changed outside of the store.
    fn external_annotations_changed(&self) {}
}
