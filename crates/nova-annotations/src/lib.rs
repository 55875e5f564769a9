//! External annotations: annotations stored next to (not inside) the code they describe.
//!
//! Libraries and generated sources can't be edited, so Nova keeps annotations for them in
//! sidecar `annotations.xml` files, one per package, under one or more *annotation roots*
//! attached to the owning library/SDK/module.
//!
//! - [`external_name`] maps a [`Declaration`] to its canonical key.
//! - [`AnnotationStore`] reads (lazily, never failing) and writes (atomically, serialized per
//!   root) those files.
//! - [`RootSelector`] decides which root receives a new annotation.
//! - [`InvalidationTracker`] is advanced on every change so dependent caches can tell when they
//!   are stale.
//!
//! ## Concurrency
//!
//! Reads may run from any thread. Writers to one root are serialized by a per-root lock held for
//! the whole read-modify-write cycle; the tracker is advanced while that lock is still held so
//! a reader that observes the new stamp also observes the new file contents.

mod decl;
mod error;
mod external_name;
mod listener;
mod record;
mod root;
mod selector;
mod store;
mod tracker;
mod util;
mod xml;

pub use decl::{
    ClassRef, DeclId, Declaration, DeclarationKind, FileId, MethodRef, OwnerId, SourceRootId,
};
pub use error::{AnnotationsError, Result};
pub use external_name::{encode, erase, external_name, ExternalName};
pub use listener::AnnotationsListener;
pub use record::{constant_name, AnnotationAttribute, AnnotationRecord};
pub use root::{AnnotationRoot, RootId};
pub use selector::{AnnotationRootIndex, RootChoice, RootChooser, RootSelection, RootSelector};
pub use store::{AnnotationStore, Cancelled, MutationOutcome, PackageFileRef};
pub use tracker::{ChangeReason, InvalidationTracker, Stamp, Tracked};
pub use xml::{Item, PackageFile, XmlError, ANNOTATIONS_FILE_NAME};
