//! Modification counting for cache validity.
//!
//! Every cached value derived from annotations or from the program model is stamped with the
//! [`InvalidationTracker`] value it was computed under. A value whose stamp differs from the
//! current one is stale and must not be served.

use std::sync::atomic::{AtomicU64, Ordering};

/// Why the tracker advanced. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// A write to an `annotations.xml` through the store.
    AnnotationWrite,
    /// `annotations.xml` changed outside of the store.
    ExternalFileChanged,
    /// Annotation roots were registered, removed or reconfigured.
    RootsChanged,
    /// The program model changed structurally.
    StructureChanged,
    /// Recognized annotation names changed.
    ConfigurationChanged,
}

/// Counter value observed at some point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp(u64);

impl Stamp {
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

/// Monotonic counter shared by the store and every cache that depends on it.
#[derive(Debug, Default)]
pub struct InvalidationTracker {
    count: AtomicU64,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value. Read this *before* computing anything you intend to cache.
    pub fn stamp(&self) -> Stamp {
        Stamp(self.count.load(Ordering::Acquire))
    }

    /// Advances the counter and returns the new value.
    pub fn bump(&self, reason: ChangeReason) -> Stamp {
        let next = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(
            target = "nova.annotations",
            ?reason,
            stamp = next,
            "invalidation tracker advanced"
        );
        Stamp(next)
    }

    pub fn is_current(&self, stamp: Stamp) -> bool {
        self.stamp() == stamp
    }
}

/// A value tagged with the stamp it was computed under.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    pub value: T,
    pub stamp: Stamp,
}

impl<T> Tracked<T> {
    pub fn new(value: T, stamp: Stamp) -> Self {
        Self { value, stamp }
    }

    /// Returns the value if it is still valid under `tracker`.
    pub fn get_if_fresh(&self, tracker: &InvalidationTracker) -> Option<&T> {
        tracker.is_current(self.stamp).then_some(&self.value)
    }
}
