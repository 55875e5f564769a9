use std::collections::HashMap;

use nova_annotations::{
    DeclId, Declaration, FileId, InvalidationTracker, OwnerId, SourceRootId, Stamp,
};
use parking_lot::{Mutex, RwLock};

use crate::element::ElementKinds;
use crate::verdict::NullabilityVerdict;

/// What [`crate::NullabilityEngine::invalidate`] evicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    Everything,
    Declaration(DeclId),
    File(FileId),
    SourceRoot(SourceRootId),
    /// Every declaration owned by a library/SDK/module.
    Owner(OwnerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    decl: DeclId,
    kinds: ElementKinds,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: NullabilityVerdict,
    stamp: Stamp,
    file: Option<FileId>,
    source_root: Option<SourceRootId>,
    owner: Option<OwnerId>,
}

impl CacheEntry {
    fn in_scope(&self, decl: DeclId, scope: &InvalidationScope) -> bool {
        match scope {
            InvalidationScope::Everything => true,
            InvalidationScope::Declaration(id) => decl == *id,
            InvalidationScope::File(file) => self.file == Some(*file),
            InvalidationScope::SourceRoot(root) => self.source_root == Some(*root),
            InvalidationScope::Owner(owner) => self.owner.as_ref() == Some(owner),
        }
    }
}

/// Resolution results keyed by declaration and element kinds, each stamped with the tracker
/// value it was computed under.
///
/// Concurrent misses for one key may both compute; the last insert wins, and both values are
/// equal because resolution is deterministic.
#[derive(Debug, Default)]
pub(crate) struct ResolutionCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    /// Stamp of the last full sweep of stale entries.
    swept: Mutex<Option<Stamp>>,
}

impl ResolutionCache {
    pub(crate) fn get(
        &self,
        decl: DeclId,
        kinds: ElementKinds,
        tracker: &InvalidationTracker,
    ) -> Option<NullabilityVerdict> {
        let key = CacheKey { decl, kinds };
        let stale_stamp = {
            let entries = self.entries.read();
            let entry = entries.get(&key)?;
            if tracker.is_current(entry.stamp) {
                return Some(entry.verdict);
            }
            entry.stamp
        };

        let mut entries = self.entries.write();
        if entries.get(&key).is_some_and(|entry| entry.stamp == stale_stamp) {
            entries.remove(&key);
        }
        None
    }

    /// Stores `verdict` computed under `stamp`. Results computed under an outdated stamp are
    /// dropped.
    pub(crate) fn insert(
        &self,
        decl: &Declaration,
        kinds: ElementKinds,
        verdict: NullabilityVerdict,
        stamp: Stamp,
        tracker: &InvalidationTracker,
    ) {
        if !tracker.is_current(stamp) {
            return;
        }

        let mut entries = self.entries.write();
        {
            let mut swept = self.swept.lock();
            if *swept != Some(stamp) {
                let before = entries.len();
                entries.retain(|_, entry| entry.stamp == stamp);
                let evicted = before - entries.len();
                if evicted > 0 {
                    tracing::trace!(
                        target = "nova.nullability",
                        evicted,
                        stamp = stamp.to_raw(),
                        "evicted stale nullability results"
                    );
                }
                *swept = Some(stamp);
            }
        }
        entries.insert(
            CacheKey {
                decl: decl.id,
                kinds,
            },
            CacheEntry {
                verdict,
                stamp,
                file: decl.file,
                source_root: decl.source_root,
                owner: decl.owner.clone(),
            },
        );
    }

    pub(crate) fn invalidate(&self, scope: &InvalidationScope) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        if matches!(scope, InvalidationScope::Everything) {
            entries.clear();
        } else {
            entries.retain(|key, entry| !entry.in_scope(key.decl, scope));
        }
        before - entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
