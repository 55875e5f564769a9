use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use nova_annotations::{
    external_name, AnnotationRecord, AnnotationStore, AnnotationsError, ChangeReason, DeclId,
    Declaration, InvalidationTracker, MutationOutcome, RootChooser, RootSelection, RootSelector,
};
use parking_lot::RwLock;

use crate::cache::{InvalidationScope, ResolutionCache};
use crate::defaults::NullabilityDefaultResolver;
use crate::element::ElementKinds;
use crate::hardcoded::{ContractTable, PlatformContracts};
use crate::meta::MetaAnnotationResolver;
use crate::model::{InferenceProvider, ProgramModel, SearchScope};
use crate::names::NullabilityNames;
use crate::verdict::{Nullability, NullabilityVerdict, VerdictSource};

/// Result of [`NullabilityEngine::annotate_nullability`].
#[derive(Debug)]
pub enum AnnotateOutcome {
    Written(MutationOutcome),
    /// The host's root chooser was dismissed.
    Cancelled,
    /// No writable annotation root exists and none could be created.
    CannotAnnotate,
}

pub struct NullabilityEngineBuilder {
    model: Arc<dyn ProgramModel>,
    store: Arc<AnnotationStore>,
    names: NullabilityNames,
    inference: Vec<Arc<dyn InferenceProvider>>,
    contracts: Vec<Arc<dyn ContractTable>>,
    platform_contracts: bool,
}

impl NullabilityEngineBuilder {
    /// Inference providers are consulted in registration order. A provider whose id is already
    /// registered is ignored.
    pub fn with_inference_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        if self.inference.iter().any(|p| p.id() == provider.id()) {
            tracing::warn!(
                target = "nova.nullability",
                provider = provider.id(),
                "duplicate inference provider ignored"
            );
        } else {
            self.inference.push(provider);
        }
        self
    }

    /// Contract tables are consulted in registration order, before the built-in platform table.
    pub fn with_contract_table(mut self, table: Arc<dyn ContractTable>) -> Self {
        if self.contracts.iter().any(|t| t.id() == table.id()) {
            tracing::warn!(
                target = "nova.nullability",
                table = table.id(),
                "duplicate contract table ignored"
            );
        } else {
            self.contracts.push(table);
        }
        self
    }

    pub fn without_platform_contracts(mut self) -> Self {
        self.platform_contracts = false;
        self
    }

    pub fn build(self) -> NullabilityEngine {
        let tracker = Arc::clone(self.store.tracker());
        let names = Arc::new(self.names);
        let meta = Arc::new(MetaAnnotationResolver::new(
            Arc::clone(&self.model),
            Arc::clone(&tracker),
            Arc::clone(&names),
        ));
        let defaults = NullabilityDefaultResolver::new(Arc::clone(&self.model), Arc::clone(&meta));

        let mut contracts = self.contracts;
        if self.platform_contracts {
            contracts.push(Arc::new(PlatformContracts));
        }

        NullabilityEngine {
            model: self.model,
            store: self.store,
            tracker,
            names: RwLock::new(names),
            meta,
            defaults,
            inference: self.inference,
            contracts,
            cache: ResolutionCache::default(),
        }
    }
}

/// Resolves the nullability of declarations.
///
/// Tiers are consulted in order and the first one with an answer decides:
///
/// 1. annotations written in code (recognized names and their nicknames),
/// 2. external annotations from the [`AnnotationStore`],
/// 3. inference providers,
/// 4. contract tables,
/// 5. defaults declared on enclosing containers.
///
/// An explicit or external annotation decides even when it says "unknown"
/// (`@Nonnull(when = UNKNOWN)`); later tiers only decide with a definite answer from their
/// provider.
///
/// Results are cached per declaration and element kinds until the shared
/// [`InvalidationTracker`] advances.
pub struct NullabilityEngine {
    model: Arc<dyn ProgramModel>,
    store: Arc<AnnotationStore>,
    tracker: Arc<InvalidationTracker>,
    names: RwLock<Arc<NullabilityNames>>,
    meta: Arc<MetaAnnotationResolver>,
    defaults: NullabilityDefaultResolver,
    inference: Vec<Arc<dyn InferenceProvider>>,
    contracts: Vec<Arc<dyn ContractTable>>,
    cache: ResolutionCache,
}

impl fmt::Debug for NullabilityEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullabilityEngine")
            .field(
                "inference",
                &self.inference.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .field(
                "contracts",
                &self.contracts.iter().map(|t| t.id()).collect::<Vec<_>>(),
            )
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl NullabilityEngine {
    pub fn builder(
        model: Arc<dyn ProgramModel>,
        store: Arc<AnnotationStore>,
        names: NullabilityNames,
    ) -> NullabilityEngineBuilder {
        NullabilityEngineBuilder {
            model,
            store,
            names,
            inference: Vec::new(),
            contracts: Vec::new(),
            platform_contracts: true,
        }
    }

    pub fn new(
        model: Arc<dyn ProgramModel>,
        store: Arc<AnnotationStore>,
        names: NullabilityNames,
    ) -> Self {
        Self::builder(model, store, names).build()
    }

    pub fn store(&self) -> &Arc<AnnotationStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<InvalidationTracker> {
        &self.tracker
    }

    pub fn names(&self) -> Arc<NullabilityNames> {
        self.names.read().clone()
    }

    pub fn meta(&self) -> &MetaAnnotationResolver {
        &self.meta
    }

    pub fn defaults(&self) -> &NullabilityDefaultResolver {
        &self.defaults
    }

    /// Number of cached results, stale ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Nullability of `decl` in the context of `kinds`. Never fails.
    pub fn resolve(&self, decl: &Declaration, kinds: ElementKinds) -> NullabilityVerdict {
        if let Some(verdict) = self.cache.get(decl.id, kinds, &self.tracker) {
            return verdict;
        }

        let stamp = self.tracker.stamp();
        let verdict = self.compute(decl, kinds);
        tracing::trace!(
            target = "nova.nullability",
            decl = decl.id.to_raw(),
            ?kinds,
            value = %verdict.value,
            source = ?verdict.source,
            "resolved nullability"
        );
        self.cache.insert(decl, kinds, verdict, stamp, &self.tracker);
        verdict
    }

    /// [`Self::resolve`] under the kinds the declaration itself is looked up as.
    pub fn resolve_default(&self, decl: &Declaration) -> NullabilityVerdict {
        self.resolve(decl, ElementKinds::for_declaration(&decl.kind))
    }

    /// Looks `id` up in the program model first. Unknown ids resolve to
    /// [`NullabilityVerdict::UNKNOWN`].
    pub fn resolve_id(&self, id: DeclId, kinds: ElementKinds) -> NullabilityVerdict {
        match self.model.declaration(id) {
            Some(decl) => self.resolve(&decl, kinds),
            None => NullabilityVerdict::UNKNOWN,
        }
    }

    /// Evicts cached results in `scope` and returns how many were evicted.
    pub fn invalidate(&self, scope: InvalidationScope) -> usize {
        let evicted = self.cache.invalidate(&scope);
        tracing::debug!(
            target = "nova.nullability",
            ?scope,
            evicted,
            "nullability cache invalidated"
        );
        evicted
    }

    /// Called by the host after the program model changed in a way that may affect
    /// resolution (annotations edited, declarations moved, classpath changed).
    pub fn on_structure_changed(&self) {
        self.tracker.bump(ChangeReason::StructureChanged);
    }

    /// Switches to a new set of recognized names. Every cached result becomes stale.
    pub fn reconfigure(&self, names: NullabilityNames) {
        let names = Arc::new(names);
        *self.names.write() = Arc::clone(&names);
        self.meta.set_names(names);
        self.tracker.bump(ChangeReason::ConfigurationChanged);
    }

    /// Marks `decl` with the configured default annotation for `nullability` in an external
    /// annotation root, removing recognized annotations of the opposite nullability from the
    /// same item in the same write.
    ///
    /// [`Nullability::Unknown`] removes every recognized annotation from every writable root
    /// instead.
    pub fn annotate_nullability(
        &self,
        decl: &Declaration,
        nullability: Nullability,
        host: Option<&dyn RootChooser>,
        suggested_dirs: &[PathBuf],
    ) -> Result<AnnotateOutcome, AnnotationsError> {
        let name = external_name(decl).ok_or(AnnotationsError::NoExternalName)?;
        let package = decl.kind.package().ok_or(AnnotationsError::NoExternalName)?;
        let names = self.names();

        let (Some(default), Some(opposite)) =
            (names.default_for(nullability), nullability.opposite())
        else {
            let mut outcome = MutationOutcome::default();
            for record in self.store.find_for_declaration(decl) {
                if !names.is_recognized(&record) {
                    continue;
                }
                let removed = self.store.deannotate(decl, &record.qualified_name)?;
                outcome.changed |= removed.changed;
                outcome.previous.extend(removed.previous);
            }
            return Ok(AnnotateOutcome::Written(outcome));
        };

        let root = match RootSelector::new(&*self.store).select(decl, host, suggested_dirs) {
            RootSelection::Root(root) => root,
            RootSelection::Cancelled => return Ok(AnnotateOutcome::Cancelled),
            RootSelection::CannotAnnotate => return Ok(AnnotateOutcome::CannotAnnotate),
        };

        // Anything recognized that would still resolve to something other than the target.
        let current = self.store.find(&root, package, &name);
        let conflicting: Vec<&str> = current
            .iter()
            .filter(|record| {
                self.recognized_value(decl, record)
                    .is_some_and(|value| value != nullability)
            })
            .map(|record| record.qualified_name.as_str())
            .chain(names.list(opposite).iter().map(String::as_str))
            .collect();
        let outcome = self.store.replace(
            &root,
            package,
            &name,
            AnnotationRecord::new(default),
            &conflicting,
        )?;
        Ok(AnnotateOutcome::Written(outcome))
    }

    fn compute(&self, decl: &Declaration, kinds: ElementKinds) -> NullabilityVerdict {
        let present = self.model.annotations_present(decl);
        if let Some(verdict) = self.first_recognized(decl, &present) {
            return verdict.with_source(VerdictSource::Explicit);
        }

        let external = self.store.find_for_declaration(decl);
        if let Some(verdict) = self.first_recognized(decl, &external) {
            return verdict.with_source(VerdictSource::External);
        }

        for provider in &self.inference {
            if let Some(verdict) = provider.inferred_nullability(decl) {
                return verdict.with_source(VerdictSource::Inferred);
            }
        }

        for table in &self.contracts {
            if let Some(value) = table.nullability(decl) {
                return NullabilityVerdict::new(value, VerdictSource::Hardcoded);
            }
        }

        self.defaults
            .resolve(decl, kinds)
            .unwrap_or(NullabilityVerdict::UNKNOWN)
    }

    /// The first annotation in `records` that is recognized, directly or as a nickname.
    fn first_recognized(
        &self,
        decl: &Declaration,
        records: &[AnnotationRecord],
    ) -> Option<NullabilityVerdict> {
        let mut nicknames: Option<Arc<[String]>> = None;
        records
            .iter()
            .find_map(|record| self.recognized(decl, record, &mut nicknames))
    }

    fn recognized_value(
        &self,
        decl: &Declaration,
        record: &AnnotationRecord,
    ) -> Option<Nullability> {
        self.recognized(decl, record, &mut None)
            .map(|verdict| verdict.value)
    }

    /// `nicknames` is filled on first use.
    fn recognized(
        &self,
        decl: &Declaration,
        record: &AnnotationRecord,
        nicknames: &mut Option<Arc<[String]>>,
    ) -> Option<NullabilityVerdict> {
        if let Some(value) = self.meta.nullability_of(record) {
            return Some(NullabilityVerdict::new(value, VerdictSource::None));
        }
        let known = nicknames.get_or_insert_with(|| self.meta.nicknames(SearchScope::of(decl)));
        if known.iter().any(|n| *n == record.qualified_name) {
            return self.meta.resolve_nickname(&record.qualified_name);
        }
        None
    }
}
