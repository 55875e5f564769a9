//! Nullability resolution for Java declarations.
//!
//! [`NullabilityEngine`] merges every source of nullability information Nova knows about
//! (annotations in code, external annotations, inference, built-in contracts, container
//! defaults) into one [`NullabilityVerdict`] that records which tier decided.
//!
//! The engine does not own a program model. Hosts implement [`ProgramModel`] over their own
//! syntax/semantic database and call [`NullabilityEngine::on_structure_changed`] when it
//! changes; external annotation writes advance the same [`nova_annotations::InvalidationTracker`]
//! automatically.

mod cache;
mod defaults;
mod element;
mod engine;
mod hardcoded;
mod meta;
mod model;
mod names;
mod verdict;

pub use cache::InvalidationScope;
pub use defaults::{
    NullabilityDefaultResolver, ECLIPSE_NON_NULL_BY_DEFAULT, JSPECIFY_NULL_MARKED,
    JSPECIFY_NULL_UNMARKED, SPRING_NON_NULL_API, SPRING_NON_NULL_FIELDS,
};
pub use element::ElementKinds;
pub use engine::{AnnotateOutcome, NullabilityEngine, NullabilityEngineBuilder};
pub use hardcoded::{ContractTable, PlatformContracts};
pub use meta::{
    MetaAnnotationResolver, JSR305_NONNULL, TYPE_QUALIFIER_DEFAULT, TYPE_QUALIFIER_NICKNAME,
};
pub use model::{Container, ContainerAnnotations, InferenceProvider, ProgramModel, SearchScope};
pub use names::NullabilityNames;
pub use verdict::{Nullability, NullabilityVerdict, VerdictSource};
