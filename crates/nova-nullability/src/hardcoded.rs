//! Built-in contracts for platform APIs whose nullability is documented but not annotated.

use nova_annotations::{external_name, Declaration};

use crate::verdict::Nullability;

/// A static table of known contracts. Tables are consulted in registration order.
pub trait ContractTable: Send + Sync {
    fn id(&self) -> &str;

    fn nullability(&self, decl: &Declaration) -> Option<Nullability>;
}

/// JDK contracts, keyed by external name. Type variables are spelled by their erasure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformContracts;

// Sorted by key; looked up with a binary search.
static PLATFORM_CONTRACTS: &[(&str, Nullability)] = &[
    ("java.lang.Class#getName()", Nullability::NotNull),
    ("java.lang.Object#getClass()", Nullability::NotNull),
    ("java.lang.Object#toString()", Nullability::NotNull),
    ("java.lang.String#format(java.lang.String,java.lang.Object...)", Nullability::NotNull),
    ("java.lang.String#format(java.lang.String,java.lang.Object...) 0", Nullability::NotNull),
    ("java.lang.String#trim()", Nullability::NotNull),
    ("java.lang.String#valueOf(java.lang.Object)", Nullability::NotNull),
    ("java.lang.String#valueOf(java.lang.Object) 0", Nullability::Nullable),
    ("java.lang.System#getProperty(java.lang.String)", Nullability::Nullable),
    ("java.lang.System#getProperty(java.lang.String) 0", Nullability::NotNull),
    ("java.lang.System#getenv(java.lang.String)", Nullability::Nullable),
    ("java.lang.System#lineSeparator()", Nullability::NotNull),
    ("java.lang.Thread#currentThread()", Nullability::NotNull),
    ("java.util.Collections#emptyList()", Nullability::NotNull),
    ("java.util.Collections#emptyMap()", Nullability::NotNull),
    ("java.util.Collections#emptySet()", Nullability::NotNull),
    ("java.util.Map#get(java.lang.Object)", Nullability::Nullable),
    ("java.util.Map#remove(java.lang.Object)", Nullability::Nullable),
    ("java.util.Objects#equals(java.lang.Object,java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Objects#equals(java.lang.Object,java.lang.Object) 1", Nullability::Nullable),
    ("java.util.Objects#hashCode(java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Objects#isNull(java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Objects#nonNull(java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Objects#requireNonNull(java.lang.Object)", Nullability::NotNull),
    ("java.util.Objects#requireNonNull(java.lang.Object) 0", Nullability::NotNull),
    ("java.util.Objects#requireNonNull(java.lang.Object,java.lang.String)", Nullability::NotNull),
    ("java.util.Objects#requireNonNull(java.lang.Object,java.lang.String) 0", Nullability::NotNull),
    ("java.util.Objects#requireNonNullElse(java.lang.Object,java.lang.Object)", Nullability::NotNull),
    ("java.util.Objects#requireNonNullElse(java.lang.Object,java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Objects#requireNonNullElse(java.lang.Object,java.lang.Object) 1", Nullability::NotNull),
    ("java.util.Objects#toString(java.lang.Object)", Nullability::NotNull),
    ("java.util.Objects#toString(java.lang.Object) 0", Nullability::Nullable),
    ("java.util.Optional#empty()", Nullability::NotNull),
    ("java.util.Optional#get()", Nullability::NotNull),
    ("java.util.Optional#of(java.lang.Object)", Nullability::NotNull),
    ("java.util.Optional#of(java.lang.Object) 0", Nullability::NotNull),
    ("java.util.Optional#ofNullable(java.lang.Object)", Nullability::NotNull),
    ("java.util.Optional#ofNullable(java.lang.Object) 0", Nullability::Nullable),
];

impl PlatformContracts {
    pub fn lookup(key: &str) -> Option<Nullability> {
        PLATFORM_CONTRACTS
            .binary_search_by(|(name, _)| name.cmp(&key))
            .ok()
            .map(|idx| PLATFORM_CONTRACTS[idx].1)
    }
}

impl ContractTable for PlatformContracts {
    fn id(&self) -> &str {
        "platform"
    }

    fn nullability(&self, decl: &Declaration) -> Option<Nullability> {
        let name = external_name(decl)?;
        Self::lookup(name.as_str())
    }
}
