use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    NotNull,
    Nullable,
    Unknown,
}

impl Nullability {
    /// The other of `NotNull`/`Nullable`.
    pub fn opposite(self) -> Option<Nullability> {
        match self {
            Nullability::NotNull => Some(Nullability::Nullable),
            Nullability::Nullable => Some(Nullability::NotNull),
            Nullability::Unknown => None,
        }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Nullability::NotNull => "not-null",
            Nullability::Nullable => "nullable",
            Nullability::Unknown => "unknown",
        })
    }
}

/// Where a verdict came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VerdictSource {
    /// An annotation written in the code.
    Explicit,
    /// A record in an external `annotations.xml`.
    External,
    Inferred,
    /// A built-in contract for a platform API.
    Hardcoded,
    /// A `TypeQualifierDefault`-style annotation on an enclosing container.
    MetaDefault,
    /// A well-known default annotation (`@NullMarked`, `@NonNullByDefault`, ...) on an enclosing
    /// container.
    ContainerDefault,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullabilityVerdict {
    pub value: Nullability,
    pub source: VerdictSource,
    /// The deciding annotation is a nickname of a recognized one.
    pub from_nickname: bool,
}

impl NullabilityVerdict {
    pub const UNKNOWN: NullabilityVerdict = NullabilityVerdict {
        value: Nullability::Unknown,
        source: VerdictSource::None,
        from_nickname: false,
    };

    pub fn new(value: Nullability, source: VerdictSource) -> Self {
        Self {
            value,
            source,
            from_nickname: false,
        }
    }

    pub fn with_source(self, source: VerdictSource) -> Self {
        Self { source, ..self }
    }

    pub fn is_not_null(&self) -> bool {
        self.value == Nullability::NotNull
    }

    pub fn is_nullable(&self) -> bool {
        self.value == Nullability::Nullable
    }
}

impl Default for NullabilityVerdict {
    fn default() -> Self {
        Self::UNKNOWN
    }
}
