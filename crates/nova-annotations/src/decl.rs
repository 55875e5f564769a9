//! Declaration handles supplied by the program model.
//!
//! These are value snapshots: the program model owns the real elements and hands out a
//! [`Declaration`] describing the parts of a declaration that annotation lookup needs
//! (kind, signature, owning library, source root). Identity is carried by [`DeclId`].

use std::fmt;

macro_rules! raw_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn to_raw(self) -> u32 {
                self.0
            }
        }
    };
}

raw_id!(
    /// Stable identity of a declaration inside the program model.
    DeclId
);
raw_id!(
    /// Identity of a source or class file.
    FileId
);
raw_id!(
    /// Identity of a classpath/source root (a jar, a class directory, a source folder).
    SourceRootId
);

/// The library, SDK or module that owns a declaration's containing file.
///
/// External-annotation roots are attached to owners, not to individual files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reference to a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassRef {
    /// A class reachable by name. `name` is the dotted nesting chain below the package
    /// (`Outer.Inner`).
    Named { package: String, name: String },
    /// An anonymous or local class. These have no stable name and cannot be targeted by
    /// external annotations.
    Local,
}

impl ClassRef {
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        ClassRef::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Fully qualified (source-style) name, e.g. `java.util.Map.Entry`.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            ClassRef::Named { package, name } if !name.is_empty() => Some(if package.is_empty() {
                name.clone()
            } else {
                format!("{package}.{name}")
            }),
            _ => None,
        }
    }

    pub fn simple_name(&self) -> Option<&str> {
        match self {
            ClassRef::Named { name, .. } => name.rsplit('.').next().filter(|s| !s.is_empty()),
            ClassRef::Local => None,
        }
    }

    pub fn package(&self) -> Option<&str> {
        match self {
            ClassRef::Named { package, .. } => Some(package),
            ClassRef::Local => None,
        }
    }
}

/// A method or constructor signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: ClassRef,
    /// Simple method name. Ignored for constructors.
    pub name: String,
    pub is_constructor: bool,
    /// Parameter types as the program model spells them (generic arguments are erased by the
    /// external-name codec).
    pub parameter_types: Vec<String>,
}

impl MethodRef {
    pub fn new<I, S>(class: ClassRef, name: impl Into<String>, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class,
            name: name.into(),
            is_constructor: false,
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn constructor<I, S>(class: ClassRef, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class,
            name: String::new(),
            is_constructor: true,
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Class(ClassRef),
    Method(MethodRef),
    Field { class: ClassRef, name: String },
    /// Zero-based parameter of `method`.
    Parameter { method: MethodRef, index: u32 },
}

impl DeclarationKind {
    /// The class that determines which package file holds this declaration's annotations.
    pub fn class(&self) -> &ClassRef {
        match self {
            DeclarationKind::Class(class) => class,
            DeclarationKind::Method(method) | DeclarationKind::Parameter { method, .. } => {
                &method.class
            }
            DeclarationKind::Field { class, .. } => class,
        }
    }

    pub fn package(&self) -> Option<&str> {
        self.class().package()
    }
}

/// Snapshot of a program element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclarationKind,
    /// Library/SDK/module owning the containing file.
    pub owner: Option<OwnerId>,
    pub source_root: Option<SourceRootId>,
    pub file: Option<FileId>,
    /// Whether the declaration lives in editable source (as opposed to a binary or generated
    /// file).
    pub writable: bool,
}

impl Declaration {
    pub fn new(id: DeclId, kind: DeclarationKind) -> Self {
        Self {
            id,
            kind,
            owner: None,
            source_root: None,
            file: None,
            writable: false,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<OwnerId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_source_root(mut self, root: SourceRootId) -> Self {
        self.source_root = Some(root);
        self
    }

    pub fn with_file(mut self, file: FileId) -> Self {
        self.file = Some(file);
        self
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }
}
