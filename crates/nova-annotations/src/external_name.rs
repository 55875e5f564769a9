//! Canonical textual keys for declarations ("external names").
//!
//! Format:
//! - class: `pkg.Outer.Inner`
//! - method: `pkg.Class#name(int,java.lang.String)` (constructors use the class's simple name)
//! - field: `pkg.Class#field`
//! - parameter: `<method external name> <index>`
//!
//! Parameter types are erased textually: generic arguments are dropped, array and varargs
//! suffixes are kept. Two overloads with the same erasure share a key.

use std::borrow::Borrow;
use std::fmt;

use crate::decl::{Declaration, DeclarationKind, MethodRef};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalName(String);

impl ExternalName {
    /// Wraps an already-canonical key (for example one read back from an `annotations.xml`).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ExternalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ExternalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the external name of `decl`, or `None` when the declaration cannot be targeted
/// (local/anonymous classes, members without a simple name).
pub fn external_name(decl: &Declaration) -> Option<ExternalName> {
    encode(&decl.kind)
}

pub fn encode(kind: &DeclarationKind) -> Option<ExternalName> {
    let raw = match kind {
        DeclarationKind::Class(class) => class.qualified_name()?,
        DeclarationKind::Method(method) => method_key(method)?,
        DeclarationKind::Field { class, name } => {
            if name.is_empty() {
                return None;
            }
            format!("{}#{name}", class.qualified_name()?)
        }
        DeclarationKind::Parameter { method, index } => {
            format!("{} {index}", method_key(method)?)
        }
    };
    Some(ExternalName(raw))
}

fn method_key(method: &MethodRef) -> Option<String> {
    let class_name = method.class.qualified_name()?;
    let name = if method.is_constructor {
        method.class.simple_name()?
    } else {
        method.name.as_str()
    };
    if name.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(class_name.len() + name.len() + 16);
    out.push_str(&class_name);
    out.push('#');
    out.push_str(name);
    out.push('(');
    for (idx, ty) in method.parameter_types.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&erase(ty));
    }
    out.push(')');
    Some(out)
}

/// Drops generic arguments and whitespace from a type spelling.
///
/// `java.util.Map<K, java.util.List<V>>[]` becomes `java.util.Map[]`.
pub fn erase(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut depth = 0usize;
    for ch in ty.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}
