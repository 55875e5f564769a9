//! Element kinds a nullability default can target.

use std::fmt;

use nova_annotations::{constant_name, DeclarationKind};

/// Set of element kinds, as named by `java.lang.annotation.ElementType`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementKinds(u8);

impl ElementKinds {
    pub const EMPTY: ElementKinds = ElementKinds(0);
    pub const PARAMETER: ElementKinds = ElementKinds(1 << 0);
    pub const FIELD: ElementKinds = ElementKinds(1 << 1);
    /// Method return values.
    pub const METHOD: ElementKinds = ElementKinds(1 << 2);
    pub const LOCAL_VARIABLE: ElementKinds = ElementKinds(1 << 3);
    pub const TYPE_USE: ElementKinds = ElementKinds(1 << 4);
    pub const ALL: ElementKinds = ElementKinds(0b1_1111);

    const NAMES: [(ElementKinds, &'static str); 5] = [
        (Self::PARAMETER, "PARAMETER"),
        (Self::FIELD, "FIELD"),
        (Self::METHOD, "METHOD"),
        (Self::LOCAL_VARIABLE, "LOCAL_VARIABLE"),
        (Self::TYPE_USE, "TYPE_USE"),
    ];

    /// Kinds a declaration's own nullability is looked up under. Classes have none.
    pub fn for_declaration(kind: &DeclarationKind) -> ElementKinds {
        match kind {
            DeclarationKind::Class(_) => ElementKinds::EMPTY,
            DeclarationKind::Method(_) => ElementKinds::METHOD | ElementKinds::TYPE_USE,
            DeclarationKind::Field { .. } => ElementKinds::FIELD | ElementKinds::TYPE_USE,
            DeclarationKind::Parameter { .. } => ElementKinds::PARAMETER | ElementKinds::TYPE_USE,
        }
    }

    /// Parses an `ElementType` constant (`ElementType.PARAMETER`,
    /// `java.lang.annotation.ElementType.FIELD`, `METHOD`). Kinds that carry no nullability
    /// (`TYPE`, `PACKAGE`, ...) parse to the empty set; unknown names to `None`.
    pub fn from_element_type(text: &str) -> Option<ElementKinds> {
        let name = constant_name(text);
        if let Some((kind, _)) = Self::NAMES.iter().find(|(_, n)| *n == name) {
            return Some(*kind);
        }
        match name {
            "TYPE" | "ANNOTATION_TYPE" | "CONSTRUCTOR" | "PACKAGE" | "TYPE_PARAMETER"
            | "MODULE" | "RECORD_COMPONENT" => Some(ElementKinds::EMPTY),
            _ => None,
        }
    }

    /// Union of every parseable entry in `values`.
    pub fn from_element_types<'a>(values: impl IntoIterator<Item = &'a str>) -> ElementKinds {
        values
            .into_iter()
            .filter_map(ElementKinds::from_element_type)
            .fold(ElementKinds::EMPTY, |acc, kind| acc | kind)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ElementKinds) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: ElementKinds) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for ElementKinds {
    type Output = ElementKinds;

    fn bitor(self, rhs: ElementKinds) -> ElementKinds {
        ElementKinds(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ElementKinds {
    fn bitor_assign(&mut self, rhs: ElementKinds) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ElementKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                Self::NAMES
                    .iter()
                    .filter(|(kind, _)| self.contains(*kind))
                    .map(|(_, name)| name),
            )
            .finish()
    }
}
