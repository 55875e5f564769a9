/// One argument of an annotation: `name = value`, or a bare `value` for the default element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationAttribute {
    pub name: Option<String>,
    /// Literal source text of the argument expression (`"text"`, `When.MAYBE`, `{A, B}`).
    pub value: String,
}

/// An annotation usage: qualified type name plus arguments in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationRecord {
    pub qualified_name: String,
    pub attributes: Vec<AnnotationAttribute>,
}

impl AnnotationRecord {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(AnnotationAttribute {
            name: Some(name.into()),
            value: value.into(),
        });
        self
    }

    /// Adds an unnamed (`value`) argument.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.attributes.push(AnnotationAttribute {
            name: None,
            value: value.into(),
        });
        self
    }

    /// Looks up an argument by element name. `value` also matches unnamed arguments.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| match &attr.name {
                Some(attr_name) => attr_name == name,
                None => name == "value",
            })
            .map(|attr| attr.value.as_str())
    }

    /// Every value supplied for element `name`, with array initializers (`{A, B}`) flattened.
    pub fn attribute_values(&self, name: &str) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|attr| match &attr.name {
                Some(attr_name) => attr_name == name,
                None => name == "value",
            })
            .flat_map(|attr| split_array_initializer(&attr.value))
            .collect()
    }

    pub fn has_name(&self, qualified_name: &str) -> bool {
        self.qualified_name == qualified_name
    }
}

fn split_array_initializer(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);
    inner.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Last dotted segment of an enum-constant reference (`javax.annotation.meta.When.MAYBE` →
/// `MAYBE`), with surrounding quotes removed.
pub fn constant_name(text: &str) -> &str {
    let trimmed = text.trim().trim_matches('"');
    trimmed.rsplit('.').next().unwrap_or(trimmed).trim()
}
