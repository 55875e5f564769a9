//! `annotations.xml` reading and writing.
//!
//! ```xml
//! <root>
//!   <item name="pkg.C#m(int) 0">
//!     <annotation name="org.jspecify.annotations.NonNull"/>
//!     <annotation name="javax.annotation.Nonnull">
//!       <val name="when" val="javax.annotation.meta.When.MAYBE"/>
//!     </annotation>
//!   </item>
//! </root>
//! ```
//!
//! Output is canonical (two-space indentation, double-quoted attributes, `\n` line endings) so
//! serializing an unmodified file is byte-stable.

use crate::external_name::ExternalName;
use crate::record::{AnnotationAttribute, AnnotationRecord};

pub const ANNOTATIONS_FILE_NAME: &str = "annotations.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: ExternalName,
    pub annotations: Vec<AnnotationRecord>,
}

/// Parsed contents of one package's `annotations.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFile {
    items: Vec<Item>,
    sorted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct XmlError {
    pub message: String,
}

impl PackageFile {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            sorted: true,
        }
    }

    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let doc = roxmltree::Document::parse(text).map_err(|err| XmlError {
            message: err.to_string(),
        })?;
        let root = doc.root_element();
        if !root.has_tag_name("root") {
            return Err(XmlError {
                message: format!("expected <root> element, found <{}>", root.tag_name().name()),
            });
        }

        let mut file = PackageFile::new();
        for item_node in root
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("item"))
        {
            let Some(name) = item_node.attribute("name") else {
                tracing::debug!(
                    target = "nova.annotations",
                    "skipping <item> without a name attribute"
                );
                continue;
            };

            let mut annotations: Vec<AnnotationRecord> = Vec::new();
            for anno_node in item_node
                .children()
                .filter(|n| n.is_element() && n.has_tag_name("annotation"))
            {
                let Some(qualified_name) = anno_node.attribute("name") else {
                    continue;
                };
                let attributes = anno_node
                    .children()
                    .filter(|n| n.is_element() && n.has_tag_name("val"))
                    .filter_map(|val| {
                        Some(AnnotationAttribute {
                            name: val.attribute("name").map(str::to_string),
                            value: val.attribute("val")?.to_string(),
                        })
                    })
                    .collect();
                if annotations.iter().any(|a| a.qualified_name == qualified_name) {
                    continue;
                }
                annotations.push(AnnotationRecord {
                    qualified_name: qualified_name.to_string(),
                    attributes,
                });
            }

            // Hand-edited files occasionally repeat an item; fold duplicates into the first one.
            match file.items.iter_mut().find(|item| item.name.as_str() == name) {
                Some(existing) => {
                    for anno in annotations {
                        if !existing
                            .annotations
                            .iter()
                            .any(|a| a.qualified_name == anno.qualified_name)
                        {
                            existing.annotations.push(anno);
                        }
                    }
                }
                None => file.items.push(Item {
                    name: ExternalName::from_raw(name),
                    annotations,
                }),
            }
        }

        file.items.retain(|item| !item.annotations.is_empty());
        file.sorted = file.items.windows(2).all(|w| w[0].name <= w[1].name);
        Ok(file)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.position(name).map(|idx| &self.items[idx])
    }

    fn position(&self, name: &str) -> Option<usize> {
        if self.sorted {
            self.items
                .binary_search_by(|item| item.name.as_str().cmp(name))
                .ok()
        } else {
            self.items.iter().position(|item| item.name.as_str() == name)
        }
    }

    /// Inserts `record` under `name`, replacing an annotation of the same type in place.
    ///
    /// Returns the replaced record.
    pub fn upsert(&mut self, name: &ExternalName, record: AnnotationRecord) -> Option<AnnotationRecord> {
        let previous = match self.position(name.as_str()) {
            Some(idx) => {
                let item = &mut self.items[idx];
                match item
                    .annotations
                    .iter_mut()
                    .find(|a| a.qualified_name == record.qualified_name)
                {
                    Some(slot) => Some(std::mem::replace(slot, record)),
                    None => {
                        item.annotations.push(record);
                        None
                    }
                }
            }
            None => {
                self.items.push(Item {
                    name: name.clone(),
                    annotations: vec![record],
                });
                None
            }
        };
        self.sort();
        previous
    }

    /// Removes the annotation `qualified_name` from `name`, dropping the item once it is empty.
    pub fn remove(&mut self, name: &str, qualified_name: &str) -> Option<AnnotationRecord> {
        let idx = self.position(name)?;
        let item = &mut self.items[idx];
        let anno_idx = item
            .annotations
            .iter()
            .position(|a| a.qualified_name == qualified_name)?;
        let removed = item.annotations.remove(anno_idx);
        if item.annotations.is_empty() {
            self.items.remove(idx);
        }
        self.sort();
        Some(removed)
    }

    fn sort(&mut self) {
        // Stable: keeps the relative order of anything a human left unsorted-but-equal.
        self.items.sort_by(|a, b| a.name.cmp(&b.name));
        self.sorted = true;
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<root>\n");
        for item in &self.items {
            out.push_str("  <item name=\"");
            escape_into(item.name.as_str(), &mut out);
            out.push_str("\">\n");
            for anno in &item.annotations {
                out.push_str("    <annotation name=\"");
                escape_into(&anno.qualified_name, &mut out);
                if anno.attributes.is_empty() {
                    out.push_str("\"/>\n");
                    continue;
                }
                out.push_str("\">\n");
                for attr in &anno.attributes {
                    out.push_str("      <val");
                    if let Some(name) = &attr.name {
                        out.push_str(" name=\"");
                        escape_into(name, &mut out);
                        out.push('"');
                    }
                    out.push_str(" val=\"");
                    escape_into(&attr.value, &mut out);
                    out.push_str("\"/>\n");
                }
                out.push_str("    </annotation>\n");
            }
            out.push_str("  </item>\n");
        }
        out.push_str("</root>\n");
        out
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
}
