use schemars::schema::{RootSchema, Schema, SchemaObject};
use schemars::schema_for;

use crate::NovaConfig;

/// JSON schema for `nova.toml`.
///
/// This schema is intended for editor tooling (TOML JSON schema integration) and CI validation.
#[must_use]
pub fn json_schema() -> RootSchema {
    let mut schema = schema_for!(NovaConfig);
    apply_semantic_constraints(&mut schema);
    schema
}

fn apply_semantic_constraints(schema: &mut RootSchema) {
    // Only the checks JSON Schema can express; the rest live in `validation.rs`.
    for list in ["not_null", "nullable"] {
        if let Some(property) = property_mut(schema, "NullabilityConfig", list) {
            property.array().unique_items = Some(true);
        }
    }
    for name in ["default_not_null", "default_nullable"] {
        if let Some(property) = property_mut(schema, "NullabilityConfig", name) {
            property.string().min_length = Some(1);
        }
    }
    if let Some(property) = property_mut(schema, "ExternalAnnotationRootConfig", "owner") {
        property.string().min_length = Some(1);
    }
}

fn property_mut<'a>(
    schema: &'a mut RootSchema,
    definition_name: &str,
    property_name: &str,
) -> Option<&'a mut SchemaObject> {
    let Schema::Object(definition) = schema.definitions.get_mut(definition_name)? else {
        return None;
    };
    match definition.object().properties.get_mut(property_name)? {
        Schema::Object(property) => Some(property),
        Schema::Bool(_) => None,
    }
}
