use nova_annotations::AnnotationRecord;
use nova_nullability::{
    Nullability, NullabilityVerdict, SearchScope, VerdictSource, JSR305_NONNULL,
    TYPE_QUALIFIER_NICKNAME,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::fixture::{env, LIB_ROOT, OTHER_ROOT};

fn marker() -> AnnotationRecord {
    AnnotationRecord::new(TYPE_QUALIFIER_NICKNAME)
}

#[test]
fn mutually_nicknamed_types_resolve_to_nothing() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model
        .add_annotation_type("a.A", vec![marker(), AnnotationRecord::new("a.B")]);
    env.model
        .add_annotation_type("a.B", vec![marker(), AnnotationRecord::new("a.A")]);
    env.model
        .add_annotation_type("a.Self", vec![marker(), AnnotationRecord::new("a.Self")]);

    let meta = env.engine.meta();
    assert_eq!(meta.resolve_nickname("a.A"), None);
    assert_eq!(meta.resolve_nickname("a.B"), None);
    assert_eq!(meta.resolve_nickname("a.Self"), None);
    assert!(meta.nicknames(SearchScope::Project).is_empty());

    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");
    env.model.annotate(&field, AnnotationRecord::new("a.A"));
    assert_eq!(env.engine.resolve_default(&field), NullabilityVerdict::UNKNOWN);
}

#[test]
fn nickname_in_code_counts_as_explicit() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model.add_annotation_type(
        "com.acme.NeverNull",
        vec![AnnotationRecord::new(JSR305_NONNULL), marker()],
    );
    let class = env.model.add_class("pkg", "C");
    let method = env.model.add_method(&class, "m", &[]);
    env.model
        .annotate(&method, AnnotationRecord::new("com.acme.NeverNull"));

    assert_eq!(
        env.engine.resolve_default(&method),
        NullabilityVerdict {
            value: Nullability::NotNull,
            source: VerdictSource::Explicit,
            from_nickname: true,
        }
    );
}

#[test]
fn nicknames_chain_through_other_nicknames() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model.add_annotation_type(
        "com.acme.Inner",
        vec![
            marker(),
            AnnotationRecord::new(JSR305_NONNULL).with_attribute("when", "When.NEVER"),
        ],
    );
    env.model.add_annotation_type(
        "com.acme.Outer",
        vec![marker(), AnnotationRecord::new("com.acme.Inner")],
    );
    env.model.add_annotation_type(
        "com.acme.Vague",
        vec![
            marker(),
            AnnotationRecord::new(JSR305_NONNULL).with_attribute("when", "When.UNKNOWN"),
        ],
    );

    let meta = env.engine.meta();
    assert_eq!(
        meta.resolve_nickname("com.acme.Outer").map(|v| v.value),
        Some(Nullability::Nullable)
    );
    assert_eq!(
        meta.resolve_nickname("com.acme.Vague").map(|v| v.value),
        Some(Nullability::Unknown)
    );
    assert!(meta
        .resolve_nickname("com.acme.Outer")
        .is_some_and(|v| v.from_nickname));
}

#[test]
fn types_without_the_marker_are_not_nicknames() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model.add_annotation_type(
        "com.acme.LooksLikeNonNull",
        vec![AnnotationRecord::new(JSR305_NONNULL)],
    );
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");
    env.model
        .annotate(&field, AnnotationRecord::new("com.acme.LooksLikeNonNull"));

    assert_eq!(env.engine.meta().resolve_nickname("com.acme.LooksLikeNonNull"), None);
    assert_eq!(env.engine.resolve_default(&field), NullabilityVerdict::UNKNOWN);
}

#[test]
fn nicknames_are_scoped_to_the_declaring_root() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model.add_annotation_type_in(
        "other.NonNullNick",
        OTHER_ROOT,
        vec![marker(), AnnotationRecord::new(JSR305_NONNULL)],
    );
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");
    env.model
        .annotate(&field, AnnotationRecord::new("other.NonNullNick"));

    let meta = env.engine.meta();
    assert!(meta.nicknames(SearchScope::Root(LIB_ROOT)).is_empty());
    assert_eq!(
        meta.nicknames(SearchScope::Root(OTHER_ROOT)).to_vec(),
        vec!["other.NonNullNick".to_string()]
    );
    assert_eq!(env.engine.resolve_default(&field), NullabilityVerdict::UNKNOWN);
}

#[test]
fn nickname_lists_refresh_after_structure_changes() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    let meta = env.engine.meta();
    assert!(meta.nicknames(SearchScope::Project).is_empty());

    env.model.add_annotation_type(
        "com.acme.NeverNull",
        vec![marker(), AnnotationRecord::new(JSR305_NONNULL)],
    );
    assert!(meta.nicknames(SearchScope::Project).is_empty());

    env.engine.on_structure_changed();
    assert_eq!(
        meta.nicknames(SearchScope::Project).to_vec(),
        vec!["com.acme.NeverNull".to_string()]
    );
}
