use std::sync::Arc;

use nova_annotations::{
    AnnotationAttribute, AnnotationRecord, AnnotationStore, AnnotationsError, ClassRef, DeclId,
    Declaration, DeclarationKind, InvalidationTracker, MethodRef, OwnerId,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn parameter() -> Declaration {
    let method = MethodRef::new(
        ClassRef::named("com.acme", "Repo"),
        "save",
        ["java.util.List<com.acme.Item>", "int..."],
    );
    Declaration::new(
        DeclId::from_raw(7),
        DeclarationKind::Parameter { method, index: 0 },
    )
    .with_owner("acme")
}

#[test]
fn annotate_edit_and_deannotate_a_declaration() {
    let tmp = tempdir().unwrap();
    let store = AnnotationStore::new(Arc::new(InvalidationTracker::new()));
    let root = store.register_root(OwnerId::new("acme"), tmp.path(), true);
    let decl = parameter();

    store
        .annotate(&root, &decl, AnnotationRecord::new("a.NonNull"))
        .unwrap();
    let text = std::fs::read_to_string(tmp.path().join("com/acme/annotations.xml")).unwrap();
    assert!(
        text.contains("<item name=\"com.acme.Repo#save(java.util.List,int...) 0\">"),
        "{text}"
    );

    let outcome = store
        .edit(
            &root,
            &decl,
            "a.NonNull",
            vec![AnnotationAttribute {
                name: Some("when".to_string()),
                value: "ALWAYS".to_string(),
            }],
        )
        .unwrap();
    assert_eq!(outcome.previous, vec![AnnotationRecord::new("a.NonNull")]);
    assert_eq!(
        store.find_for_declaration(&decl),
        vec![AnnotationRecord::new("a.NonNull").with_attribute("when", "ALWAYS")]
    );

    let outcome = store.deannotate(&decl, "a.NonNull").unwrap();
    assert!(outcome.changed);
    assert!(store.find_for_declaration(&decl).is_empty());

    // Undo by re-applying what was removed.
    for record in outcome.previous {
        store.annotate(&root, &decl, record).unwrap();
    }
    assert_eq!(
        store.find_for_declaration(&decl),
        vec![AnnotationRecord::new("a.NonNull").with_attribute("when", "ALWAYS")]
    );
}

#[test]
fn first_registered_root_wins_per_annotation_type() {
    let tmp = tempdir().unwrap();
    let store = AnnotationStore::new(Arc::new(InvalidationTracker::new()));
    let first = store.register_root(OwnerId::new("acme"), tmp.path().join("first"), true);
    let second = store.register_root(OwnerId::new("acme"), tmp.path().join("second"), true);
    let decl = parameter();

    store
        .annotate(&second, &decl, AnnotationRecord::new("a.NonNull").with_value("second"))
        .unwrap();
    store
        .annotate(&second, &decl, AnnotationRecord::new("a.Extra"))
        .unwrap();
    store
        .annotate(&first, &decl, AnnotationRecord::new("a.NonNull").with_value("first"))
        .unwrap();

    assert_eq!(
        store.find_for_declaration(&decl),
        vec![
            AnnotationRecord::new("a.NonNull").with_value("first"),
            AnnotationRecord::new("a.Extra"),
        ]
    );

    let removed = store.deannotate(&decl, "a.NonNull").unwrap();
    assert_eq!(removed.previous.len(), 2);
    assert_eq!(
        store.find_for_declaration(&decl),
        vec![AnnotationRecord::new("a.Extra")]
    );
}

#[test]
fn local_classes_cannot_be_annotated() {
    let tmp = tempdir().unwrap();
    let store = AnnotationStore::new(Arc::new(InvalidationTracker::new()));
    let root = store.register_root(OwnerId::new("acme"), tmp.path(), true);
    let local = Declaration::new(
        DeclId::from_raw(1),
        DeclarationKind::Method(MethodRef::new(ClassRef::Local, "run", Vec::<String>::new())),
    )
    .with_owner("acme");

    let err = store
        .annotate(&root, &local, AnnotationRecord::new("a.N"))
        .unwrap_err();
    assert!(matches!(err, AnnotationsError::NoExternalName), "{err:?}");
    assert!(store.find_for_declaration(&local).is_empty());
}

#[test]
fn roots_from_configuration_are_registered() {
    let tmp = tempdir().unwrap();
    let config = nova_config::ExternalAnnotationsConfig {
        roots: vec![
            nova_config::ExternalAnnotationRootConfig {
                owner: "jdk".to_string(),
                path: tmp.path().join("jdk"),
                read_only: true,
            },
            nova_config::ExternalAnnotationRootConfig {
                owner: "acme".to_string(),
                path: tmp.path().join("acme"),
                read_only: false,
            },
        ],
    };
    let store = AnnotationStore::from_config(Arc::new(InvalidationTracker::new()), &config);
    let roots = store.roots();
    assert_eq!(roots.len(), 2);
    assert!(!roots[0].is_writable());
    assert_eq!(roots[1].owner(), &OwnerId::new("acme"));
    assert!(roots[1].is_writable());
}
