use std::path::PathBuf;
use std::sync::Arc;

use nova_annotations::{
    AnnotationRecord, AnnotationRoot, AnnotationsError, ClassRef, DeclId, Declaration,
    DeclarationKind, OwnerId, RootChooser,
};
use nova_nullability::{
    AnnotateOutcome, Nullability, NullabilityVerdict, VerdictSource, JSR305_NONNULL,
    TYPE_QUALIFIER_NICKNAME,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::fixture::env;

const NOT_NULL: &str = "org.jetbrains.annotations.NotNull";
const NULLABLE: &str = "org.jetbrains.annotations.Nullable";

struct Host {
    new_root: Option<PathBuf>,
    offered: parking_lot::Mutex<Vec<PathBuf>>,
}

impl Host {
    fn new(new_root: Option<PathBuf>) -> Self {
        Self {
            new_root,
            offered: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

impl RootChooser for Host {
    fn choose_new_root(&self, candidates: &[PathBuf]) -> Option<PathBuf> {
        self.offered.lock().extend_from_slice(candidates);
        self.new_root.clone()
    }

    fn choose_existing_root(&self, roots: &[Arc<AnnotationRoot>]) -> Option<Arc<AnnotationRoot>> {
        roots.last().cloned()
    }
}

fn written(outcome: AnnotateOutcome) -> nova_annotations::MutationOutcome {
    match outcome {
        AnnotateOutcome::Written(outcome) => outcome,
        other => panic!("expected a write, got {other:?}"),
    }
}

#[test]
fn marking_replaces_the_opposite_annotation_in_one_write() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    let class = env.model.add_class("pkg", "C");
    let method = env.model.add_method(&class, "m", &["int"]);
    env.store
        .annotate(&env.root, &method, AnnotationRecord::new("com.acme.Audited"))
        .unwrap();

    let outcome = written(
        env.engine
            .annotate_nullability(&method, Nullability::NotNull, None, &[])
            .unwrap(),
    );
    assert!(outcome.changed);
    assert_eq!(
        env.engine.resolve_default(&method),
        NullabilityVerdict::new(Nullability::NotNull, VerdictSource::External)
    );

    let tracker = env.engine.tracker();
    let before = tracker.stamp();
    let outcome = written(
        env.engine
            .annotate_nullability(&method, Nullability::Nullable, None, &[])
            .unwrap(),
    );
    assert_eq!(outcome.previous, vec![AnnotationRecord::new(NOT_NULL)]);
    assert_eq!(tracker.stamp().to_raw(), before.to_raw() + 1);
    assert_eq!(
        env.store.find_for_declaration(&method),
        vec![
            AnnotationRecord::new("com.acme.Audited"),
            AnnotationRecord::new(NULLABLE)
        ]
    );
    assert_eq!(
        env.engine.resolve_default(&method).value,
        Nullability::Nullable
    );

    // Marking again is a no-op.
    let outcome = written(
        env.engine
            .annotate_nullability(&method, Nullability::Nullable, None, &[])
            .unwrap(),
    );
    assert!(!outcome.changed);
}

#[test]
fn marking_removes_annotations_that_resolve_to_another_value() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    env.model.add_annotation_type(
        "com.acme.MaybeNull",
        vec![
            AnnotationRecord::new(TYPE_QUALIFIER_NICKNAME),
            AnnotationRecord::new(JSR305_NONNULL).with_attribute("when", "When.MAYBE"),
        ],
    );
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");
    let maybe = AnnotationRecord::new(JSR305_NONNULL).with_attribute("when", "When.MAYBE");
    env.store.annotate(&env.root, &field, maybe.clone()).unwrap();
    env.store
        .annotate(&env.root, &field, AnnotationRecord::new("com.acme.MaybeNull"))
        .unwrap();
    // Listed as not-null, but resolves to not-null as well: kept.
    env.store
        .annotate(
            &env.root,
            &field,
            AnnotationRecord::new("org.jspecify.annotations.NonNull"),
        )
        .unwrap();
    assert_eq!(
        env.engine.resolve_default(&field).value,
        Nullability::Nullable
    );

    let outcome = written(
        env.engine
            .annotate_nullability(&field, Nullability::NotNull, None, &[])
            .unwrap(),
    );
    assert!(outcome.changed);
    assert_eq!(
        outcome.previous,
        vec![maybe, AnnotationRecord::new("com.acme.MaybeNull")]
    );
    assert_eq!(
        env.store.find_for_declaration(&field),
        vec![
            AnnotationRecord::new("org.jspecify.annotations.NonNull"),
            AnnotationRecord::new(NOT_NULL)
        ]
    );
    assert_eq!(
        env.engine.resolve_default(&field),
        NullabilityVerdict::new(Nullability::NotNull, VerdictSource::External)
    );
}

#[test]
fn marking_unknown_removes_recognized_annotations_only() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");
    env.store
        .annotate(&env.root, &field, AnnotationRecord::new("com.acme.Audited"))
        .unwrap();
    env.store
        .annotate(
            &env.root,
            &field,
            AnnotationRecord::new("org.jspecify.annotations.NonNull"),
        )
        .unwrap();

    let outcome = written(
        env.engine
            .annotate_nullability(&field, Nullability::Unknown, None, &[])
            .unwrap(),
    );
    assert!(outcome.changed);
    assert_eq!(
        outcome.previous,
        vec![AnnotationRecord::new("org.jspecify.annotations.NonNull")]
    );
    assert_eq!(
        env.store.find_for_declaration(&field),
        vec![AnnotationRecord::new("com.acme.Audited")]
    );
    assert_eq!(env.engine.resolve_default(&field), NullabilityVerdict::UNKNOWN);
}

#[test]
fn without_roots_the_host_decides() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    assert!(env.store.unregister_root(env.root.id()));
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");

    let outcome = env
        .engine
        .annotate_nullability(&field, Nullability::NotNull, None, &[])
        .unwrap();
    assert!(matches!(outcome, AnnotateOutcome::CannotAnnotate));

    let dismissed = Host::new(None);
    let suggested = vec![tmp.path().join("suggested")];
    let outcome = env
        .engine
        .annotate_nullability(&field, Nullability::NotNull, Some(&dismissed), &suggested)
        .unwrap();
    assert!(matches!(outcome, AnnotateOutcome::Cancelled));
    assert_eq!(*dismissed.offered.lock(), suggested);

    let new_dir = tmp.path().join("created");
    let host = Host::new(Some(new_dir.clone()));
    let outcome = written(
        env.engine
            .annotate_nullability(&field, Nullability::NotNull, Some(&host), &suggested)
            .unwrap(),
    );
    assert!(outcome.changed);
    assert!(new_dir.join("pkg").join("annotations.xml").is_file());
    assert_eq!(env.store.roots_for_owner(&OwnerId::new("lib")).len(), 1);
}

#[test]
fn host_picks_among_several_roots() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    let second_dir = tmp.path().join("second");
    let second = env
        .store
        .register_root(OwnerId::new("lib"), second_dir.clone(), true);
    let class = env.model.add_class("pkg", "C");
    let field = env.model.add_field(&class, "f");

    let host = Host::new(None);
    written(
        env.engine
            .annotate_nullability(&field, Nullability::Nullable, Some(&host), &[])
            .unwrap(),
    );
    assert!(second_dir.join("pkg").join("annotations.xml").is_file());
    assert_eq!(
        env.store.find(&second, "pkg", &nova_annotations::external_name(&field).unwrap()),
        vec![AnnotationRecord::new(NULLABLE)]
    );

    // Without a host the first registered root is used.
    let other = env.model.add_field(&class, "g");
    written(
        env.engine
            .annotate_nullability(&other, Nullability::Nullable, None, &[])
            .unwrap(),
    );
    assert_eq!(
        env.store
            .find(&env.root, "pkg", &nova_annotations::external_name(&other).unwrap()),
        vec![AnnotationRecord::new(NULLABLE)]
    );
}

#[test]
fn local_declarations_cannot_be_annotated() {
    let tmp = tempdir().unwrap();
    let env = env(tmp.path());
    let local = Declaration::new(
        DeclId::from_raw(4_242),
        DeclarationKind::Field {
            class: ClassRef::Local,
            name: "x".to_string(),
        },
    )
    .with_owner("lib");

    let err = env
        .engine
        .annotate_nullability(&local, Nullability::NotNull, None, &[])
        .unwrap_err();
    assert!(matches!(err, AnnotationsError::NoExternalName), "{err:?}");
}
