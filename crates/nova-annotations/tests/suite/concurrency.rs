use std::sync::Arc;
use std::thread;

use nova_annotations::{AnnotationRecord, ExternalName, PackageFile};
use tempfile::tempdir;

use super::store_with_root;

#[test]
fn concurrent_writers_to_one_package_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 20;

    let tmp = tempdir().unwrap();
    let (store, root) = store_with_root(tmp.path());
    let store = Arc::new(store);
    let start = store.tracker().stamp();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let root = Arc::clone(&root);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let name = ExternalName::from_raw(format!("pkg.C{t}#m{i}()"));
                    let outcome = store
                        .upsert(&root, "pkg", &name, AnnotationRecord::new("a.NonNull"))
                        .unwrap();
                    assert!(outcome.changed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let text = std::fs::read_to_string(root.package_path("pkg").unwrap()).unwrap();
    let file = PackageFile::parse(&text).unwrap();
    assert_eq!(file.items().len(), THREADS * PER_THREAD);
    assert!(file.is_sorted());
    assert_eq!(
        store.tracker().stamp().to_raw() - start.to_raw(),
        (THREADS * PER_THREAD) as u64
    );
}

#[test]
fn readers_see_either_old_or_new_contents() {
    let tmp = tempdir().unwrap();
    let (store, root) = store_with_root(tmp.path());
    let store = Arc::new(store);
    let name = ExternalName::from_raw("pkg.C");
    store
        .upsert(&root, "pkg", &name, AnnotationRecord::new("a.First"))
        .unwrap();

    let reader = {
        let store = Arc::clone(&store);
        let root = Arc::clone(&root);
        let name = name.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let found = store.find(&root, "pkg", &name);
                assert!(!found.is_empty());
                assert!(found.iter().any(|r| r.qualified_name == "a.First"));
            }
        })
    };

    for i in 0..50 {
        store
            .upsert(
                &root,
                "pkg",
                &name,
                AnnotationRecord::new("a.Second").with_attribute("n", i.to_string()),
            )
            .unwrap();
    }
    reader.join().unwrap();
}
