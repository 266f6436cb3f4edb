use super::{FileResourceStore, MemoryResourceStore, ResourceStore};
use crate::resource::{ResourceContent, ResourceType, ResourceUpdate};
use crate::testing::{self, put};
use std::collections::HashSet;
use tempfile::tempdir;
use uuid::Uuid;

async fn exercise_store(store: &dyn ResourceStore) {
    let a = put(store, testing::link("a")).await;
    let mut tagged = testing::link("b");
    tagged.tags = vec!["chem".into()];
    let b = put(store, tagged).await;
    let root = put(
        store,
        testing::container(ResourceType::CollectionRoot, "root", vec![a, b]),
    )
    .await;

    // batch reads drop unknown ids and collapse duplicates
    let found = store.get_by_ids(&[b, a, b, Uuid::new_v4()]).await.unwrap();
    let ids: HashSet<Uuid> = found.iter().map(|r| r.id).collect();
    assert_eq!(found.len(), 2);
    assert_eq!(ids, HashSet::from([a, b]));

    let parents = store.get_parents(a).await.unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, root);

    let roots = store.get_collection_roots().await.unwrap();
    assert_eq!(roots.iter().map(|r| r.id).collect::<Vec<_>>(), vec![root]);

    let by_tag = store.get_by_tag("chem").await.unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, b);
    assert_eq!(store.get_by_type(ResourceType::Url).await.unwrap().len(), 2);

    let updated = store
        .update_by_id(
            root,
            ResourceUpdate {
                label: Some("renamed".into()),
                content: Some(ResourceContent::children_of(vec![b])),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, root);
    assert_eq!(updated.label, "renamed");
    assert!(store.get_parents(a).await.unwrap().is_empty());
    assert!(store
        .update_by_id(Uuid::new_v4(), ResourceUpdate::default())
        .await
        .unwrap()
        .is_none());

    assert_eq!(store.delete_by_id(a).await.unwrap(), 1);
    assert_eq!(store.delete_by_id(a).await.unwrap(), 0);
    assert!(store.get_by_id(a).await.unwrap().is_none());
    assert_eq!(store.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn memory_store_contract() {
    let store = MemoryResourceStore::new();
    exercise_store(&store).await;
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn file_store_contract() {
    let dir = tempdir().unwrap();
    let store = FileResourceStore::new(dir.path()).unwrap();
    exercise_store(&store).await;
}

#[tokio::test]
async fn smart_quiz_counts_as_parent() {
    let store = MemoryResourceStore::new();
    let q = put(&store, testing::question("q", true)).await;
    let mut quiz = testing::smart_quiz("quiz", 1);
    quiz.content.set_children(vec![q]);
    let quiz = put(&store, quiz).await;
    let parents = store.get_parents(q).await.unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, quiz);

    let chem = put(
        &store,
        testing::container(ResourceType::QuizUqChem, "chem", vec![q]),
    )
    .await;
    let ids: HashSet<Uuid> = store
        .get_parents(q)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, HashSet::from([quiz, chem]));
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let (root, gone) = {
        let store = FileResourceStore::new(dir.path()).unwrap();
        let gone = put(&store, testing::link("gone")).await;
        let child = put(&store, testing::hidden(testing::link("kept"))).await;
        let root = put(
            &store,
            testing::container(ResourceType::CollectionRoot, "root", vec![child]),
        )
        .await;
        store.delete_by_id(gone).await.unwrap();
        (root, gone)
    };
    assert!(!dir.path().join(format!("{}.json", gone)).exists());

    let reopened = FileResourceStore::new(dir.path()).unwrap();
    assert_eq!(reopened.all().await.unwrap().len(), 2);
    let root = reopened.get_by_id(root).await.unwrap().unwrap();
    let child = root.content.children().unwrap()[0];
    let child = reopened.get_by_id(child).await.unwrap().unwrap();
    assert!(child.permissions.auth.unwrap().internal.unwrap().hidden);
}

#[tokio::test]
async fn file_store_skips_unreadable_documents() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    let store = FileResourceStore::new(dir.path()).unwrap();
    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(store.data_dir(), dir.path());
}

// Swap the document for a directory so writes and removals of it fail.
fn jam(dir: &std::path::Path, id: Uuid) {
    let path = dir.join(format!("{}.json", id));
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
}

#[tokio::test]
async fn failed_update_keeps_previous_document() {
    let dir = tempdir().unwrap();
    let store = FileResourceStore::new(dir.path()).unwrap();
    let id = put(&store, testing::link("before")).await;
    jam(dir.path(), id);

    let result = store
        .update_by_id(
            id,
            ResourceUpdate {
                label: Some("after".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());
    assert_eq!(store.get_by_id(id).await.unwrap().unwrap().label, "before");
}

#[tokio::test]
async fn failed_delete_keeps_document() {
    let dir = tempdir().unwrap();
    let store = FileResourceStore::new(dir.path()).unwrap();
    let id = put(&store, testing::link("kept")).await;
    jam(dir.path(), id);

    assert!(store.delete_by_id(id).await.is_err());
    assert!(store.get_by_id(id).await.unwrap().is_some());
}
