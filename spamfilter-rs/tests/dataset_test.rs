//! Integration tests for the labelled dataset

use spamfilter_rs::config::DatasetConfig;
use spamfilter_rs::dataset::{
    export_jsonl, import_jsonl, DatasetStore, DatasetUpdater, LabelSource, SqliteDatasetStore,
    UpsertOutcome,
};
use std::sync::Arc;

async fn setup_store(url: &str) -> Arc<SqliteDatasetStore> {
    let pool = spamfilter_rs::db::connect(url).await.unwrap();
    let store = SqliteDatasetStore::new(pool);
    store.init_db().await.unwrap();
    Arc::new(store)
}

fn updater(store: Arc<SqliteDatasetStore>) -> DatasetUpdater {
    DatasetUpdater::new(store, &DatasetConfig::default())
}

#[tokio::test]
async fn test_repeated_upsert_is_idempotent() {
    let store = setup_store("sqlite::memory:").await;
    let updater = updater(Arc::clone(&store));

    for _ in 0..3 {
        updater
            .upsert("buy now!!!", true, LabelSource::Moderator)
            .await
            .unwrap();
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.spam, 1);
}

#[tokio::test]
async fn test_moderator_overwrites_label() {
    let store = setup_store("sqlite::memory:").await;
    let updater = updater(Arc::clone(&store));

    updater
        .upsert("great answer, see my site", true, LabelSource::Classifier)
        .await
        .unwrap();
    let outcome = updater
        .record_correction("great answer, see my site", true, false, LabelSource::Moderator)
        .await
        .unwrap();
    assert_eq!(outcome, Some(UpsertOutcome::Updated));

    let stored = store.get("great answer, see my site").await.unwrap().unwrap();
    assert!(!stored.is_spam);
    assert_eq!(stored.source, LabelSource::Moderator);
    assert_eq!(store.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn test_unchanged_correction_writes_nothing() {
    let store = setup_store("sqlite::memory:").await;
    let updater = updater(Arc::clone(&store));

    let outcome = updater
        .record_correction("how do I invert a matrix?", false, false, LabelSource::Author)
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(store.get("how do I invert a matrix?").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_upserts_same_text() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("dataset.db").display());
    let store = setup_store(&url).await;
    let updater = Arc::new(updater(Arc::clone(&store)));

    let mut handles = Vec::new();
    for i in 0..20 {
        let updater = Arc::clone(&updater);
        handles.push(tokio::spawn(async move {
            updater
                .upsert("limited offer, click here", i % 2 == 0, LabelSource::Moderator)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // One row, whichever write landed last
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.spam + stats.ham, 1);
    assert_eq!(updater.pending_writes(), 0);
}

#[tokio::test]
async fn test_concurrent_upserts_distinct_texts() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("dataset.db").display());
    let store = setup_store(&url).await;
    let updater = Arc::new(updater(Arc::clone(&store)));

    let mut handles = Vec::new();
    for i in 0..16 {
        let updater = Arc::clone(&updater);
        handles.push(tokio::spawn(async move {
            updater
                .upsert(&format!("question number {}", i), false, LabelSource::Author)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.stats().await.unwrap().total, 16);
}

#[tokio::test]
async fn test_export_then_import_into_fresh_store() {
    let source = setup_store("sqlite::memory:").await;
    let source_updater = updater(Arc::clone(&source));
    source_updater
        .upsert("buy now!!!", true, LabelSource::Import)
        .await
        .unwrap();
    source_updater
        .upsert("thanks for the tip", false, LabelSource::Import)
        .await
        .unwrap();

    let mut buffer = Vec::new();
    let written = export_jsonl(source.as_ref(), &mut buffer).await.unwrap();
    assert_eq!(written, 2);

    let target = setup_store("sqlite::memory:").await;
    let target_updater = updater(Arc::clone(&target));
    let summary = import_jsonl(&target_updater, buffer.as_slice()).await.unwrap();
    assert_eq!(summary.inserted, 2);

    let stored = target.get("buy now!!!").await.unwrap().unwrap();
    assert!(stored.is_spam);
    assert_eq!(stored.source, LabelSource::Import);
}
