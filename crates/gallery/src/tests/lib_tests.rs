use super::*;

fn one_hot(hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[hot] = 1.0;
    v
}

#[tokio::test]
async fn stores_and_loads_entries_in_insertion_order() {
    let store = GalleryStore::new("sqlite::memory:").await.expect("db");
    let first = store
        .insert_entry("Rex", "/static/Rex/0.jpg", &one_hot(0))
        .await
        .expect("insert");
    let second = store
        .insert_entry("Ada", "/static/Ada/0.jpg", &one_hot(1))
        .await
        .expect("insert");
    assert!(second.0 > first.0);

    let entries = store.load_entries().await.expect("load");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "Rex");
    assert_eq!(entries[0].photo_url, "/static/Rex/0.jpg");
    assert_eq!(entries[0].embedding, one_hot(0));
    assert_eq!(entries[1].name, "Ada");
    assert_eq!(entries[1].embedding, one_hot(1));
}

#[tokio::test]
async fn rejects_embeddings_of_the_wrong_dimension() {
    let store = GalleryStore::new("sqlite::memory:").await.expect("db");
    let err = store
        .insert_entry("Rex", "/static/Rex/0.jpg", &[1.0, 0.0])
        .await
        .expect_err("dimension check");
    assert!(err.to_string().contains("dimensions"));
}

#[tokio::test]
async fn counts_entries() {
    let store = GalleryStore::new("sqlite::memory:").await.expect("db");
    assert_eq!(store.count().await.expect("count"), 0);
    store
        .insert_entry("Rex", "/static/Rex/0.jpg", &one_hot(0))
        .await
        .expect("insert");
    assert_eq!(store.count().await.expect("count"), 1);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = GalleryStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("gallery.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = GalleryStore::new(&database_url).await.expect("db");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn embedding_blob_round_trips() {
    let original = vec![0.0_f32, -1.5, 3.25, f32::MIN_POSITIVE];
    let decoded = decode_embedding(&encode_embedding(&original)).expect("decode");
    assert_eq!(decoded, original);
}

#[test]
fn truncated_embedding_blob_is_rejected() {
    assert!(decode_embedding(&[0, 1, 2]).is_err());
}

#[test]
fn search_returns_descending_scores_capped_at_top_k() {
    let mut index = FlatIpIndex::new(2);
    for (name, vector) in [
        ("low", [0.1, 0.0]),
        ("high", [1.0, 0.0]),
        ("mid", [0.5, 0.0]),
    ] {
        index
            .insert(
                IndexEntry {
                    name: name.into(),
                    photo_url: format!("/static/{name}/0.jpg"),
                },
                &vector,
            )
            .expect("insert");
    }

    let results = index.search(&[1.0, 0.0], 2, 0.0);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "high");
    assert_eq!(results[1].name, "mid");
    assert!(results[0].score > results[1].score);
}

#[test]
fn search_drops_entries_below_the_score_floor() {
    let mut index = FlatIpIndex::new(2);
    index
        .insert(
            IndexEntry {
                name: "near".into(),
                photo_url: "a.jpg".into(),
            },
            &[1.0, 0.0],
        )
        .expect("insert");
    index
        .insert(
            IndexEntry {
                name: "far".into(),
                photo_url: "b.jpg".into(),
            },
            &[0.0, 1.0],
        )
        .expect("insert");

    let results = index.search(&[1.0, 0.0], 10, 0.5);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "near");
}

#[test]
fn tied_scores_keep_insertion_order() {
    let mut index = FlatIpIndex::new(2);
    for name in ["first", "second"] {
        index
            .insert(
                IndexEntry {
                    name: name.into(),
                    photo_url: format!("{name}.jpg"),
                },
                &[1.0, 0.0],
            )
            .expect("insert");
    }

    let results = index.search(&[1.0, 0.0], 2, 0.0);
    assert_eq!(results[0].name, "first");
    assert_eq!(results[1].name, "second");
}

#[test]
fn mismatched_query_dimension_yields_no_results() {
    let mut index = FlatIpIndex::new(2);
    index
        .insert(
            IndexEntry {
                name: "only".into(),
                photo_url: "only.jpg".into(),
            },
            &[1.0, 0.0],
        )
        .expect("insert");
    assert!(index.search(&[1.0, 0.0, 0.0], 1, 0.0).is_empty());
}

#[test]
fn empty_index_yields_no_results() {
    let index = FlatIpIndex::new(2);
    assert!(index.is_empty());
    assert!(index.search(&[1.0, 0.0], 3, 0.0).is_empty());
}

#[tokio::test]
async fn index_builds_from_stored_entries() {
    let store = GalleryStore::new("sqlite::memory:").await.expect("db");
    store
        .insert_entry("Rex", "/static/Rex/0.jpg", &one_hot(4))
        .await
        .expect("insert");
    let entries = store.load_entries().await.expect("load");

    let index = FlatIpIndex::from_entries(EMBEDDING_DIM, entries).expect("index");
    assert_eq!(index.len(), 1);
    let results = index.search(&one_hot(4), 3, 0.0);
    assert_eq!(results[0].name, "Rex");
    assert!((results[0].score - 1.0).abs() < f32::EPSILON);
}
