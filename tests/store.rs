use std::collections::HashSet;

use futures_util::future::join_all;
use markerboard::config::App;
use markerboard::db::Database;
use markerboard::error::StoreError;
use markerboard::markers::MarkerStore;
use markerboard::model::NewMarker;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Collects formatted log output so tests can inspect it.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

fn new_marker(name: &str, lat: f64, lng: f64) -> NewMarker {
    NewMarker {
        name: name.to_owned(),
        lat,
        lng,
        marker_type: Some("🍽️".to_owned()),
    }
}

#[tokio::test]
async fn connection_is_opened_lazily_once() {
    let db = Database::in_memory();
    assert!(!db.is_connected());

    db.connection().await.unwrap();
    db.connection().await.unwrap();

    assert!(db.is_connected());
    assert_eq!(db.connections_opened(), 1);
}

#[tokio::test]
async fn create_assigns_id_and_lists_it() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());

    let created = store.create(new_marker("Dinner", 40.5, -73.25)).await.unwrap();
    assert!(!created.id.is_empty());
    assert_ne!(created.id, "40.5");
    assert_ne!(created.id, "-73.25");

    let markers = store.list().await.unwrap();
    assert_eq!(markers, vec![created]);
}

#[tokio::test]
async fn list_keeps_insertion_order_and_allows_duplicates() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());

    let a = store.create(new_marker("same", 1.0, 1.0)).await.unwrap();
    let b = store.create(new_marker("same", 1.0, 1.0)).await.unwrap();
    let c = store.create(new_marker("other", 2.0, 2.0)).await.unwrap();

    let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

#[tokio::test]
async fn update_position_changes_only_coordinates() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());
    let created = store.create(new_marker("Park", 10.0, 20.0)).await.unwrap();

    store.update_position(&created.id, 1.0, 2.0).await.unwrap();

    let markers = store.list().await.unwrap();
    assert_eq!(markers.len(), 1);
    let moved = &markers[0];
    assert_eq!(moved.id, created.id);
    assert_eq!(moved.name, "Park");
    assert_eq!(moved.marker_type, created.marker_type);
    assert_eq!((moved.lat, moved.lng), (1.0, 2.0));
}

#[tokio::test]
async fn update_unknown_id_is_not_found_and_leaves_others() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());
    let kept = store.create(new_marker("kept", 5.0, 6.0)).await.unwrap();

    let err = store.update_position("does-not-exist", 0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref id) if id == "does-not-exist"));

    assert_eq!(store.list().await.unwrap(), vec![kept]);
}

#[tokio::test]
async fn delete_twice_fails_second_time() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());
    let created = store.create(new_marker("gone", 0.0, 0.0)).await.unwrap();

    store.delete(&created.id).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());

    let err = store.delete(&created.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn untyped_markers_round_trip_without_type() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());
    let mut input = new_marker("plain", 3.0, 4.0);
    input.marker_type = None;

    store.create(input).await.unwrap();
    assert_eq!(store.list().await.unwrap()[0].marker_type, None);
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let db = Database::in_memory();

    let creates = (0..50).map(|i| {
        let db = &db;
        async move {
            let store = MarkerStore::new(db.connection().await?);
            store.create(new_marker(&format!("m{i}"), i as f64, -(i as f64))).await
        }
    });
    let created: Vec<_> = join_all(creates).await.into_iter().collect::<Result<_, _>>().unwrap();

    let ids: HashSet<_> = created.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids.len(), 50);
    assert_eq!(db.connections_opened(), 1);

    let store = MarkerStore::new(db.connection().await.unwrap());
    let listed: HashSet<_> = store.list().await.unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn unreachable_database_surfaces_connect_error() {
    let app = App::default().with_database("missing/markers.db");
    let db = Database::new(&app, Path::new("/nonexistent-markerboard"));

    let err = db.connection().await.err().unwrap();
    assert!(matches!(err, StoreError::Connect(_)));
    assert!(!db.is_connected());
}

#[tokio::test]
async fn shutdown_closes_the_store() {
    let db = Database::in_memory();
    db.connection().await.unwrap();

    db.shutdown().await.unwrap();
    db.shutdown().await.unwrap();

    assert!(matches!(db.connection().await, Err(StoreError::Closed)));
}

#[tokio::test]
async fn failed_mutations_log_marker_fields() {
    let db = Database::in_memory();
    let store = MarkerStore::new(db.connection().await.unwrap());

    let (logs, _guard) = capture_logs();
    store.update_position("ghost", 1.5, 2.5).await.unwrap_err();
    store.delete("phantom").await.unwrap_err();

    let out = logs.contents();
    let update_line = out
        .lines()
        .find(|l| l.contains("failed to update marker position"))
        .expect("update failure is logged");
    assert!(update_line.contains(r#""level":"ERROR""#));
    assert!(update_line.contains(r#""marker_id":"ghost""#));
    assert!(update_line.contains(r#""lat":1.5"#));
    assert!(update_line.contains(r#""lng":2.5"#));
    assert!(update_line.contains("marker not found: ghost"));

    let delete_line = out
        .lines()
        .find(|l| l.contains("failed to delete marker"))
        .expect("delete failure is logged");
    assert!(delete_line.contains(r#""marker_id":"phantom""#));
}
