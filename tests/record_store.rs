// tests/record_store.rs

mod common;
use crate::common::init_tracing;

use std::path::Path;
use std::sync::Arc;

use runwatch::fs::mock::MockFileSystem;
use runwatch::store::{record_key, FileRecordStore, LastRunRecord, RecordStore, STORE_NAMESPACE};

fn record(passed: u64, failed: u64) -> LastRunRecord {
    LastRunRecord {
        timestamp_ms: 1_700_000_000_000,
        passed,
        failed,
        skipped: 0,
        duration_ms: 1234,
        task_name: Some("e2e".to_string()),
    }
}

#[test]
fn key_is_namespaced_per_workspace_and_task() {
    init_tracing();

    let key = record_key(Path::new("/home/dev/shop"), "e2e");
    assert_eq!(key, format!("{STORE_NAMESPACE}./home/dev/shop.e2e"));
}

#[test]
fn put_then_get_roundtrips() {
    init_tracing();

    let fs = MockFileSystem::new();
    let store = FileRecordStore::new("/state/last-runs.json", Arc::new(fs));

    let key = record_key(Path::new("/ws"), "e2e");
    assert!(store.get(&key).is_none());

    store.put(&key, &record(3, 1)).expect("put");
    assert_eq!(store.get(&key), Some(record(3, 1)));
}

#[test]
fn put_overwrites_last_write_wins() {
    init_tracing();

    let fs = MockFileSystem::new();
    let store = FileRecordStore::new("/state/last-runs.json", Arc::new(fs));

    let key = record_key(Path::new("/ws"), "e2e");
    store.put(&key, &record(3, 1)).expect("first put");
    store.put(&key, &record(4, 0)).expect("second put");

    assert_eq!(store.get(&key), Some(record(4, 0)));
}

#[test]
fn records_for_different_tasks_coexist() {
    init_tracing();

    let fs = MockFileSystem::new();
    let store = FileRecordStore::new("/state/last-runs.json", Arc::new(fs));

    let key_a = record_key(Path::new("/ws"), "a");
    let key_b = record_key(Path::new("/ws"), "b");
    store.put(&key_a, &record(1, 0)).expect("put a");
    store.put(&key_b, &record(0, 2)).expect("put b");

    assert_eq!(store.get(&key_a), Some(record(1, 0)));
    assert_eq!(store.get(&key_b), Some(record(0, 2)));
}

/// The store survives a "restart": a fresh handle over the same backing
/// file sees earlier writes.
#[test]
fn records_survive_reopening() {
    init_tracing();

    let fs = Arc::new(MockFileSystem::new());
    let key = record_key(Path::new("/ws"), "e2e");

    {
        let store = FileRecordStore::new("/state/last-runs.json", fs.clone());
        store.put(&key, &record(5, 0)).expect("put");
    }

    let reopened = FileRecordStore::new("/state/last-runs.json", fs);
    assert_eq!(reopened.get(&key), Some(record(5, 0)));
}

/// An unreadable store file degrades to an empty map instead of failing.
#[test]
fn corrupt_store_file_starts_fresh() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/state/last-runs.json", "not json");
    let store = FileRecordStore::new("/state/last-runs.json", Arc::new(fs));

    let key = record_key(Path::new("/ws"), "e2e");
    assert!(store.get(&key).is_none());
    store.put(&key, &record(1, 0)).expect("put repairs the file");
    assert_eq!(store.get(&key), Some(record(1, 0)));
}
