use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use taskflow::persistence::{KeyValueStore, MemoryStore, StorageError, TASKS_KEY};
use taskflow::{FetchOutcome, FetchStatus, Persistence, StoreError, Task, TaskStore};

/// Store whose reads can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk unplugged".to_string()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }
}

#[tokio::test]
async fn fetch_seeds_and_succeeds() {
    let mut store = TaskStore::new(Persistence::in_memory(), Duration::ZERO);
    assert_eq!(store.status(), FetchStatus::Idle);

    assert_eq!(store.fetch().await.unwrap(), FetchOutcome::Loaded);

    assert_eq!(store.status(), FetchStatus::Succeeded);
    assert_eq!(store.all_tasks().len(), 9);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn fetch_reseeds_corrupt_snapshot_and_persists_it() {
    let backend = Arc::new(MemoryStore::new());
    backend.set(TASKS_KEY, "%%%").unwrap();
    let persistence = Persistence::new(backend);

    let mut store = TaskStore::new(persistence.clone(), Duration::ZERO);
    store.fetch().await.unwrap();
    assert_eq!(store.all_tasks().len(), 9);

    let mut reloaded = TaskStore::new(persistence, Duration::ZERO);
    reloaded.load();
    assert_eq!(reloaded.all_tasks(), store.all_tasks());
}

#[tokio::test]
async fn failed_fetch_keeps_previous_tasks_and_records_error() {
    let backend = Arc::new(FlakyStore::default());
    let mut store = TaskStore::new(Persistence::new(backend.clone()), Duration::ZERO);
    store.fetch().await.unwrap();
    store.add(Task::new("mine", "keep me"));
    let before = store.all_tasks().to_vec();

    backend.fail_reads.store(true, Ordering::SeqCst);
    let err = store.fetch().await.unwrap_err();

    assert!(matches!(err, StoreError::FetchFailed(_)));
    assert_eq!(store.status(), FetchStatus::Failed);
    assert_eq!(store.all_tasks(), before.as_slice());
    assert!(store.error().unwrap().contains("disk unplugged"));

    // The notification is one-shot
    assert!(store.take_error().is_some());
    assert!(store.take_error().is_none());
}

#[tokio::test]
async fn overlapping_fetch_is_suppressed() {
    let mut store = TaskStore::new(Persistence::in_memory(), Duration::ZERO);

    let pending = store.begin_fetch().expect("first fetch starts");
    assert_eq!(store.status(), FetchStatus::Loading);
    assert!(store.begin_fetch().is_none());
    assert_eq!(store.fetch().await.unwrap(), FetchOutcome::AlreadyInFlight);

    // Mutations stay available while the fetch is in flight
    store.add(Task::new("early", "added while loading"));

    let outcome = pending.run().await;
    store.finish_fetch(outcome).unwrap();
    assert_eq!(store.status(), FetchStatus::Succeeded);
    assert!(store.begin_fetch().is_some());
}

#[tokio::test]
async fn fetch_waits_for_configured_latency() {
    let mut store = TaskStore::new(Persistence::in_memory(), Duration::from_millis(50));
    let started = std::time::Instant::now();

    store.fetch().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(store.status(), FetchStatus::Succeeded);
}

#[tokio::test]
async fn timed_out_fetch_does_not_wedge_later_fetches() {
    let mut store = TaskStore::new(Persistence::in_memory(), Duration::from_millis(200));

    let timed_out = tokio::time::timeout(Duration::from_millis(10), store.fetch()).await;
    assert!(timed_out.is_err());
    assert_eq!(store.status(), FetchStatus::Idle);

    assert_eq!(store.fetch().await.unwrap(), FetchOutcome::Loaded);
    assert_eq!(store.status(), FetchStatus::Succeeded);
    assert_eq!(store.all_tasks().len(), 9);
}

#[tokio::test]
async fn abandoned_fetch_restores_previous_status() {
    let mut store = TaskStore::new(Persistence::in_memory(), Duration::ZERO);
    store.fetch().await.unwrap();

    let pending = store.begin_fetch().expect("fetch starts");
    drop(pending);
    store.abandon_fetch();

    assert_eq!(store.status(), FetchStatus::Succeeded);
    assert!(store.begin_fetch().is_some());
}

#[test]
fn persist_failures_are_recorded_not_returned() {
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(Some("[]".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".to_string()))
        }
    }

    let mut store = TaskStore::new(Persistence::new(Arc::new(ReadOnlyStore)), Duration::ZERO);
    store.load();
    assert!(store.add(Task::new("a", "t")));

    assert_eq!(store.all_tasks().len(), 1);
    assert!(store.last_persist_error().unwrap().contains("read-only"));
}
