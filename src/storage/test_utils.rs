use super::{MemoryStore, Persistence};
use crate::clock::{FixedClock, SequentialIds};
use crate::models::{Priority, Todo, TodoList};
use crate::notify::RecordingNotifier;
use crate::store::StoreContext;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// A persistence layer over a fresh memory backend, plus a handle to the
/// backend for poking at raw entries.
pub fn memory_persistence() -> (Persistence, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let persistence = Persistence::new(Box::new(Arc::clone(&backend)));
    (persistence, backend)
}

pub struct TestContext {
    pub context: StoreContext,
    pub backend: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Deterministic ids and clock over a shared memory backend.
pub fn test_context() -> TestContext {
    test_context_on(Arc::new(MemoryStore::new()))
}

/// A second context over the same backend, as a reloaded session would see.
pub fn test_context_on(backend: Arc<MemoryStore>) -> TestContext {
    let notifier = Arc::new(RecordingNotifier::new());
    let context = StoreContext::new(Persistence::new(Box::new(Arc::clone(&backend))))
        .with_notifier(notifier.clone())
        .with_ids(Arc::new(SequentialIds::new()))
        .with_clock(Arc::new(FixedClock::new(epoch())));

    TestContext {
        context,
        backend,
        notifier,
    }
}

pub fn sample_list(n: u128, name: &str) -> TodoList {
    TodoList::new(Uuid::from_u128(n), name, epoch()).expect("valid list")
}

pub fn sample_todo(n: u128, list: u128, title: &str) -> Todo {
    Todo::new(
        Uuid::from_u128(n),
        Uuid::from_u128(list),
        title,
        None,
        Priority::None,
        epoch(),
    )
    .expect("valid todo")
}
