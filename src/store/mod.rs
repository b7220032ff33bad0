//! In-memory authoritative state for a session, written through to
//! [`Persistence`] after every mutation.

use crate::clock::{Clock, IdGenerator, RandomIds, SystemClock};
use crate::notify::{LogNotifier, Notifier};
use crate::storage::Persistence;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

mod list_store;
mod session;
mod todo_store;

pub use list_store::ListStore;
pub use session::{ListDeletion, Session, StartupPolicy};
pub use todo_store::TodoStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Stored data is corrupted ({0}); reset storage to continue")]
    StorageLocked(String),
}

/// Whether the in-memory state has been written durably. A failed write
/// leaves the mutation applied in memory and the store `Unsynced` until the
/// next successful write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Synced,
    Unsynced { reason: String },
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    /// The first unsynced status wins.
    pub fn or(self, other: SyncStatus) -> SyncStatus {
        match self {
            SyncStatus::Synced => other,
            unsynced => unsynced,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Synced => f.write_str("synced"),
            SyncStatus::Unsynced { reason } => write!(f, "unsynced: {reason}"),
        }
    }
}

/// Everything a store needs from outside: durable storage, a place to send
/// notifications, and the id and time sources.
#[derive(Clone)]
pub struct StoreContext {
    persistence: Arc<Persistence>,
    notifier: Arc<dyn Notifier>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl StoreContext {
    pub fn new(persistence: Persistence) -> Self {
        Self {
            persistence: Arc::new(persistence),
            notifier: Arc::new(LogNotifier),
            ids: Arc::new(RandomIds),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        &*self.ids
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }
}
