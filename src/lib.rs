//! Local todo lists: named lists of tasks persisted to a durable key-value
//! store, with schema validation on load.

pub mod clock;
pub mod config;
pub mod logging;
pub mod models;
pub mod notify;
pub mod storage;
pub mod store;

pub use models::{ListError, Priority, Todo, TodoChanges, TodoError, TodoList};
pub use store::{Session, StartupPolicy, StoreContext, StoreError, SyncStatus};
