use super::{BackendError, KeyValueStore, LoadError, StorageWriteError, ValidationError};
use crate::models::{Todo, TodoList};
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub const LISTS_KEY: &str = "todo-app-lists";
pub const SELECTED_LIST_KEY: &str = "todo-app-selected-list";
pub const TODOS_KEY: &str = "todo-app-todos";

/// Validated load and save of the three stored values on top of a raw
/// key-value backend.
pub struct Persistence {
    backend: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        &*self.backend
    }

    /// An absent or empty entry is an empty collection. Anything else must
    /// parse and every record must pass its field rules, or nothing loads.
    pub fn load_lists(&self) -> Result<Vec<TodoList>, LoadError> {
        let lists: Vec<TodoList> = self.load_collection(LISTS_KEY)?;
        for (index, list) in lists.iter().enumerate() {
            list.validate().map_err(|source| {
                let err = ValidationError::InvalidList {
                    key: LISTS_KEY,
                    index,
                    source,
                };
                error!("event=storage_load key={} status=invalid error={}", LISTS_KEY, err);
                err
            })?;
        }
        debug!("event=storage_load key={} status=ok count={}", LISTS_KEY, lists.len());
        Ok(lists)
    }

    pub fn save_lists(&self, lists: &[TodoList]) -> Result<(), StorageWriteError> {
        self.save_collection(LISTS_KEY, lists)
    }

    /// The stored value is opaque here; it is reconciled against the loaded
    /// lists by the caller.
    pub fn load_selected_list_id(&self) -> Result<Option<String>, LoadError> {
        let raw = self.read(SELECTED_LIST_KEY)?;
        Ok(raw.filter(|id| !id.is_empty()))
    }

    /// `None` removes the entry.
    pub fn save_selected_list_id(&self, id: Option<Uuid>) -> Result<(), StorageWriteError> {
        let result = match id {
            Some(id) => self.backend.set(SELECTED_LIST_KEY, &id.to_string()),
            None => self.backend.remove(SELECTED_LIST_KEY),
        };
        result.map_err(|source| write_error(SELECTED_LIST_KEY, source))
    }

    pub fn load_todos(&self) -> Result<Vec<Todo>, LoadError> {
        let todos: Vec<Todo> = self.load_collection(TODOS_KEY)?;
        for (index, todo) in todos.iter().enumerate() {
            todo.validate().map_err(|source| {
                let err = ValidationError::InvalidTodo {
                    key: TODOS_KEY,
                    index,
                    source,
                };
                error!("event=storage_load key={} status=invalid error={}", TODOS_KEY, err);
                err
            })?;
        }
        debug!("event=storage_load key={} status=ok count={}", TODOS_KEY, todos.len());
        Ok(todos)
    }

    pub fn save_todos(&self, todos: &[Todo]) -> Result<(), StorageWriteError> {
        self.save_collection(TODOS_KEY, todos)
    }

    /// Best effort: every key is attempted and failures are only logged. If
    /// a key cannot be removed, typically because the backing container no
    /// longer parses, the whole backend is cleared instead.
    pub fn reset_storage(&self) {
        let mut failed = false;
        for key in [LISTS_KEY, SELECTED_LIST_KEY, TODOS_KEY] {
            if let Err(e) = self.backend.remove(key) {
                warn!("event=storage_reset key={} status=error error={}", key, e);
                failed = true;
            }
        }
        if failed {
            if let Err(e) = self.backend.clear() {
                error!("event=storage_reset status=error action=clear error={}", e);
                return;
            }
            warn!("event=storage_reset status=ok action=clear");
            return;
        }
        debug!("event=storage_reset status=ok");
    }

    fn read(&self, key: &'static str) -> Result<Option<String>, LoadError> {
        self.backend.get(key).map_err(|source| {
            error!("event=storage_read key={} status=error error={}", key, source);
            LoadError::Read { key, source }
        })
    }

    fn load_collection<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>, LoadError> {
        let raw = match self.read(key)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        serde_json::from_str(&raw).map_err(|source| {
            error!("event=storage_load key={} status=malformed error={}", key, source);
            LoadError::Validation(ValidationError::Malformed { key, source })
        })
    }

    fn save_collection<T: Serialize>(
        &self,
        key: &'static str,
        records: &[T],
    ) -> Result<(), StorageWriteError> {
        let json = serde_json::to_string(records).map_err(|e| write_error(key, e.into()))?;
        self.backend
            .set(key, &json)
            .map_err(|source| write_error(key, source))?;
        debug!("event=storage_save key={} status=ok count={}", key, records.len());
        Ok(())
    }
}

fn write_error(key: &'static str, source: BackendError) -> StorageWriteError {
    warn!("event=storage_save key={} status=error error={}", key, source);
    StorageWriteError { key, source }
}
