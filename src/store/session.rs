use super::{ListStore, StoreContext, StoreError, SyncStatus, TodoStore};
use crate::models::{Priority, Todo, TodoChanges, TodoList, TodoView};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

/// What to do when the todo collection fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupPolicy {
    /// A corrupt todo collection locks the session exactly like corrupt lists.
    #[default]
    Symmetric,
    /// Only the lists gate the storage-error state; unreadable todos are
    /// logged and the session starts with none.
    ListsOnly,
}

impl StartupPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            StartupPolicy::Symmetric => "lock",
            StartupPolicy::ListsOnly => "ignore",
        }
    }
}

impl FromStr for StartupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock" => Ok(StartupPolicy::Symmetric),
            "ignore" => Ok(StartupPolicy::ListsOnly),
            other => Err(format!("expected `lock` or `ignore`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDeletion {
    pub list: TodoList,
    pub todos_removed: usize,
}

/// One user session: both stores over the same storage, with the
/// cross-collection operations (cascade delete, orphan pruning, reset) that
/// neither store can do alone.
pub struct Session {
    lists: ListStore,
    todos: TodoStore,
}

impl Session {
    pub fn open(context: StoreContext, policy: StartupPolicy) -> Self {
        let mut lists = ListStore::open(context.clone());
        let todos = match TodoStore::open(context.clone()) {
            Ok(todos) => todos,
            Err(e) => {
                match policy {
                    StartupPolicy::Symmetric if !lists.has_storage_error() => {
                        lists.enter_storage_error(e.to_string());
                    }
                    StartupPolicy::Symmetric => {}
                    StartupPolicy::ListsOnly => {
                        warn!("event=todos_open status=ignored error={}", e);
                    }
                }
                TodoStore::empty(context)
            }
        };

        let session = Self { lists, todos };
        if !session.has_storage_error() {
            let orphans = session.orphaned_todos().len();
            if orphans > 0 {
                warn!("event=session_open status=orphans count={}", orphans);
            }
        }
        info!(
            "event=session_open status={} lists={} todos={}",
            if session.has_storage_error() { "storage_error" } else { "ok" },
            session.lists.lists().len(),
            session.todos.todos().len()
        );
        session
    }

    pub fn list_store(&self) -> &ListStore {
        &self.lists
    }

    pub fn todo_store(&self) -> &TodoStore {
        &self.todos
    }

    pub fn has_storage_error(&self) -> bool {
        self.lists.has_storage_error()
    }

    pub fn storage_error(&self) -> Option<&str> {
        self.lists.storage_error()
    }

    /// Unsynced if either store's last write failed.
    pub fn sync_status(&self) -> SyncStatus {
        self.lists
            .sync_status()
            .clone()
            .or(self.todos.sync_status().clone())
    }

    pub fn lists(&self) -> &[TodoList] {
        self.lists.lists()
    }

    pub fn selected_list_id(&self) -> Option<Uuid> {
        self.lists.selected_list_id()
    }

    pub fn selected_list(&self) -> Option<&TodoList> {
        self.lists.selected_list()
    }

    pub fn todos(&self) -> &[Todo] {
        self.todos.todos()
    }

    pub fn todos_for_list(&self, list_id: Uuid) -> Vec<&Todo> {
        self.todos.todos_for_list(list_id)
    }

    pub fn view_for_list(&self, list_id: Uuid) -> TodoView<'_> {
        self.todos.view_for_list(list_id)
    }

    pub fn create_list(&mut self, name: &str) -> Result<Option<TodoList>, StoreError> {
        self.lists.create_list(name)
    }

    pub fn rename_list(&mut self, id: Uuid, new_name: &str) -> Result<bool, StoreError> {
        self.lists.rename_list(id, new_name)
    }

    /// Deletes the list and its todos. The two collections are written one
    /// after the other; if the second write fails the todos are gone from
    /// memory but still on disk, and the session reports `Unsynced`.
    pub fn delete_list(&mut self, id: Uuid) -> Result<Option<ListDeletion>, StoreError> {
        let Some(list) = self.lists.delete_list(id)? else {
            return Ok(None);
        };
        let todos_removed = self.todos.delete_todos_for_list(id);
        Ok(Some(ListDeletion {
            list,
            todos_removed,
        }))
    }

    pub fn select_list(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.lists.select_list(id)
    }

    /// Unlike [`TodoStore::create_todo`], refuses to create a todo for a list
    /// that does not exist.
    pub fn create_todo(
        &mut self,
        list_id: Uuid,
        title: &str,
        due_date: Option<NaiveDate>,
        priority: Priority,
    ) -> Result<Option<Todo>, StoreError> {
        self.ensure_available()?;
        if self.lists.list(list_id).is_none() {
            warn!("event=todo_create status=ignored reason=unknown_list list_id={}", list_id);
            return Ok(None);
        }
        Ok(self.todos.create_todo(list_id, title, due_date, priority))
    }

    pub fn update_todo(&mut self, id: Uuid, changes: &TodoChanges) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.todos.update_todo(id, changes))
    }

    pub fn delete_todo(&mut self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        self.ensure_available()?;
        Ok(self.todos.delete_todo(id))
    }

    /// Todos whose list no longer exists, e.g. left behind by a cascade
    /// whose second write failed.
    pub fn orphaned_todos(&self) -> Vec<&Todo> {
        let known = self.known_list_ids();
        self.todos
            .todos()
            .iter()
            .filter(|t| !known.contains(&t.list_id))
            .collect()
    }

    pub fn prune_orphans(&mut self) -> Result<usize, StoreError> {
        self.ensure_available()?;
        let known = self.known_list_ids();
        let removed = self.todos.delete_where(|t| !known.contains(&t.list_id));
        if removed > 0 {
            info!("event=prune_orphans status=ok count={}", removed);
        }
        Ok(removed)
    }

    /// Wipes durable storage and both in-memory collections.
    pub fn reset(&mut self) {
        self.lists.handle_reset();
        self.todos.clear();
        info!("event=session_reset status=ok");
    }

    fn known_list_ids(&self) -> HashSet<Uuid> {
        self.lists.lists().iter().map(|l| l.id).collect()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        match self.lists.storage_error() {
            Some(reason) => Err(StoreError::StorageLocked(reason.to_string())),
            None => Ok(()),
        }
    }
}
