use super::{StoreContext, SyncStatus};
use crate::models::{Priority, Todo, TodoChanges, TodoView};
use crate::notify::SAVE_TODOS_FAILED;
use crate::storage::LoadError;
use chrono::NaiveDate;
use log::debug;
use uuid::Uuid;

pub struct TodoStore {
    context: StoreContext,
    todos: Vec<Todo>,
    sync: SyncStatus,
}

impl TodoStore {
    pub fn open(context: StoreContext) -> Result<Self, LoadError> {
        let todos = context.persistence().load_todos()?;
        Ok(Self {
            context,
            todos,
            sync: SyncStatus::Synced,
        })
    }

    pub fn empty(context: StoreContext) -> Self {
        Self {
            context,
            todos: Vec::new(),
            sync: SyncStatus::Synced,
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn todo(&self, id: Uuid) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn todos_for_list(&self, list_id: Uuid) -> Vec<&Todo> {
        self.todos.iter().filter(|t| t.list_id == list_id).collect()
    }

    /// The list's todos split into sorted active and completed, as of the
    /// clock's today.
    pub fn view_for_list(&self, list_id: Uuid) -> TodoView<'_> {
        TodoView::for_list(
            self.todos.iter().filter(|t| t.list_id == list_id),
            self.context.clock().today(),
        )
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync
    }

    /// Appends a new incomplete todo. `list_id` is taken on trust. Blank
    /// titles are ignored.
    pub fn create_todo(
        &mut self,
        list_id: Uuid,
        title: &str,
        due_date: Option<NaiveDate>,
        priority: Priority,
    ) -> Option<Todo> {
        let todo = match Todo::new(
            self.fresh_id(),
            list_id,
            title,
            due_date,
            priority,
            self.context.clock().now(),
        ) {
            Ok(todo) => todo,
            Err(e) => {
                debug!("event=todo_create status=ignored reason={}", e);
                return None;
            }
        };

        self.todos.push(todo.clone());
        if self.persist() {
            self.context.notifier().success("Todo added");
        }
        Some(todo)
    }

    /// Returns whether a todo was changed. Unknown ids, empty change sets and
    /// blank titles are ignored.
    pub fn update_todo(&mut self, id: Uuid, changes: &TodoChanges) -> bool {
        if changes.is_empty() {
            return false;
        }
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Err(e) = todo.apply(changes) {
            debug!("event=todo_update status=ignored id={} reason={}", id, e);
            return false;
        }

        if self.persist() {
            self.context.notifier().success("Todo updated");
        }
        true
    }

    pub fn delete_todo(&mut self, id: Uuid) -> Option<Todo> {
        let index = self.todos.iter().position(|t| t.id == id)?;
        let removed = self.todos.remove(index);
        if self.persist() {
            self.context.notifier().success("Todo deleted");
        }
        Some(removed)
    }

    /// The todo half of a cascade delete. Returns how many were removed.
    pub fn delete_todos_for_list(&mut self, list_id: Uuid) -> usize {
        self.delete_where(|t| t.list_id == list_id)
    }

    /// Drops the in-memory collection without touching storage.
    pub fn clear(&mut self) {
        self.todos.clear();
        self.sync = SyncStatus::Synced;
    }

    pub(crate) fn delete_where<F>(&mut self, mut doomed: F) -> usize
    where
        F: FnMut(&Todo) -> bool,
    {
        let before = self.todos.len();
        self.todos.retain(|t| !doomed(t));
        let removed = before - self.todos.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = self.context.ids().next_id();
            if self.todo(id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) -> bool {
        match self.context.persistence().save_todos(&self.todos) {
            Ok(()) => {
                self.sync = SyncStatus::Synced;
                true
            }
            Err(e) => {
                self.sync = SyncStatus::Unsynced {
                    reason: e.to_string(),
                };
                self.context.notifier().warning(SAVE_TODOS_FAILED);
                false
            }
        }
    }
}
