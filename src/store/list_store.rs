use super::{StoreContext, StoreError, SyncStatus};
use crate::models::TodoList;
use crate::notify::SAVE_LISTS_FAILED;
use crate::storage::StorageWriteError;
use log::{debug, error};
use uuid::Uuid;

/// Lists plus the selection cursor.
///
/// While a load failure is pending the store refuses every mutation; only
/// [`ListStore::handle_reset`] gets it going again.
pub struct ListStore {
    context: StoreContext,
    lists: Vec<TodoList>,
    selected: Option<Uuid>,
    storage_error: Option<String>,
    sync: SyncStatus,
}

impl ListStore {
    /// Loads lists and the saved selection. A saved selection naming a
    /// missing list falls back to the first list.
    pub fn open(context: StoreContext) -> Self {
        let mut store = Self {
            context,
            lists: Vec::new(),
            selected: None,
            storage_error: None,
            sync: SyncStatus::Synced,
        };

        let persistence = store.context.persistence();
        let loaded = persistence.load_lists().and_then(|lists| {
            let saved = persistence.load_selected_list_id()?;
            Ok((lists, saved))
        });

        match loaded {
            Ok((lists, saved)) => {
                let saved = saved.and_then(|raw| raw.parse::<Uuid>().ok());
                store.selected = saved
                    .filter(|id| lists.iter().any(|l| l.id == *id))
                    .or_else(|| lists.first().map(|l| l.id));
                store.lists = lists;
                debug!(
                    "event=lists_open status=ok count={} selected={:?}",
                    store.lists.len(),
                    store.selected
                );
            }
            Err(e) => {
                error!("event=lists_open status=storage_error error={}", e);
                store.storage_error = Some(e.to_string());
            }
        }

        store
    }

    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    pub fn list(&self, id: Uuid) -> Option<&TodoList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn selected_list_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_list(&self) -> Option<&TodoList> {
        self.selected.and_then(|id| self.list(id))
    }

    pub fn storage_error(&self) -> Option<&str> {
        self.storage_error.as_deref()
    }

    pub fn has_storage_error(&self) -> bool {
        self.storage_error.is_some()
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync
    }

    /// Appends a list and selects it. Blank names are ignored.
    pub fn create_list(&mut self, name: &str) -> Result<Option<TodoList>, StoreError> {
        self.ensure_available()?;

        let list = match TodoList::new(self.fresh_id(), name, self.context.clock().now()) {
            Ok(list) => list,
            Err(e) => {
                debug!("event=list_create status=ignored reason={}", e);
                return Ok(None);
            }
        };

        self.lists.push(list.clone());
        self.selected = Some(list.id);
        if self.persist() {
            self.context.notifier().success("List created");
        }
        Ok(Some(list))
    }

    /// Returns whether a list was renamed. Unknown ids and blank names are
    /// ignored.
    pub fn rename_list(&mut self, id: Uuid, new_name: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;

        let Some(list) = self.lists.iter_mut().find(|l| l.id == id) else {
            return Ok(false);
        };
        if let Err(e) = list.rename(new_name) {
            debug!("event=list_rename status=ignored id={} reason={}", id, e);
            return Ok(false);
        }

        if self.persist() {
            self.context.notifier().success("List renamed");
        }
        Ok(true)
    }

    /// Removes the list only; its todos are the caller's to clean up. If the
    /// list was selected the cursor moves to the first remaining list.
    pub fn delete_list(&mut self, id: Uuid) -> Result<Option<TodoList>, StoreError> {
        self.ensure_available()?;

        let Some(index) = self.lists.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        let removed = self.lists.remove(index);
        if self.selected == Some(id) {
            self.selected = self.lists.first().map(|l| l.id);
        }

        if self.persist() {
            self.context.notifier().success("List deleted");
        }
        Ok(Some(removed))
    }

    /// Moves the cursor without checking that the list exists. Only the
    /// selection is written, unless an earlier write left the collection
    /// unsynced, in which case both are written.
    pub fn select_list(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.ensure_available()?;

        self.selected = Some(id);
        if !self.sync.is_synced() {
            self.persist();
            return Ok(());
        }

        let result = self
            .context
            .persistence()
            .save_selected_list_id(self.selected);
        self.settle(result);
        Ok(())
    }

    /// Clears durable storage and the in-memory lists, and leaves the
    /// storage-error state.
    pub fn handle_reset(&mut self) {
        self.context.persistence().reset_storage();
        self.lists.clear();
        self.selected = None;
        self.storage_error = None;
        self.sync = SyncStatus::Synced;
    }

    pub(crate) fn enter_storage_error(&mut self, reason: String) {
        error!("event=lists_open status=storage_error error={}", reason);
        self.lists.clear();
        self.selected = None;
        self.storage_error = Some(reason);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        match &self.storage_error {
            Some(reason) => Err(StoreError::StorageLocked(reason.clone())),
            None => Ok(()),
        }
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = self.context.ids().next_id();
            if self.list(id).is_none() {
                return id;
            }
        }
    }

    /// Writes the collection and the selection from the current snapshot.
    fn persist(&mut self) -> bool {
        let persistence = self.context.persistence();
        let result = persistence
            .save_lists(&self.lists)
            .and_then(|()| persistence.save_selected_list_id(self.selected));
        self.settle(result)
    }

    fn settle(&mut self, result: Result<(), StorageWriteError>) -> bool {
        match result {
            Ok(()) => {
                self.sync = SyncStatus::Synced;
                true
            }
            Err(e) => {
                self.sync = SyncStatus::Unsynced {
                    reason: e.to_string(),
                };
                self.context.notifier().warning(SAVE_LISTS_FAILED);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;
    use crate::storage::test_utils::{test_context, test_context_on};
    use crate::storage::{KeyValueStore, LISTS_KEY, SELECTED_LIST_KEY};
    use std::collections::HashSet;

    fn names(store: &ListStore) -> Vec<&str> {
        store.lists().iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_empty_storage_opens_with_no_selection() {
        let t = test_context();
        let store = ListStore::open(t.context);
        assert!(store.lists().is_empty());
        assert_eq!(store.selected_list_id(), None);
        assert!(!store.has_storage_error());
    }

    #[test]
    fn test_create_list_appends_selects_and_persists() {
        let t = test_context();
        let mut store = ListStore::open(t.context);

        let groceries = store.create_list("  Groceries ").unwrap().unwrap();
        let work = store.create_list("Work").unwrap().unwrap();

        assert_eq!(names(&store), vec!["Groceries", "Work"]);
        assert_eq!(store.selected_list_id(), Some(work.id));
        assert_ne!(groceries.id, work.id);
        assert_eq!(
            t.backend.get(SELECTED_LIST_KEY).unwrap(),
            Some(work.id.to_string())
        );
        assert!(t.backend.get(LISTS_KEY).unwrap().is_some());
        assert_eq!(
            t.notifier.last(),
            Some(Notification::Success("List created".to_string()))
        );
    }

    #[test]
    fn test_many_creates_keep_ids_unique_and_order() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        for n in 0..20 {
            store.create_list(&format!("List {n}")).unwrap();
        }

        let ids: HashSet<_> = store.lists().iter().map(|l| l.id).collect();
        assert_eq!(ids.len(), 20);
        let expected: Vec<String> = (0..20).map(|n| format!("List {n}")).collect();
        assert_eq!(names(&store), expected);
    }

    #[test]
    fn test_blank_name_is_ignored() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        assert_eq!(store.create_list("   ").unwrap(), None);
        assert!(store.lists().is_empty());
        assert_eq!(t.backend.get(LISTS_KEY).unwrap(), None);
        assert!(t.notifier.notifications().is_empty());
    }

    #[test]
    fn test_rename_trims_and_leaves_others_untouched() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();
        let b = store.create_list("B").unwrap().unwrap();

        assert!(store.rename_list(a.id, "  Alpha  ").unwrap());
        assert_eq!(store.list(a.id).unwrap().name, "Alpha");
        assert_eq!(store.list(b.id), Some(&b));
        assert_eq!(store.selected_list_id(), Some(b.id));

        assert!(!store.rename_list(a.id, " ").unwrap());
        assert!(!store.rename_list(Uuid::from_u128(999), "Nope").unwrap());
        assert_eq!(names(&store), vec!["Alpha", "B"]);
    }

    #[test]
    fn test_delete_selected_moves_cursor_to_first_remaining() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();
        let b = store.create_list("B").unwrap().unwrap();
        store.select_list(b.id).unwrap();

        assert_eq!(store.delete_list(b.id).unwrap(), Some(b));
        assert_eq!(store.selected_list_id(), Some(a.id));

        store.delete_list(a.id).unwrap();
        assert_eq!(store.selected_list_id(), None);
        assert_eq!(t.backend.get(SELECTED_LIST_KEY).unwrap(), None);
    }

    #[test]
    fn test_delete_unselected_keeps_cursor() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();
        let b = store.create_list("B").unwrap().unwrap();

        store.delete_list(a.id).unwrap();
        assert_eq!(store.selected_list_id(), Some(b.id));
        assert_eq!(store.delete_list(a.id).unwrap(), None);
    }

    #[test]
    fn test_select_does_not_validate_and_writes_only_selection() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        let stray = Uuid::from_u128(42);

        store.select_list(stray).unwrap();
        assert_eq!(store.selected_list_id(), Some(stray));
        assert_eq!(store.selected_list(), None);
        assert_eq!(t.backend.get(LISTS_KEY).unwrap(), None);
        assert_eq!(
            t.backend.get(SELECTED_LIST_KEY).unwrap(),
            Some(stray.to_string())
        );
    }

    #[test]
    fn test_reopen_restores_saved_selection_or_falls_back() {
        let t = test_context();
        let backend = t.backend.clone();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();
        let b = store.create_list("B").unwrap().unwrap();
        store.select_list(a.id).unwrap();

        let reopened = ListStore::open(test_context_on(backend.clone()).context);
        assert_eq!(reopened.lists(), &[a.clone(), b]);
        assert_eq!(reopened.selected_list_id(), Some(a.id));

        backend.set(SELECTED_LIST_KEY, "not-a-list").unwrap();
        let reopened = ListStore::open(test_context_on(backend).context);
        assert_eq!(reopened.selected_list_id(), Some(a.id));
    }

    #[test]
    fn test_corrupt_lists_lock_the_store_until_reset() {
        let t = test_context();
        t.backend.set(LISTS_KEY, "not json").unwrap();
        t.backend.set(SELECTED_LIST_KEY, "x").unwrap();

        let mut store = ListStore::open(t.context);
        assert!(store.has_storage_error());
        assert!(store.lists().is_empty());
        assert!(matches!(
            store.create_list("A"),
            Err(StoreError::StorageLocked(_))
        ));
        assert!(store.select_list(Uuid::from_u128(1)).is_err());

        store.handle_reset();
        assert!(!store.has_storage_error());
        assert!(store.lists().is_empty());
        assert_eq!(t.backend.get(LISTS_KEY).unwrap(), None);
        assert_eq!(t.backend.get(SELECTED_LIST_KEY).unwrap(), None);
        assert!(store.create_list("A").unwrap().is_some());
    }

    #[test]
    fn test_write_failure_keeps_change_and_marks_unsynced() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        t.backend.set_simulate_write_error(true);

        let list = store.create_list("Offline").unwrap().unwrap();
        assert_eq!(store.lists(), &[list.clone()]);
        assert_eq!(store.selected_list_id(), Some(list.id));
        assert!(!store.sync_status().is_synced());
        assert_eq!(t.notifier.warnings(), vec![SAVE_LISTS_FAILED.to_string()]);

        t.backend.set_simulate_write_error(false);
        store.rename_list(list.id, "Online").unwrap();
        assert!(store.sync_status().is_synced());
    }

    #[test]
    fn test_select_after_failed_write_also_saves_the_collection() {
        let t = test_context();
        let backend = t.backend.clone();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();

        backend.set_simulate_write_error(true);
        let b = store.create_list("B").unwrap().unwrap();
        assert!(!store.sync_status().is_synced());

        backend.set_simulate_write_error(false);
        store.select_list(a.id).unwrap();
        assert!(store.sync_status().is_synced());

        let reopened = ListStore::open(test_context_on(backend).context);
        assert_eq!(reopened.lists(), &[a.clone(), b]);
        assert_eq!(reopened.selected_list_id(), Some(a.id));
    }

    #[test]
    fn test_failed_select_keeps_store_unsynced() {
        let t = test_context();
        let mut store = ListStore::open(t.context);
        let a = store.create_list("A").unwrap().unwrap();

        t.backend.set_simulate_write_error(true);
        store.create_list("B").unwrap();
        store.select_list(a.id).unwrap();

        assert_eq!(store.selected_list_id(), Some(a.id));
        assert!(!store.sync_status().is_synced());
        assert_eq!(t.notifier.warnings().len(), 2);
    }
}
