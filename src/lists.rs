use tracing::{debug, info, warn};

use crate::models::TaskList;
use crate::persistence::{PersistError, Persistence, LISTS_KEY};
use crate::seed;

/// Owns the named sidebar lists
pub struct ListStore {
    lists: Vec<TaskList>,
    persistence: Persistence,
}

impl ListStore {
    pub fn new(persistence: Persistence) -> Self {
        Self {
            lists: Vec::new(),
            persistence,
        }
    }

    /// Load persisted lists, writing the default three if there are none
    pub fn load(&mut self) {
        self.lists = match self.persistence.load::<TaskList>(LISTS_KEY) {
            Ok(Some(lists)) => lists,
            Ok(None) => self.seed(),
            Err(PersistError::CorruptData { key, raw, source }) => {
                warn!(key = %key, error = %source, "stored lists are corrupt, reseeding");
                if let Err(e) = self.persistence.preserve_corrupt(&key, &raw) {
                    warn!(error = %e, "could not keep a copy of the corrupt lists");
                }
                self.seed()
            }
            Err(e) => {
                warn!(error = %e, "could not read lists, starting empty");
                Vec::new()
            }
        };
    }

    /// Append `list` and persist. Returns `false` if the id is taken.
    pub fn add(&mut self, list: TaskList) -> bool {
        if self.lists.iter().any(|l| l.id == list.id) {
            warn!(id = %list.id, "refusing to add list with duplicate id");
            return false;
        }
        debug!(id = %list.id, name = %list.name, "list added");
        self.lists.push(list);
        self.persist();
        true
    }

    /// Remove the list with `id`. Tasks filed under it are left alone.
    pub fn remove(&mut self, id: &str) {
        self.lists.retain(|l| l.id != id);
        self.persist();
    }

    pub fn get(&self, id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn all_lists(&self) -> &[TaskList] {
        &self.lists
    }

    fn seed(&self) -> Vec<TaskList> {
        let lists = seed::default_lists();
        info!(count = lists.len(), "seeding default lists");
        if let Err(e) = self.persistence.save(LISTS_KEY, &lists) {
            warn!(error = %e, "failed to persist default lists");
        }
        lists
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(LISTS_KEY, &self.lists) {
            warn!(error = %e, "failed to persist lists");
        }
    }
}
