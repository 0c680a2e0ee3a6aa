//! The task store: the ordered task collection, its mutations, and the
//! derived views the dashboard pages read.
//!
//! Every mutation writes the full snapshot back through [`Persistence`]
//! before returning. Write failures are logged and remembered but never
//! returned; only [`TaskStore::fetch`] has an error channel.

use std::time::Duration;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Task, TaskStats};
use crate::persistence::{PersistError, Persistence, TASKS_KEY};
use crate::seed;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Failed to fetch tasks: {0}")]
    FetchFailed(String),
}

/// Lifecycle of the asynchronous bootstrap load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// What a call to [`TaskStore::fetch`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The snapshot was read (or seeded) and replaced the collection
    Loaded,
    /// Another fetch was already in flight; nothing was done
    AlreadyInFlight,
}

pub struct TaskStore {
    tasks: Vec<Task>,
    status: FetchStatus,
    status_before_fetch: FetchStatus,
    error: Option<String>,
    last_persist_error: Option<String>,
    persistence: Persistence,
    fetch_latency: Duration,
}

impl TaskStore {
    /// Create an empty store; call [`TaskStore::load`] or [`TaskStore::fetch`] to populate it
    pub fn new(persistence: Persistence, fetch_latency: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            status: FetchStatus::Idle,
            status_before_fetch: FetchStatus::Idle,
            error: None,
            last_persist_error: None,
            persistence,
            fetch_latency,
        }
    }

    /// Replace the collection with the persisted snapshot, seeding if there is none.
    ///
    /// A backend read failure leaves the store empty instead of failing.
    pub fn load(&mut self) {
        match read_or_seed(&self.persistence) {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                warn!(error = %e, "could not read tasks, starting empty");
                self.tasks = Vec::new();
            }
        }
    }

    /// Append `task` and persist. Returns `false` if a task with the same id exists.
    pub fn add(&mut self, task: Task) -> bool {
        if self.tasks.iter().any(|t| t.id == task.id) {
            warn!(id = %task.id, "refusing to add task with duplicate id");
            return false;
        }
        debug!(id = %task.id, "task added");
        self.tasks.push(task);
        self.persist();
        true
    }

    /// Remove the task with `id`; absent ids are ignored
    pub fn remove(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() != before {
            debug!(id, "task removed");
        }
        self.persist();
    }

    pub fn toggle_completion(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
            debug!(id, completed = task.completed, "task completion toggled");
            self.persist();
        }
    }

    pub fn toggle_importance(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.important = !task.important;
            debug!(id, important = task.important, "task importance toggled");
            self.persist();
        }
    }

    /// Replace the whole entity sharing `task.id`; no-op if there is none
    pub fn update(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            debug!(id = %task.id, "task updated");
            *slot = task;
            self.persist();
        }
    }

    /// Start a fetch, moving to [`FetchStatus::Loading`].
    ///
    /// Returns `None` while another fetch is still in flight.
    pub fn begin_fetch(&mut self) -> Option<PendingFetch> {
        if self.status == FetchStatus::Loading {
            debug!("fetch already in flight, ignoring");
            return None;
        }
        self.status_before_fetch = self.status;
        self.status = FetchStatus::Loading;
        Some(PendingFetch {
            persistence: self.persistence.clone(),
            latency: self.fetch_latency,
        })
    }

    /// Apply the outcome of a [`PendingFetch`].
    ///
    /// On failure the collection is left untouched and the message is kept
    /// for [`TaskStore::take_error`].
    pub fn finish_fetch(&mut self, outcome: Result<Vec<Task>, StoreError>) -> Result<(), StoreError> {
        match outcome {
            Ok(tasks) => {
                info!(count = tasks.len(), "tasks fetched");
                self.tasks = tasks;
                self.status = FetchStatus::Succeeded;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "task fetch failed");
                self.status = FetchStatus::Failed;
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Give up on a started fetch whose result will never be applied,
    /// returning to the status it started from
    pub fn abandon_fetch(&mut self) {
        if self.status == FetchStatus::Loading {
            debug!(status = ?self.status_before_fetch, "fetch abandoned");
            self.status = self.status_before_fetch;
        }
    }

    /// Load tasks after the configured latency. A call made while another
    /// fetch is pending returns [`FetchOutcome::AlreadyInFlight`] at once.
    ///
    /// Dropping the returned future before it completes abandons the fetch.
    pub async fn fetch(&mut self) -> Result<FetchOutcome, StoreError> {
        let Some(pending) = self.begin_fetch() else {
            return Ok(FetchOutcome::AlreadyInFlight);
        };
        let mut guard = FetchGuard {
            store: self,
            armed: true,
        };
        let outcome = pending.run().await;
        guard.armed = false;
        guard.store.finish_fetch(outcome)?;
        Ok(FetchOutcome::Loaded)
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Take the fetch error for a one-shot notification
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Message of the most recent failed snapshot write, if any
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn by_completion(&self, completed: bool) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.completed == completed).collect()
    }

    pub fn important(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.important).collect()
    }

    /// Tasks due on the current local calendar day
    pub fn due_today(&self) -> Vec<&Task> {
        self.due_on(Local::now().date_naive(), &Local)
    }

    /// Tasks whose due date, read in `tz`, falls on `day`
    pub fn due_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| {
                t.due_date
                    .is_some_and(|due| due.with_timezone(tz).date_naive() == day)
            })
            .collect()
    }

    pub fn with_due_date(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.due_date.is_some()).collect()
    }

    /// Tasks with an assignee. Nothing in the store sets one.
    pub fn assigned(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.assigned_to.is_some()).collect()
    }

    pub fn in_list(&self, list_id: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.in_list(list_id))
            .collect()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    fn persist(&mut self) {
        match self.persistence.save(TASKS_KEY, &self.tasks) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!(error = %e, "failed to persist tasks");
                self.last_persist_error = Some(e.to_string());
            }
        }
    }
}

/// Abandons the fetch in progress unless disarmed before drop
struct FetchGuard<'a> {
    store: &'a mut TaskStore,
    armed: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.abandon_fetch();
        }
    }
}

/// A fetch that has been started but not yet applied.
///
/// Holds its own persistence handle so the store stays usable while it runs.
#[derive(Debug)]
pub struct PendingFetch {
    persistence: Persistence,
    latency: Duration,
}

impl PendingFetch {
    pub async fn run(self) -> Result<Vec<Task>, StoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        read_or_seed(&self.persistence).map_err(|e| StoreError::FetchFailed(e.to_string()))
    }
}

/// Read the task snapshot. A missing or corrupt snapshot is replaced by the
/// sample tasks, which are written back; a corrupt blob is first copied aside.
fn read_or_seed(persistence: &Persistence) -> Result<Vec<Task>, PersistError> {
    match persistence.load::<Task>(TASKS_KEY) {
        Ok(Some(tasks)) => Ok(tasks),
        Ok(None) => Ok(seed_tasks(persistence)),
        Err(PersistError::CorruptData { key, raw, source }) => {
            warn!(key = %key, error = %source, "stored tasks are corrupt, reseeding");
            if let Err(e) = persistence.preserve_corrupt(&key, &raw) {
                warn!(error = %e, "could not keep a copy of the corrupt tasks");
            }
            Ok(seed_tasks(persistence))
        }
        Err(e) => Err(e),
    }
}

fn seed_tasks(persistence: &Persistence) -> Vec<Task> {
    let tasks = seed::sample_tasks(Utc::now());
    info!(count = tasks.len(), "seeding sample tasks");
    if let Err(e) = persistence.save(TASKS_KEY, &tasks) {
        warn!(error = %e, "failed to persist seeded tasks");
    }
    tasks
}
