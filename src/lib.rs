//! Taskflow: a single-user task store with derived dashboard views.
//!
//! Tasks and lists live in memory inside [`TaskStore`] and [`ListStore`] and
//! are written back as JSON snapshots through [`Persistence`] on every
//! mutation. The durable medium is any [`KeyValueStore`]; the binary uses the
//! SQLite-backed [`Database`].

pub mod cli;
pub mod config;
pub mod database;
pub mod lists;
pub mod models;
pub mod persistence;
pub mod seed;
pub mod tasks;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use lists::ListStore;
pub use models::{Priority, Step, Task, TaskList, TaskStats};
pub use persistence::{KeyValueStore, MemoryStore, Persistence};
pub use tasks::{FetchOutcome, FetchStatus, StoreError, TaskStore};
pub use utils::Profile;
