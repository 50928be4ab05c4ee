//! Personal-finance data layer: wallets, categories, transactions, budgets
//! and goals in an embedded SQLite database, with every mutation serialized
//! through a FIFO write queue and flushed to disk before the next one runs.
//!
//! Reads go straight to the pool; writes go through [`AppState::write`].

pub mod commands;
pub mod db;
mod error;
mod id;
pub mod logging;
pub mod migrate;
pub mod repo;
mod state;
mod time;
pub mod wallet;
pub mod write_queue;

pub use error::{AppError, AppResult};
pub use id::new_uuid_v7;
pub use state::AppState;
pub use time::now_ms;
pub use write_queue::{WriteQueue, WriteQueueError};
