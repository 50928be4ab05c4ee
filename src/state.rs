use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;

use crate::write_queue::WriteQueue;
use crate::{db, migrate, wallet, AppResult};

/// Owns the pool, the write queue that serializes every mutation against it,
/// and the bootstrap wallet id.
///
/// The queue's lifecycle is tied to this state: one pool, one queue. Tests
/// opening several databases get fully independent mutual-exclusion domains.
#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    writes: WriteQueue,
    default_wallet_id: Arc<Mutex<String>>,
}

impl AppState {
    /// Open (or create) the database at `db_path`, apply pending migrations
    /// and make sure a default wallet exists.
    pub async fn open(db_path: &Path) -> anyhow::Result<Self> {
        let pool = db::open_sqlite_pool(db_path).await?;
        migrate::apply_migrations(&pool).await?;
        let state = AppState {
            pool,
            writes: WriteQueue::new(),
            default_wallet_id: Arc::new(Mutex::new(String::new())),
        };
        let wallet_id = wallet::default_wallet_id(&state).await?;
        *state
            .default_wallet_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = wallet_id;
        Ok(state)
    }

    /// Read-side access. Reads may interleave with queued writes; anything
    /// that mutates must go through [`AppState::write`] instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn writes(&self) -> &WriteQueue {
        &self.writes
    }

    pub fn default_wallet_id(&self) -> String {
        self.default_wallet_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Enqueue one mutation. The operation receives its own pool handle, runs
    /// strictly after every previously enqueued write, and is followed by a
    /// durable flush before the next item starts.
    pub async fn write<F, Fut>(&self, label: &str, op: F) -> AppResult<()>
    where
        F: FnOnce(SqlitePool) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let pool = self.pool.clone();
        self.writes
            .enqueue(Some(label), async move {
                op(pool.clone()).await?;
                db::persist(&pool).await?;
                Ok(())
            })
            .await
            .map_err(crate::AppError::from)
    }
}
