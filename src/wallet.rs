use futures::FutureExt;
use sqlx::Row;

use crate::db::run_in_tx;
use crate::id::new_uuid_v7;
use crate::repo;
use crate::state::AppState;
use crate::time::now_ms;

/// Return the oldest active wallet, creating a "Default" one on first run.
///
/// The bootstrap insert goes through the write queue like every other
/// mutation, so a caller racing CRUD traffic during startup still sees
/// serialized writes.
pub async fn default_wallet_id(state: &AppState) -> anyhow::Result<String> {
    if let Some(row) = repo::first_active_wallet(state.pool()).await? {
        let id: String = row.try_get("id")?;
        return Ok(id);
    }

    let id = new_uuid_v7();
    let now = now_ms();
    let new_id = id.clone();
    state
        .write("wallet_bootstrap", move |pool| async move {
            run_in_tx(&pool, |tx| {
                async move {
                    sqlx::query(
                        "INSERT INTO wallets (id, name, currency, balance_cents, created_at, updated_at) \
                         VALUES (?, ?, 'USD', 0, ?, ?)",
                    )
                    .bind(&new_id)
                    .bind("Default")
                    .bind(now)
                    .bind(now)
                    .execute(&mut **tx)
                    .await?;
                    Ok::<_, anyhow::Error>(())
                }
                .boxed()
            })
            .await
        })
        .await?;
    Ok(id)
}
