use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;

use crate::time::now_ms;

/// Tables the generic CRUD layer is allowed to touch. Everything except
/// `wallets` is scoped by a `wallet_id` column.
pub const DOMAIN_TABLES: &[&str] = &[
    "wallets",
    "categories",
    "transactions",
    "budgets",
    "goals",
];

fn ensure_table(table: &str) -> anyhow::Result<()> {
    if DOMAIN_TABLES.contains(&table) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid table"))
    }
}

fn ensure_order_by(order_by: &str) -> anyhow::Result<()> {
    let ok = !order_by.is_empty()
        && order_by
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ',' || c == ' ');
    if ok {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid order_by"))
    }
}

pub async fn list_active(
    pool: &SqlitePool,
    table: &str,
    wallet_id: &str,
    order_by: Option<&str>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> anyhow::Result<Vec<SqliteRow>> {
    ensure_table(table)?;
    let order = match order_by {
        Some(o) => {
            ensure_order_by(o)?;
            o
        }
        None => "created_at, id",
    };
    let mut sql = if table == "wallets" {
        format!("SELECT * FROM wallets WHERE deleted_at IS NULL ORDER BY {order}")
    } else {
        format!("SELECT * FROM {table} WHERE wallet_id = ? AND deleted_at IS NULL ORDER BY {order}")
    };
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
        if offset.is_some() {
            sql.push_str(" OFFSET ?");
        }
    }
    let mut query = sqlx::query(&sql);
    if table != "wallets" {
        query = query.bind(wallet_id);
    }
    if let Some(l) = limit {
        query = query.bind(l);
        if let Some(o) = offset {
            query = query.bind(o);
        }
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn get_active(
    pool: &SqlitePool,
    table: &str,
    wallet_id: Option<&str>,
    id: &str,
) -> anyhow::Result<Option<SqliteRow>> {
    ensure_table(table)?;
    let row = match (table, wallet_id) {
        ("wallets", _) | (_, None) => {
            let sql = format!("SELECT * FROM {table} WHERE id = ? AND deleted_at IS NULL");
            sqlx::query(&sql).bind(id).fetch_optional(pool).await?
        }
        (_, Some(wallet)) => {
            let sql = format!(
                "SELECT * FROM {table} WHERE wallet_id = ? AND id = ? AND deleted_at IS NULL"
            );
            sqlx::query(&sql)
                .bind(wallet)
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(row)
}

pub async fn set_deleted_at(
    pool: &SqlitePool,
    table: &str,
    wallet_id: &str,
    id: &str,
) -> anyhow::Result<()> {
    ensure_table(table)?;
    let now = now_ms();
    let res = if table == "wallets" {
        sqlx::query("UPDATE wallets SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?
    } else {
        let sql = format!(
            "UPDATE {table} SET deleted_at = ?, updated_at = ? WHERE wallet_id = ? AND id = ? AND deleted_at IS NULL"
        );
        sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .bind(wallet_id)
            .bind(id)
            .execute(pool)
            .await?
    };
    if res.rows_affected() == 0 {
        anyhow::bail!("id not found");
    }
    Ok(())
}

pub async fn clear_deleted_at(
    pool: &SqlitePool,
    table: &str,
    wallet_id: &str,
    id: &str,
) -> anyhow::Result<()> {
    ensure_table(table)?;
    let now = now_ms();
    let res = if table == "wallets" {
        sqlx::query("UPDATE wallets SET deleted_at = NULL, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?
    } else {
        let sql = format!(
            "UPDATE {table} SET deleted_at = NULL, updated_at = ? WHERE wallet_id = ? AND id = ?"
        );
        sqlx::query(&sql)
            .bind(now)
            .bind(wallet_id)
            .bind(id)
            .execute(pool)
            .await?
    };
    if res.rows_affected() == 0 {
        anyhow::bail!("id not found");
    }
    Ok(())
}

/// First wallet that has not been soft-deleted, oldest first.
pub async fn first_active_wallet(pool: &SqlitePool) -> anyhow::Result<Option<SqliteRow>> {
    let row =
        sqlx::query("SELECT * FROM wallets WHERE deleted_at IS NULL ORDER BY created_at, id LIMIT 1")
            .fetch_optional(pool)
            .await?;
    Ok(row)
}
