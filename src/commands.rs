use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Column, Row, TypeInfo, ValueRef};

use crate::{id::new_uuid_v7, repo, state::AppState, time::now_ms, AppError, AppResult};

fn row_to_value(row: SqliteRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let v = row.try_get_raw(idx).ok();
        let val = match v {
            Some(raw) => {
                if raw.is_null() {
                    Value::Null
                } else {
                    match raw.type_info().name() {
                        "INTEGER" => row
                            .try_get::<i64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        "REAL" => row
                            .try_get::<f64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        _ => row
                            .try_get::<String, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                    }
                }
            }
            None => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }
    Value::Object(map)
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}

fn ensure_known_table(table: &str) -> AppResult<()> {
    if repo::DOMAIN_TABLES.contains(&table) {
        Ok(())
    } else {
        Err(AppError::new("COMMANDS/INVALID_TABLE", "Unknown domain table")
            .with_context("table", table.to_string()))
    }
}

pub async fn list_command(
    state: &AppState,
    table: &str,
    wallet_id: &str,
    order_by: Option<&str>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<Value>> {
    let rows = repo::list_active(state.pool(), table, wallet_id, order_by, limit, offset)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "list")
                .with_context("table", table.to_string())
                .with_context("wallet_id", wallet_id.to_string())
        })?;
    Ok(rows.into_iter().map(row_to_value).collect())
}

pub async fn get_command(
    state: &AppState,
    table: &str,
    wallet_id: Option<&str>,
    id: &str,
) -> AppResult<Option<Value>> {
    let row = repo::get_active(state.pool(), table, wallet_id, id)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "get")
                .with_context("table", table.to_string())
                .with_context("wallet_id", wallet_id.unwrap_or("").to_string())
                .with_context("id", id.to_string())
        })?;
    Ok(row.map(row_to_value))
}

/// Insert one row. The INSERT itself (and its durable flush) runs on the
/// write queue; the returned object is the payload as stamped here.
pub async fn create_command(
    state: &AppState,
    table: &str,
    mut data: Map<String, Value>,
) -> AppResult<Value> {
    ensure_known_table(table)?;
    if table != "wallets" && !data.get("wallet_id").map(Value::is_string).unwrap_or(false) {
        return Err(
            AppError::new("COMMANDS/MISSING_WALLET_ID", "Payload missing wallet_id")
                .with_context("operation", "create")
                .with_context("table", table.to_string()),
        );
    }
    let id = data
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(new_uuid_v7);
    data.insert("id".into(), Value::String(id));
    let now = now_ms();
    data.entry(String::from("created_at"))
        .or_insert(Value::from(now));
    data.insert("updated_at".into(), Value::from(now));

    let cols: Vec<String> = data.keys().cloned().collect();
    let placeholders: Vec<String> = cols.iter().map(|_| "?".into()).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(","),
        placeholders.join(",")
    );

    let payload = data.clone();
    let label = format!("{table}_create");
    state
        .write(&label, move |pool| async move {
            let mut query = sqlx::query(&sql);
            for c in &cols {
                let value = data
                    .get(c)
                    .ok_or_else(|| anyhow::anyhow!("payload missing value for column {c}"))?;
                query = bind_value(query, value);
            }
            query.execute(&pool).await?;
            Ok(())
        })
        .await
        .map_err(|err| {
            err.with_context("operation", "create")
                .with_context("table", table.to_string())
        })?;
    Ok(Value::Object(payload))
}

/// Update one row in place. Id and created_at are immutable.
pub async fn update_command(
    state: &AppState,
    table: &str,
    id: &str,
    mut data: Map<String, Value>,
    wallet_id: Option<&str>,
) -> AppResult<()> {
    ensure_known_table(table)?;
    data.remove("id");
    data.remove("created_at");
    let now = now_ms();
    data.insert("updated_at".into(), Value::from(now));
    let cols: Vec<String> = data.keys().cloned().collect();
    let set_clause: Vec<String> = cols.iter().map(|c| format!("{c} = ?")).collect();
    let sql = if table == "wallets" {
        format!("UPDATE wallets SET {} WHERE id = ?", set_clause.join(","))
    } else {
        format!(
            "UPDATE {table} SET {} WHERE wallet_id = ? AND id = ?",
            set_clause.join(",")
        )
    };

    let wallet = wallet_id.unwrap_or("").to_string();
    let row_id = id.to_string();
    let scoped = table != "wallets";
    let label = format!("{table}_update");
    state
        .write(&label, move |pool| async move {
            let mut query = sqlx::query(&sql);
            for c in &cols {
                let value = data
                    .get(c)
                    .ok_or_else(|| anyhow::anyhow!("payload missing value for column {c}"))?;
                query = bind_value(query, value);
            }
            if scoped {
                query = query.bind(wallet).bind(row_id);
            } else {
                query = query.bind(row_id);
            }
            let res = query.execute(&pool).await?;
            if res.rows_affected() == 0 {
                anyhow::bail!("id not found");
            }
            Ok(())
        })
        .await
        .map_err(|err| {
            err.with_context("operation", "update")
                .with_context("table", table.to_string())
                .with_context("wallet_id", wallet_id.unwrap_or("").to_string())
                .with_context("id", id.to_string())
        })
}

/// Soft-delete one row (sets `deleted_at`). Runs on the write queue.
pub async fn delete_command(
    state: &AppState,
    table: &str,
    wallet_id: &str,
    id: &str,
) -> AppResult<()> {
    ensure_known_table(table)?;
    let t = table.to_string();
    let wallet = wallet_id.to_string();
    let row_id = id.to_string();
    let label = format!("{table}_delete");
    state
        .write(&label, move |pool| async move {
            repo::set_deleted_at(&pool, &t, &wallet, &row_id).await
        })
        .await
        .map_err(|err| {
            err.with_context("operation", "delete")
                .with_context("table", table.to_string())
                .with_context("wallet_id", wallet_id.to_string())
                .with_context("id", id.to_string())
        })
}

/// Undo a soft delete. Runs on the write queue.
pub async fn restore_command(
    state: &AppState,
    table: &str,
    wallet_id: &str,
    id: &str,
) -> AppResult<()> {
    ensure_known_table(table)?;
    let t = table.to_string();
    let wallet = wallet_id.to_string();
    let row_id = id.to_string();
    let label = format!("{table}_restore");
    state
        .write(&label, move |pool| async move {
            repo::clear_deleted_at(&pool, &t, &wallet, &row_id).await
        })
        .await
        .map_err(|err| {
            err.with_context("operation", "restore")
                .with_context("table", table.to_string())
                .with_context("wallet_id", wallet_id.to_string())
                .with_context("id", id.to_string())
        })
}
