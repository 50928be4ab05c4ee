#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use serde_json::{json, Map, Value};
use tallybook::commands;

#[path = "util.rs"]
mod util;

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

#[tokio::test]
async fn open_bootstraps_a_default_wallet() -> Result<()> {
    let (_dir, state) = util::temp_state().await;
    let wallet = state.default_wallet_id();
    assert!(!wallet.is_empty());

    let wallets = commands::list_command(&state, "wallets", "", None, None, None).await?;
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0]["id"].as_str(), Some(wallet.as_str()));
    assert_eq!(wallets[0]["name"].as_str(), Some("Default"));
    Ok(())
}

#[tokio::test]
async fn reopening_reuses_the_existing_wallet() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("tallybook.sqlite3");
    let first = tallybook::AppState::open(&db_path).await?;
    let wallet = first.default_wallet_id();
    drop(first);

    let second = tallybook::AppState::open(&db_path).await?;
    assert_eq!(second.default_wallet_id(), wallet);
    Ok(())
}

#[tokio::test]
async fn category_crud_round_trip() -> Result<()> {
    let (_dir, state) = util::temp_state().await;
    let wallet = state.default_wallet_id();

    let created = commands::create_command(
        &state,
        "categories",
        payload(json!({ "wallet_id": wallet, "name": "Groceries", "kind": "expense" })),
    )
    .await?;
    let id = created["id"].as_str().expect("generated id").to_string();
    assert!(created["created_at"].as_i64().expect("created_at") > 0);

    let listed = commands::list_command(&state, "categories", &wallet, None, None, None).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"].as_str(), Some("Groceries"));

    commands::update_command(
        &state,
        "categories",
        &id,
        payload(json!({ "name": "Food" })),
        Some(&wallet),
    )
    .await?;
    let fetched = commands::get_command(&state, "categories", Some(&wallet), &id)
        .await?
        .expect("category exists");
    assert_eq!(fetched["name"].as_str(), Some("Food"));

    commands::delete_command(&state, "categories", &wallet, &id).await?;
    assert!(commands::get_command(&state, "categories", Some(&wallet), &id)
        .await?
        .is_none());
    let listed = commands::list_command(&state, "categories", &wallet, None, None, None).await?;
    assert!(listed.is_empty());

    commands::restore_command(&state, "categories", &wallet, &id).await?;
    let restored = commands::get_command(&state, "categories", Some(&wallet), &id)
        .await?
        .expect("category restored");
    assert_eq!(restored["name"].as_str(), Some("Food"));
    Ok(())
}

#[tokio::test]
async fn transactions_are_scoped_to_their_wallet() -> Result<()> {
    let (_dir, state) = util::temp_state().await;
    let wallet = state.default_wallet_id();

    let other = commands::create_command(
        &state,
        "wallets",
        payload(json!({ "name": "Savings", "currency": "EUR" })),
    )
    .await?;
    let other_id = other["id"].as_str().expect("wallet id").to_string();

    commands::create_command(
        &state,
        "transactions",
        payload(json!({
            "wallet_id": wallet,
            "amount_cents": -1250,
            "note": "coffee",
            "posted_at": 1_750_000_000_000_i64
        })),
    )
    .await?;

    let mine = commands::list_command(&state, "transactions", &wallet, None, None, None).await?;
    assert_eq!(mine.len(), 1);
    let theirs =
        commands::list_command(&state, "transactions", &other_id, None, None, None).await?;
    assert!(theirs.is_empty());
    Ok(())
}

#[tokio::test]
async fn scoped_create_requires_a_wallet_id() -> Result<()> {
    let (_dir, state) = util::temp_state().await;

    let err = commands::create_command(
        &state,
        "transactions",
        payload(json!({ "amount_cents": 100, "posted_at": 0 })),
    )
    .await
    .expect_err("missing wallet_id");
    assert_eq!(err.code(), "COMMANDS/MISSING_WALLET_ID");
    Ok(())
}

#[tokio::test]
async fn unknown_tables_are_rejected() -> Result<()> {
    let (_dir, state) = util::temp_state().await;

    let err = commands::create_command(&state, "sqlite_master", payload(json!({})))
        .await
        .expect_err("unknown table");
    assert_eq!(err.code(), "COMMANDS/INVALID_TABLE");

    let err = commands::list_command(&state, "pragma_table_info", "w", None, None, None)
        .await
        .expect_err("unknown table");
    assert_eq!(err.code(), "APP/UNKNOWN");
    Ok(())
}

#[tokio::test]
async fn updates_to_missing_rows_fail() -> Result<()> {
    let (_dir, state) = util::temp_state().await;
    let wallet = state.default_wallet_id();

    let err = commands::update_command(
        &state,
        "goals",
        "no-such-id",
        payload(json!({ "name": "Holiday" })),
        Some(&wallet),
    )
    .await
    .expect_err("missing row");
    assert_eq!(err.context().get("operation").map(String::as_str), Some("update"));
    Ok(())
}

#[tokio::test]
async fn list_respects_order_limit_and_offset() -> Result<()> {
    let (_dir, state) = util::temp_state().await;
    let wallet = state.default_wallet_id();

    for (name, pos) in [("c", 2), ("a", 0), ("b", 1)] {
        commands::create_command(
            &state,
            "categories",
            payload(json!({ "wallet_id": wallet, "name": name, "position": pos })),
        )
        .await?;
    }

    let page = commands::list_command(
        &state,
        "categories",
        &wallet,
        Some("position, id"),
        Some(2),
        Some(1),
    )
    .await?;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["name"].as_str(), Some("b"));
    assert_eq!(page[1]["name"].as_str(), Some("c"));
    Ok(())
}
