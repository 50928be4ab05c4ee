#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;

use tallybook::migrate;

#[derive(Parser)]
#[command(name = "migrate", about = "Tallybook migration helper")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List migrations and show applied/pending
    #[command(about, long_about = None)]
    List,
    /// Show current migration status
    #[command(about, long_about = None)]
    Status,
    /// Apply all pending migrations
    #[command(about, long_about = None)]
    Up,
}

#[tokio::main]
async fn main() -> Result<()> {
    tallybook::logging::init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::List => list(&cli.db).await,
        Cmd::Status => status(&cli.db).await,
        Cmd::Up => up(&cli.db).await,
    }
}

async fn list(db_path: &PathBuf) -> Result<()> {
    let pool = tallybook::db::open_sqlite_pool(db_path)
        .await
        .context("open database")?;
    let applied: HashSet<String> = migrate::applied_versions(&pool).await?.into_iter().collect();
    for (version, _) in migrate::MIGRATIONS {
        let mark = if applied.contains(*version) { "applied" } else { "pending" };
        println!("{version}  {mark}");
    }
    Ok(())
}

async fn status(db_path: &PathBuf) -> Result<()> {
    let pool = tallybook::db::open_sqlite_pool(db_path)
        .await
        .context("open database")?;
    let applied = migrate::applied_versions(&pool).await?;
    let pending = migrate::MIGRATIONS.len().saturating_sub(applied.len());
    println!("applied: {}  pending: {}", applied.len(), pending);
    Ok(())
}

async fn up(db_path: &PathBuf) -> Result<()> {
    let pool = tallybook::db::open_sqlite_pool(db_path)
        .await
        .context("open database")?;
    migrate::apply_migrations(&pool)
        .await
        .context("apply migrations")?;
    println!("migrations up to date");
    Ok(())
}
