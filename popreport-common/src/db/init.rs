//! Database initialization
//!
//! Creates the database file on first run and the `items` table with the
//! lookup indexes used by pop report queries.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets report queries read while an import is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_items_table(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the schema applied
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_items_table(&pool).await?;

    Ok(pool)
}

/// Create the items table and its indexes
pub async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            guid TEXT PRIMARY KEY,
            import_batch TEXT NOT NULL,
            member_id TEXT,
            holo_id TEXT,
            discog_id TEXT,
            master_grade INTEGER NOT NULL CHECK (master_grade BETWEEN 0 AND 10),
            item_type TEXT NOT NULL,
            series TEXT,
            variation TEXT,
            artist TEXT,
            album TEXT,
            release_year TEXT,
            label TEXT,
            tier TEXT,
            date_entered TEXT,
            grade_complete_date TEXT,
            approved INTEGER,
            archived INTEGER,
            export_to_web INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (artist IS NOT NULL OR album IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (name, column) in [
        ("idx_items_artist", "artist"),
        ("idx_items_album", "album"),
        ("idx_items_series", "series"),
        ("idx_items_item_type", "item_type"),
        ("idx_items_master_grade", "master_grade"),
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON items ({})",
            name, column
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}
