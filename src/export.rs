//! CSV export: one file per store table, header row first.

use std::path::{Path, PathBuf};

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tracing::{debug, info};

use crate::errors::InventoryError;

/// Bookkeeping table maintained by the migrator.
const MIGRATIONS_TABLE: &str = "seaql_migrations";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// User tables, sorted by name.
pub async fn list_tables(db: &DatabaseConnection) -> Result<Vec<String>, InventoryError> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ? \
         ORDER BY name",
        [MIGRATIONS_TABLE.into()],
    );
    db.query_all(stmt)
        .await?
        .iter()
        .map(|row| row.try_get::<String>("", "name").map_err(InventoryError::from))
        .collect()
}

/// Column names in schema declaration order.
pub async fn table_columns(
    db: &DatabaseConnection,
    table: &str,
) -> Result<Vec<String>, InventoryError> {
    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!("PRAGMA table_info({})", quote_ident(table)),
    );
    db.query_all(stmt)
        .await?
        .iter()
        .map(|row| row.try_get::<String>("", "name").map_err(InventoryError::from))
        .collect()
}

async fn export_table(
    db: &DatabaseConnection,
    table: &str,
    path: &Path,
) -> Result<u64, InventoryError> {
    let columns = table_columns(db, table).await?;

    // Render every cell as text in SQL; NULL becomes the empty string.
    let select = columns
        .iter()
        .map(|c| {
            let col = quote_ident(c);
            format!("COALESCE(CAST({col} AS TEXT), '') AS {col}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!("SELECT {select} FROM {}", quote_ident(table)),
    );
    let rows = db.query_all(stmt).await?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&columns)?;
    for row in &rows {
        let record = columns
            .iter()
            .map(|c| row.try_get::<String>("", c))
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(rows.len() as u64)
}

/// Write `<table>.csv` for every table into `dir`, which is recreated empty
/// first. Returns the written paths.
pub async fn export_tables(
    db: &DatabaseConnection,
    dir: &Path,
) -> Result<Vec<PathBuf>, InventoryError> {
    if tokio::fs::try_exists(dir).await? {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::new();
    for table in list_tables(db).await? {
        let path = dir.join(format!("{table}.csv"));
        let rows = export_table(db, &table, &path).await?;
        debug!(%table, rows, path = %path.display(), "Exported table");
        written.push(path);
    }

    info!(dir = %dir.display(), tables = written.len(), "Exported store to CSV");
    Ok(written)
}
