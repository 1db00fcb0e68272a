use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    // Checkpoint every ~400KB instead of the default ~4MB
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Fold stale WAL data into the main DB on startup.
    // Fails harmlessly for in-memory and fresh databases.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
            id         TEXT PRIMARY KEY,
            content    TEXT NOT NULL DEFAULT '',
            category   TEXT,
            project    TEXT,
            tags       TEXT NOT NULL DEFAULT '[]',
            timestamp  TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS record_tags (
            record_id TEXT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
            tag       TEXT NOT NULL,
            PRIMARY KEY (record_id, tag)
        );

        CREATE INDEX IF NOT EXISTS idx_records_project ON records(project);
        CREATE INDEX IF NOT EXISTS idx_records_timestamp ON records(timestamp);
        CREATE INDEX IF NOT EXISTS idx_record_tags_tag ON record_tags(tag);
        ",
    )?;

    // v1 databases kept tags only as JSON on the record row.
    backfill_tag_index(conn)?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Populate `record_tags` from the JSON `tags` column when the index is
/// empty but records exist. Only does work once.
fn backfill_tag_index(conn: &Connection) -> Result<()> {
    let indexed: i64 = conn.query_row("SELECT COUNT(*) FROM record_tags", [], |row| row.get(0))?;
    if indexed > 0 {
        return Ok(());
    }

    let mut stmt = conn.prepare("SELECT id, tags FROM records WHERE tags != '[]'")?;
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;
    if rows.is_empty() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    {
        let mut insert =
            tx.prepare("INSERT OR IGNORE INTO record_tags (record_id, tag) VALUES (?1, ?2)")?;
        for (id, tags_json) in &rows {
            let tags: Vec<String> = serde_json::from_str(tags_json)?;
            for tag in &tags {
                insert.execute(rusqlite::params![id, tag])?;
            }
        }
    }
    tx.commit()?;

    tracing::info!("backfilled tag index for {} records", rows.len());
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
