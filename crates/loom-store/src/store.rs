use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use loom_core::{Category, Record, RecordFilter};

use crate::error::{Result, StoreError};
use crate::schema;

/// Metadata key holding the schema version written by `schema::initialize`.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";
/// Metadata key holding the ISO timestamp of the last bulk ingest.
pub const LAST_INGEST_KEY: &str = "last_ingest";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).optional()?;
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Write ---

    pub fn upsert_record(&self, record: &Record) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_on(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a batch in one transaction. Returns the batch size.
    pub fn upsert_records(&self, records: &[Record]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            upsert_on(&tx, record)?;
        }
        tx.commit()?;
        tracing::debug!("upserted {} records", records.len());
        Ok(records.len())
    }

    /// Returns false when no record had this id.
    pub fn delete_record(&self, id: &str) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM records WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // --- Read ---

    pub fn get_record(&self, id: &str) -> Result<Option<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, category, project, tags, timestamp FROM records WHERE id = ?1",
        )?;
        let row = stmt.query_row([id], read_row).optional()?;
        row.map(into_record).transpose()
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Records matching `filter`, newest first.
    ///
    /// Project and category narrow the SQL query; tags, search and the limit
    /// are applied in memory so they share semantics with
    /// [`RecordFilter::matches`].
    pub fn load_records(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let mut sql = String::from(
            "SELECT id, content, category, project, tags, timestamp FROM records WHERE 1 = 1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(project) = &filter.project {
            args.push(project.clone());
            sql.push_str(&format!(" AND project = ?{}", args.len()));
        }
        if let Some(category) = &filter.category {
            if category.eq_ignore_ascii_case(loom_core::constants::UNCATEGORIZED) {
                sql.push_str(" AND category IS NULL");
            } else {
                args.push(category.to_lowercase());
                sql.push_str(&format!(" AND category = ?{}", args.len()));
            }
        }
        sql.push_str(" ORDER BY timestamp DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows: Vec<RawRecord> = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), read_row)?
            .collect::<std::result::Result<_, _>>()?;

        let records = rows
            .into_iter()
            .map(into_record)
            .collect::<Result<Vec<_>>>()?;
        Ok(filter.apply(&records))
    }

    pub fn load_all(&self) -> Result<Vec<Record>> {
        self.load_records(&RecordFilter::default())
    }

    /// Relation-tag usage counts, most used first. Reserved tags excluded.
    pub fn tag_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, COUNT(*) AS n FROM record_tags
             WHERE tag NOT LIKE 'title:%' AND tag NOT LIKE 'summary:%' AND tag != ''
             GROUP BY tag ORDER BY n DESC, tag ASC",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(counts)
    }

    /// Records per project, most populated first. Records without a project
    /// are counted under `"unassigned"`.
    pub fn project_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(NULLIF(TRIM(project), ''), ?1) AS p, COUNT(*) AS n FROM records
             GROUP BY p ORDER BY n DESC, p ASC",
        )?;
        let counts = stmt
            .query_map([loom_core::constants::UNASSIGNED], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(counts)
    }

    // --- Maintenance ---

    /// Fold the WAL into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    /// Database size in bytes (page_count * page_size).
    pub fn db_size(&self) -> Result<u64> {
        let pages: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok((pages * page_size) as u64)
    }
}

type RawRecord = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_record(raw: RawRecord) -> Result<Record> {
    let (id, content, category, project, tags_json, timestamp) = raw;
    let category = match category {
        Some(c) => Some(c.parse::<Category>().map_err(|e| {
            StoreError::InvalidData(format!("record {id}: {e}"))
        })?),
        None => None,
    };
    let tags: Vec<String> = serde_json::from_str(&tags_json)?;
    Ok(Record {
        id,
        content,
        category,
        project,
        tags,
        timestamp,
    })
}

fn upsert_on(conn: &Connection, record: &Record) -> Result<()> {
    if record.id.trim().is_empty() {
        return Err(StoreError::InvalidData("record id is empty".to_string()));
    }
    let tags_json = serde_json::to_string(&record.tags)?;
    let project = record.project.as_deref().filter(|p| !p.trim().is_empty());

    conn.execute(
        "INSERT INTO records (id, content, category, project, tags, timestamp, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            content = excluded.content,
            category = excluded.category,
            project = excluded.project,
            tags = excluded.tags,
            timestamp = excluded.timestamp,
            updated_at = excluded.updated_at",
        params![
            record.id,
            record.content,
            record.category.map(|c| c.as_str()),
            project,
            tags_json,
            record.timestamp,
        ],
    )?;

    conn.execute("DELETE FROM record_tags WHERE record_id = ?1", [&record.id])?;
    let mut stmt =
        conn.prepare_cached("INSERT OR IGNORE INTO record_tags (record_id, tag) VALUES (?1, ?2)")?;
    for tag in &record.tags {
        stmt.execute(params![record.id, tag])?;
    }
    Ok(())
}
