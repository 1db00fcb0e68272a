//! JSON wire format for records exchanged with the storage layer and
//! exporters.
//!
//! Field names are camelCase. Input may be a bare array of records or the
//! versioned envelope written by [`export_records`]. Lenient on optional
//! fields: unknown categories are dropped, `null` tags become empty, and
//! `createdAt` is accepted as an alias for `timestamp`.

use serde::{Deserialize, Serialize};

use crate::record::{Category, Record};
use crate::time::now_iso8601;

pub const CURRENT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug)]
pub struct WireExport {
    pub version: String,
    #[serde(rename = "exportedAt", default)]
    pub exported_at: String,
    pub records: Vec<WireRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireRecord {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<String>,
}

impl WireRecord {
    pub fn into_record(self) -> Record {
        Record {
            id: self.id,
            content: self.content,
            category: self.category.as_deref().and_then(Category::from_str_lossy),
            project: self.project.filter(|p| !p.trim().is_empty()),
            tags: self.tags.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            category: record.category.map(|c| c.as_str().to_string()),
            project: record.project.clone(),
            tags: Some(record.tags.clone()),
            timestamp: Some(record.timestamp.clone()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireDocument {
    Envelope(WireExport),
    Bare(Vec<WireRecord>),
}

/// Parse records from either wire shape.
pub fn parse_records(json: &str) -> Result<Vec<Record>, serde_json::Error> {
    let wire = match serde_json::from_str::<WireDocument>(json)? {
        WireDocument::Envelope(export) => export.records,
        WireDocument::Bare(records) => records,
    };
    Ok(wire.into_iter().map(WireRecord::into_record).collect())
}

/// Serialize records into the versioned envelope.
pub fn export_records(records: &[Record]) -> Result<String, serde_json::Error> {
    let wire = WireExport {
        version: CURRENT_VERSION.to_string(),
        exported_at: now_iso8601(),
        records: records.iter().map(WireRecord::from_record).collect(),
    };
    serde_json::to_string_pretty(&wire)
}
