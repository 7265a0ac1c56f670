//! Versioned layout document and read-time record migration.
//!
//! Records are kept as raw JSON inside the document and migrated only when
//! read, so a legacy record that no write touches keeps its stored shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;
use crate::types::{TerminalGroup, TerminalLayout, TerminalSpec};

/// Schema version written by this crate.
pub const STORAGE_VERSION: &str = "2.0.0";

/// Highest document major version this crate can read.
const SUPPORTED_MAJOR: u64 = 2;

/// Version assumed for documents written before the field existed.
const UNVERSIONED: &str = "1.0.0";

fn unversioned() -> String {
    UNVERSIONED.to_string()
}

// ─── Record shape ─────────────────────────────────────────────────

/// Persisted shape of one layout record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `groups: [...]`
    Current,
    /// Flat `terminals: [...]` without `groups`.
    Legacy,
}

impl RecordShape {
    /// `terminals` present AND `groups` absent ⇒ legacy. A JSON `null`
    /// counts as absent.
    pub fn detect(record: &Value) -> Self {
        let present = |key: &str| record.get(key).is_some_and(|v| !v.is_null());
        if present("terminals") && !present("groups") {
            Self::Legacy
        } else {
            Self::Current
        }
    }
}

/// Pre-grouping record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyLayout {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    terminals: Vec<TerminalSpec>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LegacyLayout> for TerminalLayout {
    fn from(legacy: LegacyLayout) -> Self {
        Self {
            id: legacy.id,
            name: legacy.name,
            description: legacy.description,
            groups: vec![TerminalGroup::new(0, legacy.terminals)],
            created_at: legacy.created_at,
            updated_at: legacy.updated_at,
        }
    }
}

/// Decode one stored record into the current shape.
pub fn migrate_record(shape: RecordShape, record: Value) -> Result<TerminalLayout, serde_json::Error> {
    match shape {
        RecordShape::Current => serde_json::from_value(record),
        RecordShape::Legacy => {
            let legacy: LegacyLayout = serde_json::from_value(record)?;
            tracing::debug!(id = %legacy.id, "migrating legacy layout record");
            Ok(legacy.into())
        }
    }
}

// ─── Document ─────────────────────────────────────────────────────

/// Root persisted object: `{ "version": "2.0.0", "layouts": { id: record } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default = "unversioned")]
    pub version: String,
    #[serde(default)]
    pub layouts: BTreeMap<String, Value>,
}

impl Default for LayoutDocument {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION.to_string(),
            layouts: BTreeMap::new(),
        }
    }
}

impl LayoutDocument {
    /// Parse a stored document, rejecting versions newer than supported.
    pub fn from_value(key: &str, value: Value) -> Result<Self, StorageError> {
        let doc: Self = serde_json::from_value(value).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        if major_version(&doc.version).is_some_and(|major| major > SUPPORTED_MAJOR) {
            return Err(StorageError::UnsupportedVersion {
                found: doc.version,
                supported: STORAGE_VERSION.to_string(),
            });
        }
        Ok(doc)
    }

    /// Encode for writing. Always stamps the current schema version.
    pub fn to_value(&self) -> Result<Value, StorageError> {
        let mut doc = self.clone();
        doc.version = STORAGE_VERSION.to_string();
        serde_json::to_value(&doc).map_err(StorageError::Encode)
    }

    /// Migrated record for `id`, if present.
    pub fn layout(&self, id: &str) -> Result<Option<TerminalLayout>, StorageError> {
        self.layouts
            .get(id)
            .map(|record| decode(id, record))
            .transpose()
    }

    /// All records, migrated.
    pub fn all_layouts(&self) -> Result<Vec<TerminalLayout>, StorageError> {
        self.layouts
            .iter()
            .map(|(id, record)| decode(id, record))
            .collect()
    }

    /// Insert or overwrite by `layout.id` in the current shape.
    pub fn insert(&mut self, layout: &TerminalLayout) -> Result<(), StorageError> {
        let record = serde_json::to_value(layout).map_err(StorageError::Encode)?;
        self.layouts.insert(layout.id.clone(), record);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.layouts.remove(id).is_some()
    }
}

fn decode(id: &str, record: &Value) -> Result<TerminalLayout, StorageError> {
    let shape = RecordShape::detect(record);
    migrate_record(shape, record.clone()).map_err(|source| StorageError::Corrupt {
        key: format!("layouts.{id}"),
        source,
    })
}

fn major_version(version: &str) -> Option<u64> {
    version.split('.').next()?.trim().parse().ok()
}
