//! Restaurant record ingestion.
//!
//! The scraper writes a JSON array of [`RestaurantRecord`]s. Each record is
//! flattened into a labelled text block so that a single passage carries
//! everything known about one restaurant, then stored under the id
//! `restaurant_{n}` (1-based position in the input).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use nugget_core::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::file_backend::FileStore;
use crate::in_memory::Document;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default)]
    pub contact: BTreeMap<String, String>,
    #[serde(default)]
    pub special: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Scraped prices are usually strings ("₹ 199") but sometimes bare numbers.
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RestaurantRecord {
    /// Flatten the record into the text block that gets indexed.
    ///
    /// Empty sections are omitted entirely.
    pub fn flatten(&self) -> String {
        let mut text = format!("Name: {}\n", non_empty(&self.name).unwrap_or("N/A"));

        if !self.locations.is_empty() {
            text.push_str("Locations:\n");
            for location in &self.locations {
                let _ = writeln!(text, "- {location}");
            }
        }

        if !self.menu.is_empty() {
            text.push_str("Menu Items:\n");
            for item in &self.menu {
                let _ = write!(text, "- {}", non_empty(&item.name).unwrap_or("Unnamed Item"));
                if let Some(description) = non_empty(&item.description) {
                    let _ = write!(text, ": {description}");
                }
                if let Some(price) = non_empty(&item.price) {
                    let _ = write!(text, " ({price})");
                }
                text.push('\n');
            }
        }

        if let Some(hours) = non_empty(&self.hours) {
            let _ = writeln!(text, "Hours: {hours}");
        }

        if !self.contact.is_empty() {
            text.push_str("Contact:\n");
            for (key, value) in &self.contact {
                let _ = writeln!(text, "- {key}: {value}");
            }
        }

        if !self.special.is_empty() {
            text.push_str("Special Information:\n");
            for special in &self.special {
                let _ = writeln!(text, "- {special}");
            }
        }

        text
    }

    /// Metadata stored alongside the flattened text.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "name".to_string(),
            non_empty(&self.name).unwrap_or("Unknown").to_string(),
        );
        metadata.insert("type".to_string(), "restaurant".to_string());
        if let Some(hours) = non_empty(&self.hours) {
            metadata.insert("hours".to_string(), hours.to_string());
        }
        metadata
    }

    /// The indexable document for the record at 0-based `position`.
    pub fn to_document(&self, position: usize) -> Document {
        Document {
            id: format!("restaurant_{}", position + 1),
            text: self.flatten(),
            metadata: self.metadata(),
        }
    }
}

/// Parse a JSON array of restaurant records.
pub fn parse_records(json: &str) -> Result<Vec<RestaurantRecord>, StoreError> {
    serde_json::from_str(json)
        .map_err(|e| StoreError::IngestFailed(format!("Invalid restaurant records: {e}")))
}

/// Read `path` and upsert every record into `store`. Returns the number of
/// documents written.
pub async fn ingest_file(path: &Path, store: &FileStore) -> Result<usize, StoreError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        StoreError::IngestFailed(format!("Failed to read {}: {e}", path.display()))
    })?;
    let records = parse_records(&json)?;

    let documents: Vec<Document> = records
        .iter()
        .enumerate()
        .map(|(i, record)| record.to_document(i))
        .collect();

    let count = store.upsert_all(documents).await?;
    info!(path = %path.display(), count, "Ingested restaurant records");
    Ok(count)
}
