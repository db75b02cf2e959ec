pub mod merge;
pub mod store;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::parser::ParsedItem;

pub use merge::{Admission, Catalog};
pub use store::CatalogStore;

/// One scraped showcase entry, as persisted in the catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub local_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub award: Option<String>,
    /// Hex colors, most appealing first.
    #[serde(default)]
    pub palette: Vec<String>,
    /// Written as RFC 3339. Offset-less timestamps are read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub scraped_at: DateTime<Utc>,
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw)))
}

/// RFC 3339, or an ISO-8601 local date-time without offset taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl CatalogEntry {
    /// Assign a fresh id and capture time to a parsed listing item.
    pub fn from_item(item: ParsedItem) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: item.url,
            title: item.title,
            description: item.description,
            image_url: item.image_url,
            local_image: None,
            tags: item.tags,
            award: item.award,
            palette: Vec::new(),
            scraped_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(url: &str) -> CatalogEntry {
    CatalogEntry::from_item(ParsedItem {
        url: url.to_string(),
        ..ParsedItem::default()
    })
}
