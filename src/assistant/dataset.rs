//! Reference dataset loaded from `data.json`.
//!
//! Every field is optional: a partially filled file still loads, and the
//! renderer decides what to show for whatever is missing. Each top-level
//! section is read on its own, so a broken section only empties that topic.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// `null` reads as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    /// Short numbers that work from mobiles, e.g. "112" → "ЕДДС".
    pub emergency: BTreeMap<String, String>,
    pub emergency_phones: Vec<EmergencyService>,
    pub electricity: Vec<PowerCompany>,
    pub utilities: Option<Utilities>,
    pub water: Option<Water>,
    pub administration: Option<Administration>,
    pub rules: Vec<String>,
    pub clinic: Option<Clinic>,
    pub bus_schedule: Vec<BusRoute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmergencyService {
    #[serde(deserialize_with = "null_as_default")]
    pub service: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phones: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PowerCompany {
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Utilities {
    pub garbage: Option<Garbage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Garbage {
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    pub service: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    pub hours: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Water {
    pub dispatcher: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Administration {
    pub position: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub hours: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Clinic {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub address: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub phones: Vec<String>,
    pub hours: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusRoute {
    #[serde(deserialize_with = "null_as_default")]
    pub route: String,
    #[serde(deserialize_with = "null_as_default")]
    pub departures: Vec<String>,
    pub note: Option<String>,
}

impl ReferenceDataset {
    /// Parse the dataset. Fails only when the document is not a JSON object;
    /// a section with bad values is logged and left empty.
    pub fn parse(json: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(json).map_err(|e| format!("Failed to parse: {e}"))?;
        let Value::Object(root) = value else {
            return Err("Failed to parse: expected a JSON object".to_string());
        };

        Ok(Self {
            emergency: section(&root, "emergency"),
            emergency_phones: section(&root, "emergency_phones"),
            electricity: section(&root, "electricity"),
            utilities: section(&root, "utilities"),
            water: section(&root, "water"),
            administration: section(&root, "administration"),
            rules: section(&root, "rules"),
            clinic: section(&root, "clinic"),
            bus_schedule: section(&root, "bus_schedule"),
        })
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let json = std::fs::read_to_string(path).map_err(|e| format!("Failed to read: {e}"))?;
        let dataset = Self::parse(&json)?;
        info!("📚 Loaded reference data from {:?}", path);
        Ok(dataset)
    }

    /// Load the dataset, or fall back to an empty one so every topic renders
    /// the "unavailable" placeholder instead of taking the bot down.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("Reference data {:?} unavailable, starting empty: {e}", path);
                Self::default()
            }
        }
    }

    pub fn garbage(&self) -> Option<&Garbage> {
        self.utilities.as_ref().and_then(|u| u.garbage.as_ref())
    }
}

/// Deserialize one top-level section, falling back to its default.
fn section<T: DeserializeOwned + Default>(root: &Map<String, Value>, name: &str) -> T {
    match root.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => T::deserialize(value).unwrap_or_else(|e| {
            warn!("Reference data section {name:?} is invalid, ignoring it: {e}");
            T::default()
        }),
    }
}
