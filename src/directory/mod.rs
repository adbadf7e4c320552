//! Device directory: human-readable device and area names mapped to
//! control-server identifiers.
//!
//! Lookups are case-insensitive and exact. The persisted document keeps
//! whatever extra top-level keys it was loaded with so a load/save cycle
//! does not lose content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod store;

pub use store::{DirectoryStore, SharedDirectory};


/// Presence entity used when the document does not name one
pub const DEFAULT_PRESENCE_ENTITY: &str = "group.family";

/// Name → id mappings plus the default occupancy entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceDirectory {
    #[serde(default)]
    pub devices: BTreeMap<String, String>,
    #[serde(default)]
    pub areas: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_entity: Option<String>,
    /// Unrecognized top-level keys, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceDirectory {
    /// Case-insensitive exact lookup in `devices`
    pub fn resolve_device(&self, name: &str) -> Option<&str> {
        lookup(&self.devices, name)
    }

    /// Case-insensitive exact lookup in `areas`
    pub fn resolve_area(&self, name: &str) -> Option<&str> {
        lookup(&self.areas, name)
    }

    pub fn presence_entity(&self) -> &str {
        self.presence_entity
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_PRESENCE_ENTITY)
    }

    /// Insert or replace a device. An existing key differing only in case
    /// is replaced rather than duplicated.
    pub fn upsert_device(&mut self, name: &str, entity_id: &str) {
        upsert(&mut self.devices, name, entity_id);
    }

    pub fn upsert_area(&mut self, name: &str, area_id: &str) {
        upsert(&mut self.areas, name, area_id);
    }

    /// Returns false if no device matched.
    pub fn remove_device(&mut self, name: &str) -> bool {
        remove(&mut self.devices, name)
    }

    /// Returns false if no area matched.
    pub fn remove_area(&mut self, name: &str) -> bool {
        remove(&mut self.areas, name)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn matching_key(map: &BTreeMap<String, String>, name: &str) -> Option<String> {
    let wanted = normalize(name);
    map.keys().find(|k| normalize(k) == wanted).cloned()
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    let wanted = normalize(name);
    map.iter()
        .find(|(k, _)| normalize(k) == wanted)
        .map(|(_, v)| v.as_str())
}

fn upsert(map: &mut BTreeMap<String, String>, name: &str, id: &str) {
    let key = matching_key(map, name).unwrap_or_else(|| name.trim().to_string());
    map.insert(key, id.to_string());
}

fn remove(map: &mut BTreeMap<String, String>, name: &str) -> bool {
    match matching_key(map, name) {
        Some(key) => map.remove(&key).is_some(),
        None => false,
    }
}
