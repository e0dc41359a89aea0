// src/sightings/mod.rs
//! Sighting records and the repository seam the HTTP layer talks to.

mod sqlite;

pub use sqlite::SqliteSightings;

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored sighting report.
///
/// `time_stamp` is kept exactly as submitted: usually a canonical instant,
/// but older records may hold display-formatted strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub uuid: Uuid,
    pub location: Option<String>,
    pub time_stamp: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
}

/// Client-supplied fields for create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingFields {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Sighting {
    pub(crate) fn from_fields(uuid: Uuid, f: SightingFields) -> Self {
        Self {
            uuid,
            location: f.location,
            time_stamp: f.time_stamp,
            title: f.title,
            text: f.text,
        }
    }
}

#[async_trait::async_trait]
pub trait SightingRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Sighting>>;
    async fn get(&self, id: Uuid) -> Result<Option<Sighting>>;
    /// Store a new record under a freshly generated v4 id.
    async fn create(&self, fields: SightingFields) -> Result<Uuid>;
    /// Returns `false` when no record has `id`.
    async fn update(&self, id: Uuid, fields: SightingFields) -> Result<bool>;
    /// Returns `false` when no record has `id`.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Process-local store, insertion ordered. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySightings {
    rows: RwLock<Vec<Sighting>>,
}

impl InMemorySightings {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> anyhow::Error {
    anyhow!("sightings store lock poisoned")
}

#[async_trait::async_trait]
impl SightingRepository for InMemorySightings {
    async fn list(&self) -> Result<Vec<Sighting>> {
        Ok(self.rows.read().map_err(poisoned)?.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sighting>> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.iter().find(|s| s.uuid == id).cloned())
    }

    async fn create(&self, fields: SightingFields) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.push(Sighting::from_fields(id, fields));
        Ok(id)
    }

    async fn update(&self, id: Uuid, fields: SightingFields) -> Result<bool> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|s| s.uuid == id) {
            Some(row) => {
                *row = Sighting::from_fields(id, fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let before = rows.len();
        rows.retain(|s| s.uuid != id);
        Ok(rows.len() != before)
    }
}
