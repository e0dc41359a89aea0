// src/sightings/sqlite.rs
//! SQLite-backed sighting store used by the server.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::{Sighting, SightingFields, SightingRepository};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sightings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    location TEXT,
    timeStamp TEXT,
    title TEXT,
    text TEXT
)
"#;

type Row = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn into_sighting((uuid, location, time_stamp, title, text): Row) -> Result<Sighting> {
    let uuid = Uuid::parse_str(&uuid).with_context(|| format!("stored uuid {uuid:?}"))?;
    Ok(Sighting {
        uuid,
        location,
        time_stamp,
        title,
        text,
    })
}

#[derive(Debug, Clone)]
pub struct SqliteSightings {
    pool: SqlitePool,
}

impl SqliteSightings {
    /// Connect to `url` (e.g. `sqlite:sightings.db?mode=rwc`) and create the
    /// table when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        // Each connection to `:memory:` opens its own empty database.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
        let options = if in_memory {
            options.max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            options
                .max_connections(5)
                .idle_timeout(Some(Duration::from_secs(60)))
        };
        let pool = options
            .connect(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        info!(target: "sightings", url, "connected to sightings database");
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("creating sightings table")?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl SightingRepository for SqliteSightings {
    async fn list(&self) -> Result<Vec<Sighting>> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT uuid, location, timeStamp, title, text FROM sightings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(into_sighting).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sighting>> {
        let row = sqlx::query_as::<_, Row>(
            "SELECT uuid, location, timeStamp, title, text FROM sightings WHERE uuid = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_sighting).transpose()
    }

    async fn create(&self, fields: SightingFields) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO sightings (uuid, location, timeStamp, title, text) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(fields.location)
        .bind(fields.time_stamp)
        .bind(fields.title)
        .bind(fields.text)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, fields: SightingFields) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE sightings SET location = ?, timeStamp = ?, title = ?, text = ? WHERE uuid = ?",
        )
        .bind(fields.location)
        .bind(fields.time_stamp)
        .bind(fields.title)
        .bind(fields.text)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM sightings WHERE uuid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> SightingFields {
        SightingFields {
            location: Some("Pendle Hill".into()),
            time_stamp: Some("21 December 2025, 14:00".into()),
            title: Some(title.into()),
            text: None,
        }
    }

    #[tokio::test]
    async fn crud_cycle_in_memory() {
        let repo = SqliteSightings::connect("sqlite::memory:").await.unwrap();
        let a = repo.create(fields("first")).await.unwrap();
        let b = repo.create(fields("second")).await.unwrap();
        assert_ne!(a, b);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].uuid, a);
        assert_eq!(all[1].title.as_deref(), Some("second"));
        assert_eq!(all[0].text, None);

        assert!(repo.update(a, fields("renamed")).await.unwrap());
        let got = repo.get(a).await.unwrap().unwrap();
        assert_eq!(got.title.as_deref(), Some("renamed"));
        assert_eq!(got.time_stamp.as_deref(), Some("21 December 2025, 14:00"));

        assert!(repo.delete(a).await.unwrap());
        assert!(!repo.delete(a).await.unwrap());
        assert!(repo.get(a).await.unwrap().is_none());
        assert!(!repo.update(a, fields("ghost")).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn records_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("sightings.db").display());

        let id = {
            let repo = SqliteSightings::connect(&url).await.unwrap();
            let id = repo.create(fields("kept")).await.unwrap();
            repo.pool.close().await;
            id
        };

        let repo = SqliteSightings::connect(&url).await.unwrap();
        let got = repo.get(id).await.unwrap().expect("row persisted");
        assert_eq!(got.title.as_deref(), Some("kept"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
