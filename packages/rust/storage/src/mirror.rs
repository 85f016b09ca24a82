//! libSQL mirror of the output table.
//!
//! Accepts either a local database path or a `libsql://` / `https://` remote
//! with an auth token. Rows get a UUIDv7 id and an RFC 3339 `created_at`.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use uuid::Uuid;

use portscout_core::RecordSink;
use portscout_shared::{MirrorSettings, PipelineRecord, Result, ScoutError};

use crate::migrations;

/// Relational copy of every persisted record.
pub struct MirrorStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn is_remote(url: &str) -> bool {
    ["libsql://", "https://", "http://", "wss://", "ws://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

impl MirrorStore {
    /// Connect to the database named by `settings` and apply migrations.
    pub async fn open(settings: &MirrorSettings) -> Result<Self> {
        let url = settings.url.trim();
        if is_remote(url) {
            let token = settings
                .auth_token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .unwrap_or_default();
            let db = libsql::Builder::new_remote(url.to_string(), token)
                .build()
                .await
                .map_err(|e| ScoutError::Storage(e.to_string()))?;
            info!(url, "connected to remote mirror");
            Self::from_database(db).await
        } else {
            Self::open_local(Path::new(url.strip_prefix("file:").unwrap_or(url))).await
        }
    }

    /// Open or create a local database file.
    pub async fn open_local(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ScoutError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ScoutError::Storage(e.to_string()))?;
        info!(path = %path.display(), "opened local mirror");
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| ScoutError::Storage(e.to_string()))?;
        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ScoutError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    /// Insert one record.
    pub async fn insert(&self, record: &PipelineRecord) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO portfolio_companies
                    (id, source_url, investor_name, investor_website, company_name,
                     company_website, article_1, article_2, article_3, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id.as_str(),
                    record.source_url.as_str(),
                    record.investor_name.as_str(),
                    record.investor_website.as_str(),
                    record.company_name.as_str(),
                    record.company_website.as_str(),
                    record.article_1.as_str(),
                    record.article_2.as_str(),
                    record.article_3.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| ScoutError::Storage(e.to_string()))?;

        debug!(company = %record.company_name, "mirrored record");
        Ok(())
    }

    /// Records mirrored for `source_url`, oldest first.
    pub async fn records_for(&self, source_url: &str) -> Result<Vec<PipelineRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT source_url, investor_name, investor_website, company_name,
                        company_website, article_1, article_2, article_3
                 FROM portfolio_companies WHERE source_url = ?1 ORDER BY rowid",
                params![source_url],
            )
            .await
            .map_err(|e| ScoutError::Storage(e.to_string()))?;

        let col = |row: &libsql::Row, idx: i32| {
            row.get::<String>(idx)
                .map_err(|e| ScoutError::Storage(e.to_string()))
        };

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ScoutError::Storage(e.to_string()))?
        {
            records.push(PipelineRecord {
                source_url: col(&row, 0)?,
                investor_name: col(&row, 1)?,
                investor_website: col(&row, 2)?,
                company_name: col(&row, 3)?,
                company_website: col(&row, 4)?,
                article_1: col(&row, 5)?,
                article_2: col(&row, 6)?,
                article_3: col(&row, 7)?,
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordSink for MirrorStore {
    async fn append(&self, record: &PipelineRecord) -> Result<()> {
        self.insert(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_mirror() -> MirrorStore {
        let tmp = std::env::temp_dir().join(format!("portscout_test_{}.db", Uuid::now_v7()));
        MirrorStore::open_local(&tmp).await.expect("open mirror")
    }

    fn record(company: &str) -> PipelineRecord {
        PipelineRecord {
            source_url: "https://examplepe.com/portfolio".into(),
            investor_name: "Examplepe".into(),
            investor_website: "https://examplepe.com".into(),
            company_name: company.into(),
            company_website: "https://acmecorp.com".into(),
            article_1: "https://www.reuters.com/article/acme-merger".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let mirror = test_mirror().await;
        mirror.append(&record("Acme Corp")).await.expect("append");
        mirror.append(&record("Beta Labs")).await.expect("append");

        let rows = mirror
            .records_for("https://examplepe.com/portfolio")
            .await
            .expect("query");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], record("Acme Corp"));
        assert_eq!(rows[1].company_name, "Beta Labs");
        assert!(rows[1].article_2.is_empty());

        assert!(mirror.records_for("https://other.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_skips_applied_migrations() {
        let tmp = std::env::temp_dir().join(format!("portscout_test_{}.db", Uuid::now_v7()));
        let first = MirrorStore::open_local(&tmp).await.unwrap();
        first.append(&record("Acme Corp")).await.unwrap();
        drop(first);

        let settings = MirrorSettings {
            url: format!("file:{}", tmp.display()),
            auth_token: None,
        };
        let second = MirrorStore::open(&settings).await.expect("reopen");
        assert_eq!(second.get_schema_version().await, 1);
        let rows = second
            .records_for("https://examplepe.com/portfolio")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("libsql://portscout-acme.turso.io"));
        assert!(is_remote("https://db.example.com"));
        assert!(!is_remote("output/mirror.db"));
        assert!(!is_remote("file:output/mirror.db"));
    }
}
