// Durable chunk storage: one BLOB row per chunk, keyed by the chunk's opaque file_path.

pub mod codec;

use anyhow::Context;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use crate::error::InsightError;
use crate::models::{Chunk, MetricKind, chunk_file_path};

pub struct ChunkRepo {
    pool: SqlitePool,
}

impl ChunkRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS insight_chunks (
                file_path TEXT PRIMARY KEY,
                application_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                accumulated_to INTEGER NOT NULL,
                data BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stored chunk for (application, kind), or `None` if it was never collected.
    #[instrument(skip(self), fields(repo = "chunks", operation = "load"))]
    pub async fn load(
        &self,
        application_id: &str,
        kind: MetricKind,
    ) -> anyhow::Result<Option<Chunk>> {
        let path = chunk_file_path(application_id, kind);
        let row = sqlx::query("SELECT data FROM insight_chunks WHERE file_path = $1")
            .bind(&path)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let data: Vec<u8> = row.try_get("data")?;
        let chunk = codec::decode(&data)
            .map_err(InsightError::from)
            .with_context(|| format!("decode chunk {}", path))?;
        Ok(Some(chunk))
    }

    #[instrument(
        skip(self, chunk),
        fields(repo = "chunks", operation = "save", file_path = %chunk.file_path)
    )]
    pub async fn save(&self, chunk: &Chunk) -> anyhow::Result<()> {
        let data = codec::encode(chunk).map_err(InsightError::from)?;
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO insight_chunks (file_path, application_id, kind, accumulated_to, data, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(file_path) DO UPDATE SET
                accumulated_to = excluded.accumulated_to,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&chunk.file_path)
        .bind(&chunk.application_id)
        .bind(chunk.kind.as_str())
        .bind(chunk.accumulated_to)
        .bind(&data)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// File paths of all stored chunks (for inspection).
    pub async fn list_paths(&self) -> anyhow::Result<Vec<String>> {
        let paths = sqlx::query_scalar::<_, String>(
            "SELECT file_path FROM insight_chunks ORDER BY file_path",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(paths)
    }
}
