// SQLite-backed deployment store. Cursors are row offsets into the ordered result of one query.

use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::instrument;

use super::{
    DeploymentStore, Direction, Field, FilterValue, ListFilter, ListOptions, ListPage, Operator,
    StoreError,
};
use crate::models::{DeploymentRecord, DeploymentStatus};

pub struct SqliteDeploymentStore {
    pool: SqlitePool,
}

impl SqliteDeploymentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deployments (
                id TEXT PRIMARY KEY,
                application_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_deployments_app_created_at ON deployments(application_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace records (the store owns them; the collector only reads).
    #[instrument(skip(self, records), fields(store = "deployments", operation = "insert_deployments", records_count = records.len()))]
    pub async fn insert_deployments(&self, records: &[DeploymentRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in records {
            sqlx::query(
                "INSERT OR REPLACE INTO deployments (id, application_id, created_at, status) VALUES ($1, $2, $3, $4)",
            )
            .bind(&r.id)
            .bind(&r.application_id)
            .bind(r.created_at)
            .bind(r.status.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl DeploymentStore for SqliteDeploymentStore {
    #[instrument(skip(self, options), fields(store = "deployments", operation = "list_deployments", page_size = options.page_size))]
    async fn list_deployments(&self, options: &ListOptions) -> Result<ListPage, StoreError> {
        let offset: i64 = match options.cursor.as_deref() {
            None => 0,
            Some(c) => c
                .parse()
                .ok()
                .filter(|o: &i64| *o >= 0)
                .ok_or_else(|| StoreError::InvalidCursor(c.to_string()))?,
        };

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, application_id, created_at, status FROM deployments");
        for (i, filter) in options.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            push_filter(&mut qb, filter)?;
        }
        for (i, order) in options.orders.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(column(order.field));
            qb.push(match order.direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
        }
        qb.push(" LIMIT ");
        qb.push_bind(options.page_size as i64);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            let status = status
                .parse::<DeploymentStatus>()
                .map_err(|reason| StoreError::Corrupt {
                    id: id.clone(),
                    reason,
                })?;
            records.push(DeploymentRecord {
                id,
                application_id: row.try_get("application_id")?,
                created_at: row.try_get("created_at")?,
                status,
            });
        }

        let next_cursor = (options.page_size > 0 && records.len() == options.page_size)
            .then(|| (offset + records.len() as i64).to_string());
        Ok(ListPage {
            records,
            next_cursor,
        })
    }
}

fn column(field: Field) -> &'static str {
    match field {
        Field::Id => "id",
        Field::ApplicationId => "application_id",
        Field::CreatedAt => "created_at",
        Field::Status => "status",
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) -> Result<(), StoreError> {
    qb.push(column(filter.field));
    match (filter.operator, &filter.value) {
        (Operator::In, FilterValue::Statuses(statuses)) => {
            if statuses.is_empty() {
                qb.push(" IN (NULL)");
                return Ok(());
            }
            qb.push(" IN (");
            let mut sep = qb.separated(", ");
            for s in statuses {
                sep.push_bind(s.as_str());
            }
            sep.push_unseparated(")");
        }
        (op @ (Operator::Gte | Operator::Lt | Operator::Eq), value) => {
            qb.push(match op {
                Operator::Gte => " >= ",
                Operator::Lt => " < ",
                _ => " = ",
            });
            match value {
                FilterValue::Int(v) => {
                    qb.push_bind(*v);
                }
                FilterValue::Text(v) => {
                    qb.push_bind(v.clone());
                }
                FilterValue::Statuses(_) => {
                    return Err(StoreError::UnsupportedFilter(filter.to_string()));
                }
            }
        }
        _ => return Err(StoreError::UnsupportedFilter(filter.to_string())),
    }
    Ok(())
}
