// Query contract of the deployment record store: conjunctive (field, operator, value) filters,
// optional ordering, fixed page size and an opaque continuation cursor.

mod sqlite;

pub use sqlite::SqliteDeploymentStore;

use std::fmt;
use std::future::Future;

use crate::models::{DeploymentRecord, DeploymentStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid cursor {0:?}")]
    InvalidCursor(String),
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    ApplicationId,
    CreatedAt,
    Status,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "Id",
            Field::ApplicationId => "ApplicationId",
            Field::CreatedAt => "CreatedAt",
            Field::Status => "Status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gte,
    Lt,
    Eq,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Eq => "==",
            Operator::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Statuses(Vec<DeploymentStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub field: Field,
    pub operator: Operator,
    pub value: FilterValue,
}

impl ListFilter {
    pub fn new(field: Field, operator: Operator, value: FilterValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?}",
            self.field.as_str(),
            self.operator.as_str(),
            self.value
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub field: Field,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub filters: Vec<ListFilter>,
    pub orders: Vec<Order>,
    pub page_size: usize,
    /// Continuation from a previous page of the same query; `None` starts from the beginning.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub records: Vec<DeploymentRecord>,
    /// Set when the store may have more records for the same query.
    pub next_cursor: Option<String>,
}

/// Read side of the deployment record store.
pub trait DeploymentStore: Send + Sync {
    fn list_deployments(
        &self,
        options: &ListOptions,
    ) -> impl Future<Output = Result<ListPage, StoreError>> + Send;
}
