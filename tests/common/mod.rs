// Shared test helpers: in-memory deployment store, timestamps, record builders

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use insightd::models::{DeploymentRecord, DeploymentStatus};
use insightd::record_store::{
    DeploymentStore, Direction, Field, FilterValue, ListFilter, ListOptions, ListPage, Operator,
    StoreError,
};
use tokio_util::sync::CancellationToken;

/// Unix seconds for a UTC date/hour.
pub fn ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("valid test date")
        .timestamp()
}

pub fn deployment(id: &str, app: &str, created_at: i64, status: DeploymentStatus) -> DeploymentRecord {
    DeploymentRecord {
        id: id.to_string(),
        application_id: app.to_string(),
        created_at,
        status,
    }
}

/// `n` successful deployments of `app` at `created_at`, ids `<prefix>-0..n`.
pub fn deployments_at(prefix: &str, app: &str, created_at: i64, n: usize) -> Vec<DeploymentRecord> {
    (0..n)
        .map(|i| {
            deployment(
                &format!("{}-{}", prefix, i),
                app,
                created_at,
                DeploymentStatus::Success,
            )
        })
        .collect()
}

/// In-memory `DeploymentStore` with the same query semantics as the SQLite store
/// (conjunctive filters, ordering, offset cursors). Records every call and can fail or cancel
/// on a given call.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<DeploymentRecord>>,
    calls: Mutex<Vec<ListOptions>>,
    fail_on_call: Mutex<Option<usize>>,
    cancel_on_call: Mutex<Option<(usize, CancellationToken)>>,
}

impl MemoryStore {
    pub fn new(records: Vec<DeploymentRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn push(&self, records: Vec<DeploymentRecord>) {
        self.records.lock().unwrap().extend(records);
    }

    /// Calls so far, in order.
    pub fn calls(&self) -> Vec<ListOptions> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Call number `n` (0-based, counted from now on) returns `StoreError::Unavailable`.
    pub fn fail_on_call(&self, n: usize) {
        let offset = self.calls.lock().unwrap().len();
        *self.fail_on_call.lock().unwrap() = Some(offset + n);
    }

    /// Cancels `token` while serving call number `n` (0-based, counted from now on).
    pub fn cancel_on_call(&self, n: usize, token: CancellationToken) {
        let offset = self.calls.lock().unwrap().len();
        *self.cancel_on_call.lock().unwrap() = Some((offset + n, token));
    }

    fn serve(&self, options: &ListOptions) -> Result<ListPage, StoreError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(options.clone());
            calls.len() - 1
        };
        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        if let Some((n, token)) = self.cancel_on_call.lock().unwrap().as_ref() {
            if *n == call {
                token.cancel();
            }
        }

        let mut matched = Vec::new();
        for r in self.records.lock().unwrap().iter() {
            let mut keep = true;
            for f in &options.filters {
                keep &= matches(r, f)?;
            }
            if keep {
                matched.push(r.clone());
            }
        }
        matched.sort_by(|a, b| {
            options
                .orders
                .iter()
                .map(|o| {
                    let ord = compare(a, b, o.field);
                    match o.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset: usize = match options.cursor.as_deref() {
            None => 0,
            Some(c) => c
                .parse()
                .map_err(|_| StoreError::InvalidCursor(c.to_string()))?,
        };
        let records: Vec<_> = matched
            .into_iter()
            .skip(offset)
            .take(options.page_size)
            .collect();
        let next_cursor = (records.len() == options.page_size)
            .then(|| (offset + records.len()).to_string());
        Ok(ListPage {
            records,
            next_cursor,
        })
    }
}

impl DeploymentStore for MemoryStore {
    async fn list_deployments(&self, options: &ListOptions) -> Result<ListPage, StoreError> {
        self.serve(options)
    }
}

fn matches(r: &DeploymentRecord, f: &ListFilter) -> Result<bool, StoreError> {
    let ok = match (f.field, f.operator, &f.value) {
        (Field::CreatedAt, Operator::Gte, FilterValue::Int(v)) => r.created_at >= *v,
        (Field::CreatedAt, Operator::Lt, FilterValue::Int(v)) => r.created_at < *v,
        (Field::CreatedAt, Operator::Eq, FilterValue::Int(v)) => r.created_at == *v,
        (Field::ApplicationId, Operator::Eq, FilterValue::Text(v)) => &r.application_id == v,
        (Field::Id, Operator::Eq, FilterValue::Text(v)) => &r.id == v,
        (Field::Status, Operator::In, FilterValue::Statuses(v)) => v.contains(&r.status),
        _ => return Err(StoreError::UnsupportedFilter(f.to_string())),
    };
    Ok(ok)
}

fn compare(a: &DeploymentRecord, b: &DeploymentRecord, field: Field) -> Ordering {
    match field {
        Field::Id => a.id.cmp(&b.id),
        Field::ApplicationId => a.application_id.cmp(&b.application_id),
        Field::CreatedAt => a.created_at.cmp(&b.created_at),
        Field::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}
