// Pages through the record store for one half-open window [lo, hi).
//
// Each page is requested with the floor `created_at >= floor`; after a page the floor moves to
// the largest `created_at` seen. Pages are requested in (created_at, id) order, so records tied
// with the floor come back on the next page; they are dropped by id. A page that cannot move the
// floor (everything sits on it) is continued with the store's cursor instead.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::InsightError;
use crate::models::{DeploymentRecord, DeploymentStatus};
use crate::record_store::{
    DeploymentStore, Direction, Field, FilterValue, ListFilter, ListOptions, Operator, Order,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;

pub struct IncrementalScanner<'a, S> {
    store: &'a S,
    page_size: usize,
}

impl<'a, S: DeploymentStore> IncrementalScanner<'a, S> {
    pub fn new(store: &'a S, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// All records of `application_id` with `lo <= created_at < hi` (and status in `statuses`
    /// when given), each at most once.
    pub async fn scan(
        &self,
        application_id: &str,
        lo: i64,
        hi: i64,
        statuses: Option<&[DeploymentStatus]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DeploymentRecord>, InsightError> {
        let mut floor = lo;
        let mut cursor: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let mut pages: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(InsightError::Cancelled);
            }
            let options = ListOptions {
                filters: scan_filters(application_id, floor, hi, statuses),
                orders: scan_orders(),
                page_size: self.page_size,
                cursor: cursor.take(),
            };
            let page = self.store.list_deployments(&options).await?;
            pages += 1;
            if page.records.is_empty() {
                break;
            }

            let page_max = page
                .records
                .iter()
                .map(|r| r.created_at)
                .max()
                .unwrap_or(floor);
            for record in page.records {
                if seen.insert(record.id.clone()) {
                    out.push(record);
                }
            }

            if page_max > floor {
                floor = page_max;
            } else {
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }

        trace!(application_id, lo, hi, pages, records = out.len(), "scan done");
        Ok(out)
    }
}

/// `CreatedAt >= lo`, `CreatedAt < hi`, optional `Status in [...]`, `ApplicationId == id`.
pub fn scan_filters(
    application_id: &str,
    lo: i64,
    hi: i64,
    statuses: Option<&[DeploymentStatus]>,
) -> Vec<ListFilter> {
    let mut filters = vec![
        ListFilter::new(Field::CreatedAt, Operator::Gte, FilterValue::Int(lo)),
        ListFilter::new(Field::CreatedAt, Operator::Lt, FilterValue::Int(hi)),
    ];
    if let Some(statuses) = statuses {
        filters.push(ListFilter::new(
            Field::Status,
            Operator::In,
            FilterValue::Statuses(statuses.to_vec()),
        ));
    }
    filters.push(ListFilter::new(
        Field::ApplicationId,
        Operator::Eq,
        FilterValue::Text(application_id.to_string()),
    ));
    filters
}

fn scan_orders() -> Vec<Order> {
    vec![
        Order {
            field: Field::CreatedAt,
            direction: Direction::Asc,
        },
        Order {
            field: Field::Id,
            direction: Direction::Asc,
        },
    ]
}
