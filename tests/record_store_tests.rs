// SqliteDeploymentStore tests: filters, ordering, paging, cursors, and a collector run over it

use std::sync::Arc;

use insightd::insight::{CollectionRequest, Collector};
use insightd::models::*;
use insightd::record_store::*;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn record(id: &str, app: &str, created_at: i64, status: DeploymentStatus) -> DeploymentRecord {
    DeploymentRecord {
        id: id.into(),
        application_id: app.into(),
        created_at,
        status,
    }
}

async fn test_store(dir: &TempDir) -> SqliteDeploymentStore {
    let path = dir.path().join("records.db");
    let pool = insightd::db::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    let store = SqliteDeploymentStore::new(pool);
    store.init().await.unwrap();
    store
        .insert_deployments(&[
            record("d1", "app", 100, DeploymentStatus::Success),
            record("d2", "app", 200, DeploymentStatus::Failure),
            record("d3", "app", 200, DeploymentStatus::Running),
            record("d4", "app", 300, DeploymentStatus::Success),
            record("x1", "other", 150, DeploymentStatus::Success),
        ])
        .await
        .unwrap();
    store
}

fn ordered() -> Vec<Order> {
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

fn ids(page: &ListPage) -> Vec<&str> {
    page.records.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn sqlite_store_applies_conjunctive_filters() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;

    let page = store
        .list_deployments(&ListOptions {
            filters: vec![
                ListFilter::new(Field::CreatedAt, Operator::Gte, FilterValue::Int(150)),
                ListFilter::new(Field::CreatedAt, Operator::Lt, FilterValue::Int(300)),
                ListFilter::new(
                    Field::ApplicationId,
                    Operator::Eq,
                    FilterValue::Text("app".into()),
                ),
            ],
            orders: ordered(),
            page_size: 50,
            cursor: None,
        })
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["d2", "d3"]);
    assert_eq!(page.next_cursor, None);
    assert_eq!(page.records[0].status, DeploymentStatus::Failure);
}

#[tokio::test]
async fn sqlite_store_status_in_filter() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;

    let page = store
        .list_deployments(&ListOptions {
            filters: vec![ListFilter::new(
                Field::Status,
                Operator::In,
                FilterValue::Statuses(vec![DeploymentStatus::Failure, DeploymentStatus::Success]),
            )],
            orders: ordered(),
            page_size: 50,
            cursor: None,
        })
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["d1", "x1", "d2", "d4"]);

    let none = store
        .list_deployments(&ListOptions {
            filters: vec![ListFilter::new(
                Field::Status,
                Operator::In,
                FilterValue::Statuses(vec![]),
            )],
            orders: vec![],
            page_size: 50,
            cursor: None,
        })
        .await
        .unwrap();
    assert!(none.records.is_empty());
}

#[tokio::test]
async fn sqlite_store_pages_with_cursor() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;
    let mut options = ListOptions {
        filters: vec![],
        orders: ordered(),
        page_size: 2,
        cursor: None,
    };

    let first = store.list_deployments(&options).await.unwrap();
    assert_eq!(ids(&first), vec!["d1", "x1"]);
    assert!(first.next_cursor.is_some());

    options.cursor = first.next_cursor.clone();
    let second = store.list_deployments(&options).await.unwrap();
    assert_eq!(ids(&second), vec!["d2", "d3"]);

    options.cursor = second.next_cursor.clone();
    let third = store.list_deployments(&options).await.unwrap();
    assert_eq!(ids(&third), vec!["d4"]);
    assert_eq!(third.next_cursor, None);
}

#[tokio::test]
async fn sqlite_store_rejects_bad_cursor_and_filter() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;

    let err = store
        .list_deployments(&ListOptions {
            filters: vec![],
            orders: vec![],
            page_size: 2,
            cursor: Some("not-an-offset".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidCursor(_)));

    let err = store
        .list_deployments(&ListOptions {
            filters: vec![ListFilter::new(
                Field::CreatedAt,
                Operator::In,
                FilterValue::Int(1),
            )],
            orders: vec![],
            page_size: 2,
            cursor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedFilter(_)));
}

#[tokio::test]
async fn sqlite_store_insert_replaces_by_id() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;
    store
        .insert_deployments(&[record("d3", "app", 200, DeploymentStatus::Success)])
        .await
        .unwrap();
    store.insert_deployments(&[]).await.unwrap();

    let page = store
        .list_deployments(&ListOptions {
            filters: vec![ListFilter::new(
                Field::Id,
                Operator::Eq,
                FilterValue::Text("d3".into()),
            )],
            orders: vec![],
            page_size: 10,
            cursor: None,
        })
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].status, DeploymentStatus::Success);
}

#[tokio::test]
async fn collector_over_sqlite_store_counts_ties_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.db");
    let pool = insightd::db::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    let store = SqliteDeploymentStore::new(pool);
    store.init().await.unwrap();
    // 2020-10-11: 7 deployments at one instant, 2 later that day. Page size 3.
    let day = 1_602_374_400;
    let mut records: Vec<_> = (0..7)
        .map(|i| record(&format!("t{}", i), "app", day + 60, DeploymentStatus::Success))
        .collect();
    records.push(record("u1", "app", day + 120, DeploymentStatus::Success));
    records.push(record("u2", "app", day + 180, DeploymentStatus::Success));
    store.insert_deployments(&records).await.unwrap();

    let collector = Collector::new(Arc::new(store), 3);
    let request = CollectionRequest {
        application_id: "app".into(),
        kind: MetricKind::DeploymentFrequency,
        step: Step::Daily,
        range_from: day,
        range_to: day + 86_400,
    };
    let chunk = collector
        .collect(
            &request,
            Chunk::new("app", MetricKind::DeploymentFrequency),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        chunk.points(Step::Daily),
        &[DataPoint::DeployFrequency(DeployFrequency {
            timestamp: day,
            deploy_count: 9,
        })]
    );
    assert_eq!(chunk.accumulated_to, day + 180);
}
