use anyhow::Result;
use insightd::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let pool = db::connect(&app_config.database.path, app_config.database.max_pool_size).await?;
    let store = Arc::new(record_store::SqliteDeploymentStore::new(pool.clone()));
    store.init().await?;
    let chunk_repo = Arc::new(chunk_repo::ChunkRepo::new(pool));
    chunk_repo.init().await?;

    let collector = Arc::new(insight::Collector::new(
        store,
        app_config.collector.page_size,
    ));
    let shutdown = CancellationToken::new();

    let worker_handle = if app_config.collector.enabled {
        tracing::info!(
            targets = app_config.collector.targets.len(),
            schedule = ?app_config.collector.schedule,
            interval_secs = app_config.collector.interval_secs,
            "collector worker enabled"
        );
        Some(collector_worker::spawn(
            collector,
            chunk_repo.clone(),
            collector_worker::CollectorWorkerConfig {
                interval_secs: app_config.collector.interval_secs,
                schedule: app_config.collector.schedule.clone(),
                backfill_days: app_config.collector.backfill_days,
                targets: app_config.collector.targets.clone(),
            },
            shutdown.clone(),
        ))
    } else {
        None
    };

    let app = routes::app(chunk_repo);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    shutdown.cancel();
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }

    Ok(())
}
