// Background worker: every tick, extend each configured (application, kind) chunk up to now.
// Ticks come from a cron expression (local time) or a fixed interval.
// Keys are collected concurrently; the first failing key cancels the rest of the tick.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::chunk_repo::ChunkRepo;
use crate::config::CollectionTarget;
use crate::insight::{CollectionRequest, Collector};
use crate::models::{Chunk, MetricKind, Step};
use crate::record_store::DeploymentStore;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Config for the collector worker.
#[derive(Debug, Clone)]
pub struct CollectorWorkerConfig {
    pub interval_secs: u64,
    /// Optional cron expression (e.g. "0 0 * * * *" = hourly). Uses local time.
    pub schedule: Option<String>,
    pub backfill_days: u32,
    pub targets: Vec<CollectionTarget>,
}

/// Totals of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub chunks: u32,
    pub buckets_merged: u32,
    pub records: u64,
}

/// Spawns the collector worker. Stops when `shutdown` is cancelled.
pub fn spawn<S>(
    collector: Arc<Collector<S>>,
    repo: Arc<ChunkRepo>,
    config: CollectorWorkerConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    S: DeploymentStore + 'static,
{
    tokio::spawn(async move {
        run(collector, repo, config, shutdown).await;
    })
}

#[instrument(skip_all, fields(interval_secs = config.interval_secs, targets = config.targets.len()))]
async fn run<S>(
    collector: Arc<Collector<S>>,
    repo: Arc<ChunkRepo>,
    config: CollectorWorkerConfig,
    shutdown: CancellationToken,
) where
    S: DeploymentStore + 'static,
{
    let (tick_tx, mut tick_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(tick_scheduler(config.clone(), tick_tx, shutdown.clone()));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("collector worker shutting down");
                break;
            }
            received = tick_rx.recv() => {
                if received.is_none() {
                    break;
                }
                let now = chrono::Utc::now().timestamp();
                match run_one_tick(&collector, &repo, &config, now, &shutdown).await {
                    Ok(summary) => info!(
                        chunks = summary.chunks,
                        buckets_merged = summary.buckets_merged,
                        records = summary.records,
                        "collection tick"
                    ),
                    Err(e) => warn!(error = %e, "collection tick failed"),
                }
            }
        }
    }
}

/// Sends a message on `tx` at each tick time (cron or fixed interval). The first interval tick
/// fires immediately.
async fn tick_scheduler(
    config: CollectorWorkerConfig,
    tx: tokio::sync::mpsc::Sender<()>,
    shutdown: CancellationToken,
) {
    if let Some(ref cron_str) = config.schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid collector schedule; collection will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let delay = match schedule.after(&now).next() {
                Some(next) => (next - now).to_std().unwrap_or(Duration::from_secs(1)),
                None => Duration::from_secs(3600),
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            if tx.send(()).await.is_err() {
                break;
            }
        }
    } else {
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// Runs one collection pass over all targets with `now` as the requested horizon.
/// Used by the worker loop and callable directly (e.g. from tests or a one-off backfill).
pub async fn run_one_tick<S>(
    collector: &Arc<Collector<S>>,
    repo: &Arc<ChunkRepo>,
    config: &CollectorWorkerConfig,
    now: i64,
    shutdown: &CancellationToken,
) -> anyhow::Result<TickSummary>
where
    S: DeploymentStore + 'static,
{
    let group = shutdown.child_token();
    let backfill_from = now - i64::from(config.backfill_days) * SECS_PER_DAY;
    let mut tasks = JoinSet::new();

    for target in &config.targets {
        for &kind in &target.kinds {
            tasks.spawn(collect_key(
                collector.clone(),
                repo.clone(),
                target.application_id.clone(),
                kind,
                target.steps.clone(),
                backfill_from,
                now,
                group.clone(),
            ));
        }
    }

    let mut summary = TickSummary::default();
    let mut first_error: Option<anyhow::Error> = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(anyhow::Error::from).and_then(|r| r);
        match result {
            Ok(key) => {
                summary.chunks += 1;
                summary.buckets_merged += key.buckets_merged;
                summary.records += key.records;
            }
            Err(e) => {
                group.cancel();
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Collects every step of one (application, kind) chunk. Steps share the chunk, so they run in
/// sequence from the watermark the chunk had before this tick.
///
/// The watermark is shared by all steps, so it is only valid once every step reached it. When a
/// step fails, the committed buckets are saved for a single-step key; with several steps the
/// tick's work for this key is dropped and the next tick redoes it from the stored watermark.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(collector, repo, steps, cancel), fields(application_id = %application_id, kind = %kind))]
async fn collect_key<S>(
    collector: Arc<Collector<S>>,
    repo: Arc<ChunkRepo>,
    application_id: String,
    kind: MetricKind,
    steps: Vec<Step>,
    backfill_from: i64,
    now: i64,
    cancel: CancellationToken,
) -> anyhow::Result<TickSummary>
where
    S: DeploymentStore + 'static,
{
    let previous = repo.load(&application_id, kind).await?;
    let mut chunk = previous
        .clone()
        .unwrap_or_else(|| Chunk::new(&application_id, kind));
    let frontier = chunk.frontier();
    let range_from = if chunk.accumulated_to > 0 {
        chunk.accumulated_to
    } else {
        backfill_from
    };

    let mut summary = TickSummary {
        chunks: 1,
        ..TickSummary::default()
    };
    let single_step = steps.len() == 1;
    let mut failure = None;
    for step in steps {
        let request = CollectionRequest {
            application_id: application_id.clone(),
            kind,
            step,
            range_from,
            range_to: now,
        };
        match collector
            .collect_into(&request, &mut chunk, &frontier, &cancel)
            .await
        {
            Ok(walk) => {
                summary.buckets_merged += walk.buckets_merged;
                summary.records += walk.records;
            }
            Err(e) => {
                failure = Some((step, e));
                break;
            }
        }
    }

    let keep = failure.is_none() || single_step;
    if keep && previous.as_ref() != Some(&chunk) {
        repo.save(&chunk).await?;
    } else if !keep {
        warn!("step failed; discarding this tick's buckets for the key");
    }

    match failure {
        Some((step, e)) => Err(anyhow::Error::new(e).context(format!(
            "collect {} {} {}",
            application_id, kind, step
        ))),
        None => Ok(summary),
    }
}
