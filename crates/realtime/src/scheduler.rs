//! The ingestion orchestrator: one loop, a fixed 30 s cadence, per-operator
//! workers fanned out in parallel with independent timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use database::{queries, PgPool};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utility::holidays::MADRID_TZ;

use crate::classifier::AlertClassifier;
use crate::operators::{configured_operators, OperatorConfig};
use crate::platforms;
use crate::worker;

const TICK_INTERVAL: Duration = Duration::from_secs(30);
const TICK_DEADLINE: Duration = Duration::from_secs(60);
const WORKER_TIMEOUT: Duration = Duration::from_secs(45);
const STARTUP_DELAY: Duration = Duration::from_secs(5);
const HISTORY_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_fetch: Option<DateTime<Utc>>,
    pub fetch_count: u64,
    pub error_count: u64,
    pub interval_seconds: u64,
    pub operators: HashMap<String, OperatorCounters>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OperatorCounters {
    pub success: u64,
    pub errors: u64,
}

struct Inner {
    running: AtomicBool,
    fetch_count: AtomicU64,
    error_count: AtomicU64,
    last_fetch: RwLock<Option<DateTime<Utc>>>,
    per_operator: Mutex<HashMap<String, OperatorCounters>>,
    last_history_cleanup: Mutex<Option<NaiveDate>>,
}

#[derive(Clone)]
pub struct IngestionScheduler {
    pool: PgPool,
    http: reqwest::Client,
    operators: Arc<Vec<OperatorConfig>>,
    classifier: Arc<dyn AlertClassifier>,
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

impl IngestionScheduler {
    pub fn new(pool: PgPool, classifier: Arc<dyn AlertClassifier>) -> Self {
        Self {
            pool,
            http: reqwest::Client::new(),
            operators: Arc::new(configured_operators()),
            classifier,
            inner: Arc::new(Inner {
                running: AtomicBool::new(false),
                fetch_count: AtomicU64::new(0),
                error_count: AtomicU64::new(0),
                last_fetch: RwLock::new(None),
                per_operator: Mutex::new(HashMap::new()),
                last_history_cleanup: Mutex::new(None),
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.inner.running.load(Ordering::Relaxed),
            last_fetch: *self.inner.last_fetch.read().expect("status lock poisoned"),
            fetch_count: self.inner.fetch_count.load(Ordering::Relaxed),
            error_count: self.inner.error_count.load(Ordering::Relaxed),
            interval_seconds: TICK_INTERVAL.as_secs(),
            operators: self
                .inner
                .per_operator
                .lock()
                .expect("status lock poisoned")
                .clone(),
        }
    }

    /// Spawn the fetch loop. A tick that overruns the interval makes the
    /// next one fire immediately, without accumulating a backlog.
    pub fn start(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        scheduler.inner.running.store(true, Ordering::Relaxed);
        log::info!(
            "ingestion scheduler started: {} operators, {}s interval",
            self.operators.len(),
            TICK_INTERVAL.as_secs()
        );

        tokio::spawn(async move {
            tokio::time::sleep(STARTUP_DELAY).await;
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = scheduler.cancel.cancelled() => {
                        log::info!("ingestion scheduler stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        scheduler.run_tick().await;
                    }
                }
            }
            scheduler.inner.running.store(false, Ordering::Relaxed);
        })
    }

    /// Request cancellation. In-flight workers finish their current HTTP
    /// call, bounded by the worker timeout.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn run_tick(&self) {
        match tokio::time::timeout(TICK_DEADLINE, self.tick_inner()).await {
            Ok(totals) => {
                self.inner.fetch_count.fetch_add(1, Ordering::Relaxed);
                *self.inner.last_fetch.write().expect("status lock poisoned") =
                    Some(Utc::now());
                log::info!(
                    "ingestion tick #{}: {} positions, {} trip updates, {} alerts",
                    self.inner.fetch_count.load(Ordering::Relaxed),
                    totals.positions,
                    totals.trip_updates,
                    totals.alerts,
                );
            }
            Err(_) => {
                self.inner.error_count.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "ingestion tick exceeded the {}s deadline",
                    TICK_DEADLINE.as_secs()
                );
            }
        }
    }

    async fn tick_inner(&self) -> worker::FetchCounts {
        self.evict_stale().await;

        let workers = self.operators.iter().map(|config| {
            let pool = self.pool.clone();
            let http = self.http.clone();
            let classifier = self.classifier.clone();
            async move {
                let result = tokio::time::timeout(
                    WORKER_TIMEOUT,
                    worker::fetch_operator(&pool, &http, config, classifier.as_ref()),
                )
                .await;
                (config.operator, result)
            }
        });

        let mut totals = worker::FetchCounts::default();
        for (operator, result) in futures::future::join_all(workers).await {
            let mut per_operator = self
                .inner
                .per_operator
                .lock()
                .expect("status lock poisoned");
            let counters = per_operator.entry(operator.code().to_owned()).or_default();
            match result {
                Ok(Ok(counts)) => {
                    counters.success += 1;
                    totals.positions += counts.positions;
                    totals.trip_updates += counts.trip_updates;
                    totals.alerts += counts.alerts;
                }
                Ok(Err(why)) => {
                    counters.errors += 1;
                    log::error!("{} fetch failed: {why}", operator.display_name());
                }
                Err(_) => {
                    counters.errors += 1;
                    log::error!(
                        "{} fetch timed out after {}s",
                        operator.display_name(),
                        WORKER_TIMEOUT.as_secs()
                    );
                }
            }
        }

        platforms::post_process(&self.pool, &self.http).await;

        totals
    }

    async fn evict_stale(&self) {
        match queries::realtime::cleanup_stale(&self.pool).await {
            Ok(counts) => {
                let total = counts.trip_updates
                    + counts.orphan_stop_time_updates
                    + counts.expired_alerts
                    + counts.stale_alerts;
                if total > 0 {
                    log::info!(
                        "evicted {} trip updates, {} orphan stop-time updates, {} expired alerts, {} stale alerts",
                        counts.trip_updates,
                        counts.orphan_stop_time_updates,
                        counts.expired_alerts,
                        counts.stale_alerts,
                    );
                }
            }
            Err(why) => log::warn!("stale-data eviction failed: {why}"),
        }

        // Platform history ages out once per local day.
        let today = Utc::now().with_timezone(&MADRID_TZ).date_naive();
        let due = {
            let mut last = self
                .inner
                .last_history_cleanup
                .lock()
                .expect("status lock poisoned");
            if *last == Some(today) {
                false
            } else {
                *last = Some(today);
                true
            }
        };
        if due {
            match queries::history::cleanup(&self.pool, HISTORY_RETENTION_DAYS).await {
                Ok(count) if count > 0 => {
                    log::info!("removed {count} platform-history rows past retention")
                }
                Ok(_) => {}
                Err(why) => log::warn!("platform-history cleanup failed: {why}"),
            }
        }
    }
}
