// Scheduler module - polling loop and per-cycle orchestration
//
// One cycle runs at a time: the loop awaits each cycle before waiting for
// the next tick, and ticks missed by a slow cycle are skipped rather than
// burst. A cycle keeps the engine session alive, runs the API summary and
// the enabled entity collectors in a fixed order, appends the self-monitoring
// record and hands the batch to the sink.
//
// # Error handling
// - A failed session (re)open aborts the cycle
// - A failed class is reported and the cycle goes on with the next class
// - Past the cycle deadline, or once shutdown was requested, the remaining
//   classes are skipped without reporting anything

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::collector::{Collector, CollectorKind};
use crate::config::{ConfigError, PluginConfig};
use crate::error::CollectError;
use crate::filter::CollectorSelection;
use crate::metrics::records::SelfMetric;
use crate::metrics::{interval_precision, truncate_to, Accumulator, Batch, Measurement, MetricSink};
use crate::session::SessionManager;

/// Order in which the entity classes are collected after the API summary
const CLASS_ORDER: [CollectorKind; 5] = [
    CollectorKind::Datacenters,
    CollectorKind::Hosts,
    CollectorKind::StorageDomains,
    CollectorKind::GlusterVolumes,
    CollectorKind::Vms,
];

/// Share of the polling interval during which cached entity lists are reused
const DATA_DURATION_RATIO: f64 = 0.9;

/// Runs collection cycles against one engine
pub struct Gatherer {
    session: SessionManager,
    collector: Collector,
    selection: CollectorSelection,

    /// Engine host name (`ovirt-engine` tag)
    engine: String,
    alias: String,
    version: String,
    poll_interval: Duration,
    timeout: Duration,

    sessions_created: i64,
    /// A session has been established at least once
    got_an_answer: bool,
}

impl Gatherer {
    /// Creates a gatherer from the plugin configuration
    ///
    /// # Arguments
    /// * `session` - Session manager for the configured engine
    /// * `config` - Validated plugin configuration
    /// * `poll_interval` - Time between two cycles; also the cycle deadline
    /// * `version` - Collector version reported by the self-monitoring record
    pub fn new(
        session: SessionManager,
        config: &PluginConfig,
        poll_interval: Duration,
        version: &str,
    ) -> Result<Self, ConfigError> {
        let engine = config.engine_host()?;
        let collector = Collector::new(
            engine.clone(),
            config.filters()?,
            poll_interval.mul_f64(DATA_DURATION_RATIO),
            interval_precision(poll_interval),
        );

        debug!(
            "Entity lists of {} are cached for {}",
            engine,
            humantime::format_duration(collector.cache().data_duration())
        );

        Ok(Gatherer {
            session,
            collector,
            selection: config.collector_selection()?,
            engine,
            alias: config.internal_alias.clone(),
            version: version.to_string(),
            poll_interval,
            timeout: config.timeout,
            sessions_created: 0,
            got_an_answer: false,
        })
    }

    #[cfg(test)]
    pub fn sessions_created(&self) -> i64 {
        self.sessions_created
    }

    /// Runs one collection cycle into `acc`
    ///
    /// # Errors
    /// - `CollectError::Connection` when the session could not be (re)opened
    /// - `CollectError::Cancelled` when the deadline passed or shutdown was
    ///   requested; callers should not report it
    pub async fn gather(
        &mut self,
        acc: &mut dyn Accumulator,
        deadline: Instant,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<(), CollectError> {
        let start = Instant::now();
        self.keep_active_session(acc).await?;

        check_cancelled(deadline, shutdown)?;
        if let Err(e) = self.collector.collect_api_summary(&self.session, acc).await {
            report(e, acc)?;
        }

        for kind in CLASS_ORDER {
            if !self.selection.is_enabled(kind) {
                continue;
            }
            check_cancelled(deadline, shutdown)?;
            if let Err(e) = self.collector.collect(kind, &self.session, acc).await {
                report(e, acc)?;
            }
        }

        let metric = SelfMetric {
            alias: self.alias.clone(),
            engine: self.engine.clone(),
            version: self.version.clone(),
            gather_time_ns: i64::try_from(start.elapsed().as_nanos()).unwrap_or(i64::MAX),
            sessions_created: self.sessions_created,
        };
        let timestamp = truncate_to(Utc::now(), interval_precision(self.poll_interval));
        acc.add_record(metric.into_record(timestamp));
        Ok(())
    }

    /// Makes sure a working session exists, reopening it when the probe fails
    async fn keep_active_session(&mut self, acc: &mut dyn Accumulator) -> Result<(), CollectError> {
        if self.session.is_active().await {
            return Ok(());
        }
        if self.got_an_answer {
            acc.add_error(CollectError::Reauthenticating);
        }

        self.session.open(self.timeout).await?;
        self.got_an_answer = true;
        self.sessions_created += 1;
        // entities cached under the previous session may be long gone
        self.collector.reset_cache();
        Ok(())
    }

    pub async fn close(&mut self) {
        self.session.close().await;
    }
}

fn check_cancelled(deadline: Instant, shutdown: &watch::Receiver<bool>) -> Result<(), CollectError> {
    if *shutdown.borrow() || Instant::now() >= deadline {
        return Err(CollectError::Cancelled);
    }
    Ok(())
}

/// Reports a class error, passing cancellation through
fn report(err: CollectError, acc: &mut dyn Accumulator) -> Result<(), CollectError> {
    if err.is_cancelled() {
        return Err(err);
    }
    acc.add_error(err);
    Ok(())
}

/// Periodic collection driver
pub struct MetricScheduler {
    gatherer: Gatherer,
    sink: Box<dyn MetricSink>,
}

impl MetricScheduler {
    pub fn new(gatherer: Gatherer, sink: Box<dyn MetricSink>) -> Self {
        MetricScheduler { gatherer, sink }
    }

    /// Runs cycles on every tick until `shutdown` turns true, then closes
    /// the engine session
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) {
        let poll_interval = self.gatherer.poll_interval;
        info!(
            "Starting collection loop for {} (every {}, sink: {})",
            self.gatherer.engine,
            humantime::format_duration(poll_interval),
            self.sink.name()
        );

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }
            self.run_cycle(&shutdown).await;
        }

        info!("Stopping collection loop");
        self.gatherer.close().await;
    }

    /// Runs a single cycle and closes the session (used by `--once`)
    ///
    /// Returns the number of records published.
    pub async fn collect_once(&mut self) -> usize {
        info!("Running one-time collection");
        let (_keep, shutdown) = watch::channel(false);
        let published = self.run_cycle(&shutdown).await;
        self.gatherer.close().await;
        published
    }

    async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> usize {
        let mut batch = Batch::new();
        let deadline = Instant::now() + self.gatherer.poll_interval;

        match self.gatherer.gather(&mut batch, deadline, shutdown).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!("Collection cycle cancelled"),
            Err(e) => error!("Failed to gather metrics: {}", e),
        }

        for err in batch.errors() {
            match err {
                CollectError::Reauthenticating => info!("{}", err),
                _ => warn!("{}", err),
            }
        }

        let count = batch.records().len();
        if count == 0 {
            return 0;
        }
        match self.sink.publish(&batch).await {
            Ok(()) => {
                debug!("Published {} record(s) to {}", count, self.sink.name());
                count
            }
            Err(e) => {
                error!("Failed to publish {} record(s) to {}: {}", count, self.sink.name(), e);
                0
            }
        }
    }
}
