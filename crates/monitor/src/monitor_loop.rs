//! Monitoring Loop Implementation

use signal_policy::Reading;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::engine::RiskEngine;
use crate::error::EngineError;
use crate::report::{CycleReport, Diagnostic};

/// Handle for pushing readings into a running [`MonitoringLoop`]
#[derive(Debug, Clone)]
pub struct ReadingSubmitter {
    tx: mpsc::Sender<Vec<Reading>>,
}

impl ReadingSubmitter {
    /// Queue a batch, waiting for capacity
    pub async fn submit_readings(&self, readings: Vec<Reading>) -> Result<(), EngineError> {
        self.tx
            .send(readings)
            .await
            .map_err(|_| EngineError::QueueClosed)
    }

    /// Queue a batch without waiting
    pub fn try_submit_readings(&self, readings: Vec<Reading>) -> Result<(), EngineError> {
        self.tx.try_send(readings).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EngineError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EngineError::QueueClosed,
        })
    }

    /// Loop has stopped and dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Periodic driver that batches submitted readings and runs each subject
/// concurrently through the engine
pub struct MonitoringLoop {
    engine: Arc<RiskEngine>,
    config: MonitorConfig,
    rx: mpsc::Receiver<Vec<Reading>>,
    /// Readings received since the last cycle
    pending: Vec<Reading>,
    cycle: u64,
    reports: Option<mpsc::Sender<CycleReport>>,
}

impl MonitoringLoop {
    /// Create a loop and the submitter that feeds it
    pub fn new(engine: Arc<RiskEngine>, config: MonitorConfig) -> (Self, ReadingSubmitter) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        info!(
            "Monitoring loop created (interval {:?}, queue {})",
            config.interval(),
            config.queue_capacity
        );

        let monitor = Self {
            engine,
            config,
            rx,
            pending: Vec::new(),
            cycle: 0,
            reports: None,
        };
        (monitor, ReadingSubmitter { tx })
    }

    /// Publish every cycle report on `tx` (dropped when the receiver lags)
    pub fn with_report_sink(mut self, tx: mpsc::Sender<CycleReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn engine(&self) -> &Arc<RiskEngine> {
        &self.engine
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Process one batch as a cycle
    ///
    /// Readings are grouped by subject keeping their submission order, and
    /// each subject runs as its own task. A subject that fails is reported
    /// as a diagnostic; the others are unaffected.
    pub async fn process_batch(&mut self, readings: Vec<Reading>) -> CycleReport {
        let started = Instant::now();
        self.cycle += 1;

        let mut report = CycleReport {
            cycle: self.cycle,
            readings: readings.len(),
            ..CycleReport::default()
        };

        let mut by_subject: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
        for reading in readings {
            by_subject
                .entry(reading.subject_id.clone())
                .or_default()
                .push(reading);
        }
        report.subjects = by_subject.len();

        let handles: Vec<_> = by_subject
            .into_iter()
            .map(|(subject_id, readings)| {
                let engine = self.engine.clone();
                let task_subject = subject_id.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    engine.process_subject(&task_subject, &readings)
                });
                (subject_id, handle)
            })
            .collect();

        for (subject_id, handle) in handles {
            match handle.await {
                Ok(outcome) => report.absorb(outcome),
                Err(e) => {
                    warn!("Subject {} failed in cycle {}: {}", subject_id, self.cycle, e);
                    report
                        .diagnostics
                        .push(Diagnostic::task(&subject_id, e.to_string()));
                }
            }
        }

        let elapsed = started.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;

        metrics::counter!("risk_readings_processed_total").increment(report.classified as u64);
        metrics::counter!("risk_cycles_total").increment(1);
        metrics::histogram!("risk_cycle_duration_seconds").record(elapsed.as_secs_f64());

        if report.is_clean() {
            info!(
                "Cycle {}: {} readings, {} subjects, {} raised, {} escalated, {} resolved",
                report.cycle,
                report.readings,
                report.subjects,
                report.raised(),
                report.escalated(),
                report.resolved()
            );
        } else {
            warn!(
                "Cycle {}: {} readings, {} subjects, {} diagnostics",
                report.cycle,
                report.readings,
                report.subjects,
                report.diagnostics.len()
            );
        }

        if let Some(tx) = &self.reports {
            // Non-blocking; a slow consumer misses reports
            let _ = tx.try_send(report.clone());
        }
        report
    }

    /// Run pending readings as a cycle, if there are any
    async fn flush(&mut self) -> Option<CycleReport> {
        if self.pending.is_empty() {
            debug!("No pending readings");
            return None;
        }
        let readings = std::mem::take(&mut self.pending);
        Some(self.process_batch(readings).await)
    }

    /// Run until `stop` is set to `true`, its sender is dropped, or every
    /// submitter is dropped
    ///
    /// Batches already queued when the loop stops are still processed.
    /// Returns the number of completed cycles.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> u64 {
        info!("Starting monitoring loop");

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                batch = self.rx.recv() => match batch {
                    Some(readings) => {
                        debug!("Queued {} readings", readings.len());
                        self.pending.extend(readings);
                        if self.config.process_on_push {
                            self.flush().await;
                        }
                    }
                    None => {
                        debug!("All submitters dropped");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        info!("Stopping monitoring loop");
        while let Ok(readings) = self.rx.try_recv() {
            self.pending.extend(readings);
        }
        self.flush().await;

        info!("Monitoring loop stopped after {} cycles", self.cycle);
        self.cycle
    }
}
