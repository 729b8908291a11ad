use std::time::Duration;

use futures_util::future::join_all;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{clock, db::{MessageType, Participant, Store, BROADCAST}};

pub const LEFT: &str = "left the room";

/// Outcome of one sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<String>,
    pub failed: usize,
}

/// Evicts participants that have been silent for at least `threshold`.
#[derive(Clone)]
pub struct Reaper {
    store: Store,
    threshold_ms: i64,
}

impl Reaper {
    pub fn new(store: Store, threshold: Duration) -> Reaper {
        Reaper {
            store,
            threshold_ms: threshold.as_millis().try_into().unwrap_or(i64::MAX),
        }
    }

    /// One tick, judged against `now_ms`.
    ///
    /// Works off a snapshot of the participant list. A heartbeat landing after the snapshot does
    /// not save a participant that was already stale when read.
    pub async fn sweep_at(&self, now_ms: i64) -> SweepReport {
        let snapshot = match self.store.list_participants().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "could not read participants, skipping sweep");
                return SweepReport { evicted: Vec::new(), failed: 1 };
            }
        };

        let stale = snapshot
            .into_iter()
            .filter(|p| now_ms.saturating_sub(p.last_status) >= self.threshold_ms);

        let outcomes = join_all(stale.map(|p| self.evict(p, now_ms))).await;

        let mut report = SweepReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(Some(name)) => report.evicted.push(name),
                Ok(None) => {}
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Removes one participant and announces the departure. `None` when someone else got to it first.
    async fn evict(&self, participant: Participant, now_ms: i64) -> Result<Option<String>, sqlx::Error> {
        let Participant { id, name, .. } = participant;

        let removed = self.store.delete_participant(&id).await.inspect_err(|err| {
            tracing::warn!(%name, error = %err, "failed to remove idle participant");
        })?;
        if !removed {
            return Ok(None);
        }

        self.store
            .insert_message(&name, BROADCAST, LEFT, MessageType::Status, now_ms)
            .await
            .inspect_err(|err| {
                tracing::warn!(%name, error = %err, "removed idle participant but could not announce it");
            })?;

        tracing::info!(%name, "participant left (idle)");
        Ok(Some(name))
    }

    /// Runs a sweep every `period` until the returned handle is shut down.
    pub fn spawn(self, period: Duration) -> ReaperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = self.sweep_at(clock::now_ms()).await;
                        if !report.evicted.is_empty() || report.failed > 0 {
                            tracing::debug!(evicted = report.evicted.len(), failed = report.failed, "sweep finished");
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::debug!("reaper stopped");
        });

        ReaperHandle { stop_tx, task }
    }
}

pub struct ReaperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the loop and waits for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "reaper task ended abnormally");
        }
    }
}
