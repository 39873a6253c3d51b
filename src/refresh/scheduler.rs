use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use crate::error::{Error, Result};
use crate::observability::metrics::REFRESH_TICKS_DROPPED;
use crate::refresh::orchestrator::RefreshOrchestrator;
use crate::refresh::result::{RefreshResult, Trigger};

type CycleOutcome = std::result::Result<Arc<RefreshResult>, String>;

enum SchedulerState {
    Idle,
    Running {
        trigger: Trigger,
        done: watch::Receiver<Option<CycleOutcome>>,
    },
}

/// Outcome of asking the scheduler for a cycle.
enum Admission {
    Started(watch::Receiver<Option<CycleOutcome>>),
    Joined(Trigger, watch::Receiver<Option<CycleOutcome>>),
}

/// Serializes timer-driven and on-demand refresh cycles.
///
/// ## Policy
/// - At most one cycle runs at a time.
/// - A timer tick that finds a cycle running is dropped.
/// - A manual trigger that finds a cycle running waits for that cycle and
///   returns its result.
/// - Cycles run in their own task: a caller that goes away does not cut a
///   cycle short.
pub struct Scheduler {
    orchestrator: Arc<RefreshOrchestrator>,
    state: Arc<Mutex<SchedulerState>>,
    interval: Duration,
    run_on_startup: bool,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>, interval: Duration, run_on_startup: bool) -> Self {
        Scheduler {
            orchestrator,
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            interval,
            run_on_startup,
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, SchedulerState::Running { .. })
    }

    /// Runs a cycle now, or joins the one in flight, and waits for its result.
    pub async fn trigger_manual(&self) -> Result<Arc<RefreshResult>> {
        let done = match self.admit(Trigger::Manual).await {
            Admission::Started(done) => done,
            Admission::Joined(running, done) => {
                tracing::info!("Refresh already running ({} trigger); waiting for it", running);
                done
            }
        };
        Self::wait(done).await
    }

    /// One timer tick. `Ok(None)` when the tick was dropped.
    pub async fn tick(&self) -> Result<Option<Arc<RefreshResult>>> {
        match self.admit(Trigger::Scheduled).await {
            Admission::Started(done) => Self::wait(done).await.map(Some),
            Admission::Joined(running, _) => {
                REFRESH_TICKS_DROPPED.inc();
                tracing::info!("Scheduled refresh skipped: {} cycle still running", running);
                Ok(None)
            }
        }
    }

    /// Timer loop. Runs until `shutdown` flips to true or its sender is dropped.
    /// An in-flight cycle is allowed to finish first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let first_tick = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Scheduler started, refreshing every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick()
                        .await
                        .and_then(|result| match result {
                            Some(result) => result.ensure_store_reached(),
                            None => Ok(()),
                        });
                    if let Err(e) = outcome {
                        tracing::error!("Scheduled refresh failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    async fn admit(&self, trigger: Trigger) -> Admission {
        let mut state = self.state.lock().await;
        if let SchedulerState::Running { trigger: running, done } = &*state {
            return Admission::Joined(*running, done.clone());
        }

        let (tx, rx) = watch::channel(None);
        *state = SchedulerState::Running {
            trigger,
            done: rx.clone(),
        };
        drop(state);

        let orchestrator = self.orchestrator.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            // The inner task isolates a panicking cycle so the state still resets.
            let cycle = tokio::spawn(async move { orchestrator.run_cycle(trigger).await }).await;

            *state.lock().await = SchedulerState::Idle;

            let outcome = cycle
                .map(Arc::new)
                .map_err(|e| e.to_string());
            if let Err(e) = &outcome {
                tracing::error!("Refresh cycle task failed: {}", e);
            }
            let _ = tx.send(Some(outcome));
        });

        Admission::Started(rx)
    }

    async fn wait(mut done: watch::Receiver<Option<CycleOutcome>>) -> Result<Arc<RefreshResult>> {
        let outcome = done.wait_for(Option::is_some)
            .await
            .map_err(|_| Error::CycleAborted("cycle task dropped its result".into()))?;

        match &*outcome {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(e)) => Err(Error::CycleAborted(e.clone())),
            None => Err(Error::CycleAborted("cycle finished without a result".into())),
        }
    }
}
