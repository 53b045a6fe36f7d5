use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{Bidder, CycleOutcome};

/// Why a refresh was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Timer,
    Credential,
    Rules,
    Exclusions,
    Manual,
}

impl Bidder {
    /// Drive refresh cycles until `dispose` is called
    ///
    /// Cycles start on the periodic timer (with jitter), on triggers sent
    /// through `request_refresh`, and right after every accepted bid. The
    /// timer restarts after every refresh.
    pub async fn run(self: Arc<Self>) {
        let receiver = self.trigger_rx.lock().take();
        let Some(mut triggers) = receiver else {
            warn!("Bidding loop already running");
            return;
        };
        let mut shutdown = self.shutdown.subscribe();

        let mut ticker = tokio::time::interval(self.timings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            "Bidding loop started, refreshing every {:?}",
            self.timings.poll_interval
        );
        self.request_refresh(Trigger::Startup);

        loop {
            let trigger = tokio::select! {
                _ = shutdown.changed() => break,
                received = triggers.recv() => match received {
                    Some(trigger) => trigger,
                    None => break,
                },
                _ = ticker.tick() => Trigger::Timer,
            };

            if trigger == Trigger::Timer {
                let jitter = self.jitter();
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(jitter) => {}
                }
            }

            // Triggers queued meanwhile are served by this refresh
            while let Ok(extra) = triggers.try_recv() {
                debug!("Coalescing {:?} refresh", extra);
            }

            if self.is_disposed() {
                break;
            }
            debug!("Refresh triggered by {:?}", trigger);
            if trigger == Trigger::Manual {
                self.deps.oracle.invalidate();
            }
            self.drive().await;
            ticker.reset();
        }

        info!("Bidding loop stopped");
    }

    /// Run a cycle, then keep going while a bid was accepted or a refresh was parked
    pub async fn drive(&self) -> CycleOutcome {
        let mut outcome = self.run_cycle().await;
        loop {
            let follow_up = match outcome {
                CycleOutcome::BidPlaced { .. } => {
                    debug!("Bid accepted, refreshing immediately");
                    true
                }
                CycleOutcome::Disposed => false,
                _ => self.gate.take_pending().is_some(),
            };
            if !follow_up || self.is_disposed() {
                return outcome;
            }
            outcome = self.run_cycle().await;
        }
    }

    fn jitter(&self) -> Duration {
        let max = self.timings.poll_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}
