use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Refresh trigger that could not start because a cycle was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRefresh {
    pub requested_at: Instant,
}

/// Serializes refresh cycles
///
/// At most one cycle holds the gate. A trigger arriving while a cycle is in
/// flight is parked in a single pending slot; further triggers collapse into
/// it. The slot is drained once the running cycle releases the gate.
#[derive(Clone)]
pub struct CycleGate {
    in_flight: Arc<RwLock<Option<Instant>>>,
    pending: Arc<RwLock<Option<PendingRefresh>>>,
}

/// Held for the duration of a cycle; releases the gate on drop
pub struct CycleGuard {
    gate: CycleGate,
}

impl CycleGate {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(RwLock::new(None)),
            pending: Arc::new(RwLock::new(None)),
        }
    }

    /// Claim the gate, or park the request if a cycle is already running
    pub fn try_begin(&self) -> Option<CycleGuard> {
        let mut in_flight = self.in_flight.write();
        if let Some(started) = *in_flight {
            let mut pending = self.pending.write();
            if pending.is_none() {
                *pending = Some(PendingRefresh {
                    requested_at: Instant::now(),
                });
            }
            debug!(
                "Refresh requested while a cycle is running ({:?} in), deferring",
                started.elapsed()
            );
            return None;
        }

        *in_flight = Some(Instant::now());
        Some(CycleGuard { gate: self.clone() })
    }

    /// Take the parked request, if any
    pub fn take_pending(&self) -> Option<PendingRefresh> {
        self.pending.write().take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.read().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.read().is_some()
    }

    fn release(&self) {
        if let Some(started) = self.in_flight.write().take() {
            info!("Refresh cycle finished in {:?}", started.elapsed());
        }
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}
