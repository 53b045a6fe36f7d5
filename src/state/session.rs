use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::types::AuctionId;

/// Bearer token for the auction site; lives only as long as the process
#[derive(Clone, Default)]
pub struct CredentialSlot {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialSlot {
    pub fn new(token: Option<String>) -> Self {
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }

    /// Returns true if the stored value changed
    pub fn set(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return self.clear();
        }
        let mut slot = self.token.write();
        if slot.as_deref() == Some(token) {
            return false;
        }
        *slot = Some(token.to_string());
        info!("Bearer token updated");
        true
    }

    /// Returns true if a token was dropped
    pub fn clear(&self) -> bool {
        let dropped = self.token.write().take().is_some();
        if dropped {
            warn!("Bearer token cleared, a new one is needed to keep bidding");
        }
        dropped
    }
}

/// One-shot equal-bid adjustment
///
/// After a bid is refused as a conflict, the auction id is parked here and
/// the next valuation of that auction adds one ISK, then clears the slot.
#[derive(Clone, Default)]
pub struct NudgeSlot {
    auction: Arc<RwLock<Option<AuctionId>>>,
}

impl NudgeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, id: AuctionId) {
        info!("Auction {} flagged for an equal-bid nudge", id);
        *self.auction.write() = Some(id);
    }

    /// True exactly once after `flag(id)`
    pub fn consume(&self, id: AuctionId) -> bool {
        let mut slot = self.auction.write();
        if *slot == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn peek(&self) -> Option<AuctionId> {
        *self.auction.read()
    }
}
