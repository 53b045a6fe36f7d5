pub mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use std::sync::Arc;

use crate::logging::print_notification;
use crate::types::{AuctionId, Region};
use crate::utils::format_number_with_separators;

/// User-facing events produced by the bidder
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A bid is about to be sent
    Bidding {
        id: AuctionId,
        item_name: String,
        price: u64,
    },
    BidPlaced {
        id: AuctionId,
        item_name: String,
        region: Region,
        price: u64,
        cost_index: f64,
        threshold: f64,
    },
    BidFailed {
        id: AuctionId,
        item_name: String,
        reason: String,
    },
    NetworkError {
        reason: String,
    },
    /// The site returned no auctions; the token was dropped
    CredentialExpired,
}

impl Notification {
    pub fn title(&self) -> String {
        match self {
            Notification::Bidding { item_name, .. } => format!("Bidding for {}", item_name),
            Notification::BidPlaced { item_name, .. } => format!("Bid placed on {}", item_name),
            Notification::BidFailed { item_name, .. } => format!("Bid on {} failed", item_name),
            Notification::NetworkError { .. } => "Network error".to_string(),
            Notification::CredentialExpired => "Token expired".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Notification::Bidding { id, price, .. } => {
                format!("auction {} at {} ISK", id, format_number_with_separators(*price))
            }
            Notification::BidPlaced {
                region,
                price,
                cost_index,
                threshold,
                ..
            } => format!(
                "{} ISK in {}, cost index {:.2} / {}",
                format_number_with_separators(*price),
                region,
                cost_index,
                format_threshold(*threshold)
            ),
            Notification::BidFailed { reason, .. } => reason.clone(),
            Notification::NetworkError { reason } => reason.clone(),
            Notification::CredentialExpired => {
                "the auction site returned nothing; enter a new token with /token".to_string()
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Notification::BidFailed { .. }
                | Notification::NetworkError { .. }
                | Notification::CredentialExpired
        )
    }
}

/// Threshold as shown to the user, `∞` when no rule applies
pub fn format_threshold(threshold: f64) -> String {
    if threshold.is_infinite() {
        "∞".to_string()
    } else {
        threshold.to_string()
    }
}

/// Sink for user-facing notifications
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) {
        print_notification(notification);
    }
}

/// Delivers every notification to each inner notifier in turn
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) {
        futures::future::join_all(self.notifiers.iter().map(|n| n.notify(notification))).await;
    }
}
