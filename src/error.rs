use thiserror::Error;

use crate::types::{AuctionId, MaterialId};

#[derive(Debug, Error)]
pub enum BidError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-200, non-429 answer to a bid; the next price for this auction gets nudged
    #[error("Bid on auction {id} rejected (code {code}): {message}")]
    PriceConflict {
        id: AuctionId,
        code: i64,
        message: String,
    },

    #[error("Bid on auction {id} rate limited: {message}")]
    RateLimited { id: AuctionId, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No price for material {0}")]
    MissingPrice(MaterialId),

    #[error("Invalid bid price for auction {0}")]
    InvalidPrice(AuctionId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BidError {
    /// Failures that only disqualify a single auction for the current cycle
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            BidError::Parse(_) | BidError::MissingPrice(_) | BidError::InvalidPrice(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BidError>;
