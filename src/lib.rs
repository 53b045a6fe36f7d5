//! Moonbid
//!
//! Values moon mining rights listed on a corporation auction site and bids on
//! the ones whose return on price clears user-defined thresholds.

pub mod auction;
pub mod bidder;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod market;
pub mod materials;
pub mod notify;
pub mod report;
pub mod rules;
pub mod scan;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;
pub mod valuation;

pub use bidder::{BidContext, Bidder, BidderDeps, CycleOutcome, Trigger};
pub use error::{BidError, Result};
pub use types::{AuctionRecord, BidderState, Category, Computed, Region, ThresholdRule, YieldRecord};
