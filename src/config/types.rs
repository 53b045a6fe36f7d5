use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::rules::RuleBook;
use crate::types::ThresholdRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the auction site API (`/page` and `/submit` are appended)
    #[serde(default = "default_auction_api_url")]
    pub auction_api_url: String,

    /// Scan-text normalization endpoint
    #[serde(default = "default_format_api_url")]
    pub format_api_url: String,

    /// Item name lookup endpoint used by reports
    #[serde(default = "default_item_name_api_url")]
    pub item_name_api_url: String,

    #[serde(default = "default_market_api_url")]
    pub market_api_url: String,

    /// Solar system all prices are assessed in
    #[serde(default = "default_trade_hub_location_id")]
    pub trade_hub_location_id: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Upper bound of the random delay added to every periodic refresh
    #[serde(default = "default_poll_jitter_ms")]
    pub poll_jitter_ms: u64,

    /// Pause after a failed bid before returning to idle
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,

    /// Pause between valuation and the eligibility walk
    #[serde(default = "default_bid_settle_ms")]
    pub bid_settle_ms: u64,

    /// Reports hide moons whose buy value is below this
    #[serde(default = "default_report_min_buy")]
    pub report_min_buy: f64,

    #[serde(default = "default_materials_path")]
    pub materials_path: PathBuf,

    #[serde(default = "default_bids_path")]
    pub bids_path: PathBuf,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub excluded_items: Vec<String>,

    #[serde(default)]
    pub rules: Vec<ThresholdRule>,
}

// Default values
fn default_auction_api_url() -> String {
    "https://tools.dc-eve.com/qq/auction".to_string()
}

fn default_format_api_url() -> String {
    "http://127.0.0.1:3000/api/format".to_string()
}

fn default_item_name_api_url() -> String {
    "http://127.0.0.1:3000/api/itemName/batch".to_string()
}

fn default_market_api_url() -> String {
    "https://eve.c3q.cc/market/api/".to_string()
}

fn default_trade_hub_location_id() -> u64 {
    30000142 // Jita
}

fn default_page_size() -> u32 {
    999
}

fn default_poll_interval_seconds() -> u64 {
    60
}

fn default_poll_jitter_ms() -> u64 {
    1_500
}

fn default_failure_backoff_ms() -> u64 {
    3_000
}

fn default_bid_settle_ms() -> u64 {
    1_000
}

fn default_report_min_buy() -> f64 {
    1_000_000.0
}

fn default_materials_path() -> PathBuf {
    PathBuf::from("type_materials.json")
}

fn default_bids_path() -> PathBuf {
    PathBuf::from("bids.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auction_api_url: default_auction_api_url(),
            format_api_url: default_format_api_url(),
            item_name_api_url: default_item_name_api_url(),
            market_api_url: default_market_api_url(),
            trade_hub_location_id: default_trade_hub_location_id(),
            page_size: default_page_size(),
            poll_interval_seconds: default_poll_interval_seconds(),
            poll_jitter_ms: default_poll_jitter_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
            bid_settle_ms: default_bid_settle_ms(),
            report_min_buy: default_report_min_buy(),
            materials_path: default_materials_path(),
            bids_path: default_bids_path(),
            webhook_url: Some(String::new()),
            excluded_items: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Returns the webhook URL only if it is non-empty.
    pub fn active_webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn rule_book(&self) -> RuleBook {
        RuleBook::new(self.rules.clone(), self.excluded_items.iter().cloned())
    }

    pub fn set_rule_book(&mut self, book: &RuleBook) {
        self.rules = book.rules.clone();
        self.excluded_items = book.exclusions.iter().cloned().collect();
    }

    pub fn timings(&self) -> Timings {
        Timings {
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            poll_jitter: Duration::from_millis(self.poll_jitter_ms),
            failure_backoff: Duration::from_millis(self.failure_backoff_ms),
            bid_settle: Duration::from_millis(self.bid_settle_ms),
        }
    }

    /// Resolve a configured path against the directory holding the config file
    pub fn resolve(&self, base: &std::path::Path, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// Delays used by the bidding loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub poll_jitter: Duration,
    pub failure_backoff: Duration,
    pub bid_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Config::default().timings()
    }
}
