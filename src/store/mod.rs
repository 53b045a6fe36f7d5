//! Durable state the bidder reads at start and writes on change
//!
//! - `BidStore`: last price submitted per auction (`bids.json`)
//! - `SettingsStore`: threshold rules and the exclusion list

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{BidError, Result};
use crate::rules::RuleBook;
use crate::types::AuctionId;

pub trait BidStore: Send + Sync + 'static {
    fn last_bid(&self, id: AuctionId) -> Option<u64>;
    fn record_bid(&self, id: AuctionId, price: u64) -> Result<()>;
}

pub trait SettingsStore: Send + Sync + 'static {
    fn save_rules(&self, rules: &RuleBook) -> Result<()>;
}

/// Bid history kept in a JSON object file, `{ "<auction id>": price }`
pub struct JsonFileBidStore {
    path: PathBuf,
    bids: RwLock<HashMap<AuctionId, u64>>,
}

impl JsonFileBidStore {
    /// Open the store, starting empty if the file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let bids = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<AuctionId, u64>>(&contents) {
                Ok(bids) => {
                    info!("Loaded {} previous bids from {:?}", bids.len(), path);
                    bids
                }
                Err(e) => {
                    warn!("Ignoring unreadable bid history {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!("No bid history at {:?}", path);
                HashMap::new()
            }
        };

        Self {
            path,
            bids: RwLock::new(bids),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, bids: &HashMap<AuctionId, u64>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(bids)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| BidError::Storage(format!("failed to replace {:?}: {}", self.path, e)))
    }
}

impl BidStore for JsonFileBidStore {
    fn last_bid(&self, id: AuctionId) -> Option<u64> {
        self.bids.read().get(&id).copied()
    }

    fn record_bid(&self, id: AuctionId, price: u64) -> Result<()> {
        let mut bids = self.bids.write();
        let mut updated = bids.clone();
        updated.insert(id, price);
        self.persist(&updated)?;
        *bids = updated;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryBidStore {
    bids: Arc<RwLock<HashMap<AuctionId, u64>>>,
}

impl MemoryBidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.read().is_empty()
    }
}

impl BidStore for MemoryBidStore {
    fn last_bid(&self, id: AuctionId) -> Option<u64> {
        self.bids.read().get(&id).copied()
    }

    fn record_bid(&self, id: AuctionId, price: u64) -> Result<()> {
        self.bids.write().insert(id, price);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemorySettingsStore {
    saved: Arc<RwLock<Option<RuleBook>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<RuleBook> {
        self.saved.read().clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn save_rules(&self, rules: &RuleBook) -> Result<()> {
        *self.saved.write() = Some(rules.clone());
        Ok(())
    }
}
