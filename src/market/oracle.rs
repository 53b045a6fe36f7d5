use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::client::{PriceSource, PriceTable};
use crate::error::Result;
use crate::types::MaterialId;

struct CachedQuotes {
    ids: BTreeSet<MaterialId>,
    table: Arc<PriceTable>,
}

/// Price lookups with a single-entry cache
///
/// Only the most recent network request is remembered. A request whose ids
/// are all covered by that request is answered from it; anything else goes
/// to the network for the full id set and replaces the cache entry as a whole.
/// A small request following a large one therefore narrows the cached
/// coverage.
pub struct PriceOracle {
    source: Arc<dyn PriceSource>,
    cache: RwLock<Option<CachedQuotes>>,
}

impl PriceOracle {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    pub async fn fetch_prices(&self, ids: &BTreeSet<MaterialId>) -> Result<Arc<PriceTable>> {
        let cached = self
            .cache
            .read()
            .as_ref()
            .filter(|c| ids.is_subset(&c.ids))
            .map(|c| Arc::clone(&c.table));
        if let Some(table) = cached {
            debug!("Serving {} quotes from cache", ids.len());
            return Ok(table);
        }

        let table = Arc::new(self.source.fetch_quotes(ids).await?);
        info!("Fetched {} market quotes", table.len());

        *self.cache.write() = Some(CachedQuotes {
            ids: ids.clone(),
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Ids covered by the cached request
    pub fn cached_ids(&self) -> Option<BTreeSet<MaterialId>> {
        self.cache.read().as_ref().map(|c| c.ids.clone())
    }

    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }
}
