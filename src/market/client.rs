use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BidError, Result};
use crate::types::{MaterialId, PriceQuote};

/// Quotes keyed by material id
pub type PriceTable = HashMap<MaterialId, PriceQuote>;

/// Source of trade hub prices
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
    async fn fetch_quotes(&self, ids: &BTreeSet<MaterialId>) -> Result<PriceTable>;
}

/// Source of display names for material ids
#[async_trait]
pub trait ItemNameSource: Send + Sync + 'static {
    async fn fetch_names(&self, ids: &BTreeSet<MaterialId>) -> Result<HashMap<MaterialId, String>>;
}

#[derive(Debug, Deserialize)]
struct AssessPrice {
    price: f64,
}

#[derive(Debug, Deserialize)]
struct BuyAssessEntry {
    #[serde(default)]
    max_price: Option<AssessPrice>,
}

#[derive(Debug, Deserialize)]
struct SellAssessEntry {
    #[serde(default)]
    min_price: Option<AssessPrice>,
}

#[derive(Debug, Deserialize)]
struct AssessResult<T> {
    #[serde(default = "HashMap::new")]
    result: HashMap<String, T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketResponse {
    query_buy_assess: AssessResult<BuyAssessEntry>,
    query_sell_assess: AssessResult<SellAssessEntry>,
}

impl MarketResponse {
    fn into_table(self) -> PriceTable {
        let mut table = PriceTable::new();
        for (key, buy) in self.query_buy_assess.result {
            let Ok(id) = key.parse::<MaterialId>() else {
                debug!("Ignoring market entry with non-numeric id {:?}", key);
                continue;
            };
            let buy_price = buy.max_price.map(|p| p.price);
            let sell_price = self
                .query_sell_assess
                .result
                .get(&key)
                .and_then(|s| s.min_price.as_ref())
                .map(|p| p.price);

            match (buy_price, sell_price) {
                (Some(buy_unit_price), Some(sell_unit_price)) => {
                    table.insert(
                        id,
                        PriceQuote {
                            material_id: id,
                            buy_unit_price,
                            sell_unit_price,
                        },
                    );
                }
                _ => debug!("Market service has no complete quote for {}", id),
            }
        }
        table
    }
}

/// Market assessment service client
///
/// Sends a form-encoded batch query for buy-side and sell-side assessment of
/// the same ids at a single trade hub.
pub struct HttpPriceSource {
    client: reqwest::Client,
    url: String,
    location_id: u64,
}

impl HttpPriceSource {
    pub fn new(url: impl Into<String>, location_id: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            location_id,
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_quotes(&self, ids: &BTreeSet<MaterialId>) -> Result<PriceTable> {
        let ids_json = serde_json::to_string(&ids.iter().collect::<Vec<_>>())?;
        let location = format!("[{}]", self.location_id);
        let form = [
            ("queryBuyAssess", ids_json.as_str()),
            ("buy_location_id", location.as_str()),
            ("querySellAssess", ids_json.as_str()),
            ("sell_location_id", location.as_str()),
        ];

        debug!("Requesting market quotes for {} materials", ids.len());
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| BidError::Network(format!("market request failed: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| BidError::Network(format!("market response unreadable: {}", e)))?;
        let parsed: MarketResponse = serde_json::from_str(&body)
            .map_err(|e| BidError::Network(format!("market response malformed: {}", e)))?;

        let table = parsed.into_table();
        if table.len() < ids.len() {
            warn!("Market service returned {} of {} requested quotes", table.len(), ids.len());
        }
        Ok(table)
    }
}

/// Item name lookup service used by reports
pub struct HttpItemNameSource {
    client: reqwest::Client,
    url: String,
}

impl HttpItemNameSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl ItemNameSource for HttpItemNameSource {
    async fn fetch_names(&self, ids: &BTreeSet<MaterialId>) -> Result<HashMap<MaterialId, String>> {
        let body: HashMap<String, String> = self
            .client
            .post(&self.url)
            .json(&ids.iter().collect::<Vec<_>>())
            .send()
            .await
            .map_err(|e| BidError::Network(format!("item name request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| BidError::Network(format!("item name response malformed: {}", e)))?;

        Ok(body
            .into_iter()
            .filter_map(|(k, v)| k.parse().ok().map(|id| (id, v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_response_into_table() {
        let json = serde_json::json!({
            "queryBuyAssess": { "result": {
                "16634": { "max_price": { "price": 1500.5 } },
                "81143": { "max_price": { "price": 240.0 } },
                "16650": { "max_price": null }
            } },
            "querySellAssess": { "result": {
                "16634": { "min_price": { "price": 1700.0 } },
                "81143": { "min_price": { "price": 260.0 } },
                "16650": { "min_price": { "price": 9000.0 } }
            } }
        });

        let response: MarketResponse = serde_json::from_value(json).unwrap();
        let table = response.into_table();

        assert_eq!(table.len(), 2);
        assert_eq!(table[&16634].buy_unit_price, 1500.5);
        assert_eq!(table[&16634].sell_unit_price, 1700.0);
        assert_eq!(table[&81143].material_id, 81143);
        assert!(!table.contains_key(&16650));
    }

    #[test]
    fn test_market_response_requires_both_sections() {
        let json = serde_json::json!({ "queryBuyAssess": { "result": {} } });
        assert!(serde_json::from_value::<MarketResponse>(json).is_err());
    }
}
