use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BidError, Result};
use crate::types::{AuctionId, AuctionRecord};

/// Status filter value the site uses for auctions still taking bids
const OPEN_AUCTION_STATUS: &str = "1";

const PAGE_PATH: &str = "page";
const SUBMIT_PATH: &str = "submit";

/// One page of open auctions
#[derive(Debug, Clone, Default)]
pub struct AuctionPage {
    pub total: u64,
    pub auctions: Vec<AuctionRecord>,
}

/// The site's answer to a bid
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BidResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl BidResponse {
    pub const ACCEPTED: i64 = 200;
    pub const RATE_LIMITED: i64 = 429;

    /// Map the response code onto the bid error taxonomy
    pub fn into_result(self, id: AuctionId) -> Result<()> {
        match self.code {
            Self::ACCEPTED => Ok(()),
            Self::RATE_LIMITED => Err(BidError::RateLimited {
                id,
                message: self.message,
            }),
            code => Err(BidError::PriceConflict {
                id,
                code,
                message: self.message,
            }),
        }
    }
}

/// Auction site operations the bidder depends on
#[async_trait]
pub trait AuctionApi: Send + Sync + 'static {
    async fn list_open(&self, token: &str) -> Result<AuctionPage>;
    async fn submit_bid(&self, token: &str, id: AuctionId, price: u64) -> Result<BidResponse>;
}

/// Text transform that turns concatenated auction details into scan rows
#[async_trait]
pub trait ScanFormatter: Send + Sync + 'static {
    async fn normalize(&self, raw: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRequest<'a> {
    item_name: &'a str,
    system_id: [u64; 0],
    constellation_id: [u64; 0],
    region_id: [u64; 0],
    auction_status: [&'a str; 1],
    category: [u64; 0],
    page: u32,
    size: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SubmitRequest {
    id: AuctionId,
    price: u64,
}

pub struct HttpAuctionApi {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl HttpAuctionApi {
    pub fn new(base_url: impl Into<String>, page_size: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        request
            .bearer_auth(token)
            .header(reqwest::header::COOKIE, format!("tools_remember={}", token))
            .header(reqwest::header::ACCEPT, "*/*")
    }
}

/// Decode rows one by one so a single odd auction does not hide the rest
fn decode_page(raw: RawPage) -> AuctionPage {
    let auctions = raw
        .data
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<AuctionRecord>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable auction row: {}", e);
                None
            }
        })
        .collect();
    AuctionPage {
        total: raw.total,
        auctions,
    }
}

#[async_trait]
impl AuctionApi for HttpAuctionApi {
    async fn list_open(&self, token: &str) -> Result<AuctionPage> {
        let body = PageRequest {
            item_name: "",
            system_id: [],
            constellation_id: [],
            region_id: [],
            auction_status: [OPEN_AUCTION_STATUS],
            category: [],
            page: 1,
            size: self.page_size,
        };

        let response = self
            .authorized(self.client.post(self.url(PAGE_PATH)), token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BidError::Network(format!("auction list request failed: {}", e)))?;

        let envelope: Envelope<RawPage> = response
            .json()
            .await
            .map_err(|e| BidError::Network(format!("auction list response malformed: {}", e)))?;

        let page = decode_page(envelope.data);
        debug!("Auction site lists {} open auctions", page.total);
        Ok(page)
    }

    async fn submit_bid(&self, token: &str, id: AuctionId, price: u64) -> Result<BidResponse> {
        let response = self
            .authorized(self.client.post(self.url(SUBMIT_PATH)), token)
            .json(&SubmitRequest { id, price })
            .send()
            .await
            .map_err(|e| BidError::Network(format!("bid request failed: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| BidError::Network(format!("bid response malformed: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct FormatRequest<'a> {
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct FormatResponse {
    result: String,
}

/// Client of the scan-text normalization endpoint
pub struct HttpScanFormatter {
    client: reqwest::Client,
    url: String,
}

impl HttpScanFormatter {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl ScanFormatter for HttpScanFormatter {
    async fn normalize(&self, raw: &str) -> Result<String> {
        let response: FormatResponse = self
            .client
            .post(&self.url)
            .json(&FormatRequest { data: raw })
            .send()
            .await
            .map_err(|e| BidError::Network(format!("format request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| BidError::Network(format!("format response malformed: {}", e)))?;
        Ok(response.result)
    }
}

/// Formatter that passes text through untouched, for already normalized input
pub struct IdentityFormatter;

#[async_trait]
impl ScanFormatter for IdentityFormatter {
    async fn normalize(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}
