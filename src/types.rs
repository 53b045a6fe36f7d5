use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type id of a material in the game's static data
pub type MaterialId = u32;

/// Floored yield quantity per extraction cycle
pub type Quantity = u64;

/// ISK amount as reported by the market service
pub type Money = f64;

/// Auction id assigned by the auction site
pub type AuctionId = u64;

/// One extraction site's material production per cycle, as parsed from scan text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YieldRecord {
    pub name: String,
    /// Yield collected by an automatic extractor
    pub materials: BTreeMap<MaterialId, Quantity>,
    /// Yield only available to manual extraction (higher-tier bodies)
    pub manual_materials: BTreeMap<MaterialId, Quantity>,
    pub volume: u64,
}

impl YieldRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every material id this record needs a price for
    pub fn material_ids(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.materials
            .keys()
            .chain(self.manual_materials.keys())
            .copied()
    }
}

/// Buy and sell unit prices for a single material at the trade hub
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub material_id: MaterialId,
    pub buy_unit_price: Money,
    pub sell_unit_price: Money,
}

/// What is being auctioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Automatic moon drill
    #[serde(rename = "自动月矿", alias = "AutoExtractor", alias = "metenox")]
    AutoExtractor,
    /// Refinery with manual moon mining
    #[serde(rename = "手动月矿", alias = "ManualExtractor", alias = "athanor")]
    ManualExtractor,
    /// Planetary skyhook right
    #[serde(rename = "天钩", alias = "StructureRight", alias = "skyhook")]
    StructureRight,
}

impl Category {
    /// Console spelling, also accepted when deserializing
    pub fn short_name(&self) -> &'static str {
        match self {
            Category::AutoExtractor => "metenox",
            Category::ManualExtractor => "athanor",
            Category::StructureRight => "skyhook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metenox" | "auto" | "autoextractor" | "自动月矿" => Some(Category::AutoExtractor),
            "athanor" | "manual" | "manualextractor" | "手动月矿" => Some(Category::ManualExtractor),
            "skyhook" | "structureright" | "天钩" => Some(Category::StructureRight),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Region an auctioned site lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Catch", alias = "catch")]
    Catch,
    #[serde(rename = "Querious", alias = "querious")]
    Querious,
}

impl Region {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "catch" => Some(Region::Catch),
            "querious" => Some(Region::Querious),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Catch => f.write_str("Catch"),
            Region::Querious => f.write_str("Querious"),
        }
    }
}

/// An open auction as listed by the auction site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub id: AuctionId,

    #[serde(rename = "itemName")]
    pub item_name: String,

    #[serde(rename = "itemCategory")]
    pub category: Category,

    #[serde(rename = "regionName")]
    pub region: Region,

    #[serde(rename = "systemName", default)]
    pub system: String,

    /// Free-text bidding status, e.g. the current second-highest price
    #[serde(rename = "auctionInfo", default)]
    pub raw_status_text: String,

    #[serde(rename = "auctionStatus", default)]
    pub auction_status: String,

    /// Scan text of the auctioned site
    #[serde(rename = "itemDetail", default)]
    pub item_detail: String,

    #[serde(rename = "startTime", default)]
    pub start_time: String,

    #[serde(rename = "startPrice", default)]
    pub start_price_text: String,
}

/// Per-cycle derived figures for an auction; never persisted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Computed {
    pub cost_index: f64,
    pub value: Money,
    /// Lowest matching rule threshold, `f64::INFINITY` when nothing matches
    pub matched_threshold: f64,
    pub hours_since_start: i64,
    pub next_bid_price: u64,
}

/// An auction together with this cycle's valuation
#[derive(Debug, Clone)]
pub struct ValuedAuction {
    pub record: AuctionRecord,
    pub computed: Computed,
}

/// User-authored minimum cost index for a region/category pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub region: Region,
    pub category: Category,
    pub min_cost_index: f64,
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} >= {}", self.region, self.category, self.min_cost_index)
    }
}

/// Bidding loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidderState {
    Idle,
    Fetching,
    Valuating,
    Evaluating,
    Bidding,
}

impl BidderState {
    /// Returns true while a cycle is between fetching and bidding
    pub fn is_busy(&self) -> bool {
        !matches!(self, BidderState::Idle)
    }
}
