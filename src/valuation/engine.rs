use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::collections::BTreeSet;

use super::pricing::{next_bid_price, BidStatus};
use crate::error::{BidError, Result};
use crate::market::PriceTable;
use crate::materials::FUEL_MATERIAL_ID;
use crate::rules::RuleBook;
use crate::types::{AuctionRecord, Category, Computed, MaterialId, Money, PriceQuote, YieldRecord};
use crate::utils::bracketed_number;

/// Fuel blocks an automatic extractor burns per cycle
const FUEL_PER_CYCLE: f64 = 55.0;

/// Flat upkeep per cycle of an automatic extractor
const UPKEEP_PER_CYCLE: Money = 90_000.0;

/// Cycles per day times the days an extraction right is valued over
pub const VALUATION_HORIZON: f64 = 24.0 * 90.0;

/// Auctions run four days, give or take twelve hours
const AUCTION_LENGTH_HOURS: i64 = 24 * 4 + 12;

/// The auction site reports start times in UTC+8
const SITE_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Market value of one yield record per cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YieldValuation {
    /// Automatic yield at best buy order prices
    pub buy: Money,
    /// Automatic yield at best sell order prices
    pub sell: Money,
    /// Manual yield at best buy order prices
    pub manual: Money,
}

fn quote(prices: &PriceTable, id: MaterialId) -> Result<&PriceQuote> {
    prices.get(&id).ok_or(BidError::MissingPrice(id))
}

pub fn price_yield(record: &YieldRecord, prices: &PriceTable) -> Result<YieldValuation> {
    let mut valuation = YieldValuation::default();
    for (id, quantity) in &record.materials {
        let q = quote(prices, *id)?;
        valuation.sell += *quantity as f64 * q.sell_unit_price;
        valuation.buy += *quantity as f64 * q.buy_unit_price;
    }
    for (id, quantity) in &record.manual_materials {
        valuation.manual += *quantity as f64 * quote(prices, *id)?.buy_unit_price;
    }
    Ok(valuation)
}

/// Ids to price for a cycle: every yield material plus the fuel
pub fn required_material_ids<'a>(yields: impl IntoIterator<Item = &'a YieldRecord>) -> BTreeSet<MaterialId> {
    let mut ids: BTreeSet<MaterialId> = yields.into_iter().flat_map(|y| y.material_ids()).collect();
    ids.insert(FUEL_MATERIAL_ID);
    ids
}

/// Per-cycle earnings of the auctioned right
pub fn per_cycle_value(
    record: &AuctionRecord,
    yield_record: Option<&YieldRecord>,
    prices: &PriceTable,
) -> Result<Money> {
    let fuel_price = quote(prices, FUEL_MATERIAL_ID)?.buy_unit_price;

    if record.category == Category::StructureRight {
        let units = bracketed_number(&record.item_detail).ok_or_else(|| {
            BidError::Parse(format!("no bracketed amount in detail of auction {}", record.id))
        })?;
        return Ok(units as f64 * fuel_price);
    }

    let yield_record = yield_record
        .ok_or_else(|| BidError::Parse(format!("no scan data for auction {}", record.id)))?;
    let valuation = price_yield(yield_record, prices)?;

    Ok(match record.category {
        Category::ManualExtractor => valuation.manual,
        _ => valuation.buy - fuel_price * FUEL_PER_CYCLE - UPKEEP_PER_CYCLE,
    })
}

/// Return on bid: `(value - price) / price`
pub fn cost_index(value: Money, price: u64) -> Option<f64> {
    if price == 0 {
        return None;
    }
    Some((value - price as f64) / price as f64)
}

/// Whole hours since the auction opened, rounded up
pub fn hours_since_start(start_time: &str, now: DateTime<Utc>) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(start_time.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(SITE_UTC_OFFSET_SECS)?;
    let started = naive.and_local_timezone(offset).single()?.with_timezone(&Utc);
    let seconds = (now - started).num_seconds();
    Some((seconds as f64 / 3600.0).ceil() as i64)
}

/// Rough hours until the auction closes (±12h)
pub fn hours_remaining(hours_since_start: i64) -> i64 {
    AUCTION_LENGTH_HOURS - hours_since_start
}

/// Per-cycle inputs shared by every auction of one refresh
pub struct Valuator<'a> {
    prices: &'a PriceTable,
    rules: &'a RuleBook,
    now: DateTime<Utc>,
}

impl<'a> Valuator<'a> {
    pub fn new(prices: &'a PriceTable, rules: &'a RuleBook, now: DateTime<Utc>) -> Self {
        Self { prices, rules, now }
    }

    /// Derive this cycle's figures for one auction
    ///
    /// Errors only disqualify this auction; callers skip it for the cycle.
    pub fn value(
        &self,
        record: &AuctionRecord,
        yield_record: Option<&YieldRecord>,
        last_submitted: Option<u64>,
        nudge: bool,
    ) -> Result<Computed> {
        let status = BidStatus::parse(&record.raw_status_text)?;
        let value = per_cycle_value(record, yield_record, self.prices)? * VALUATION_HORIZON;
        let next_bid_price = next_bid_price(record, status, last_submitted, nudge)?;
        let cost_index = cost_index(value, next_bid_price).ok_or(BidError::InvalidPrice(record.id))?;

        Ok(Computed {
            cost_index,
            value,
            matched_threshold: self.rules.threshold(record),
            hours_since_start: hours_since_start(&record.start_time, self.now).unwrap_or(0),
            next_bid_price,
        })
    }
}
