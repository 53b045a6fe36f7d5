//! Next-bid price derivation
//!
//! The auction site only shows a free-text status per auction. Its three
//! shapes are: nobody has bid yet, the second-highest bid is X (someone else
//! leads), or our corporation leads at X. Outbidding adds a fixed raise and
//! rounds up to the site's bid step.

use crate::error::{BidError, Result};
use crate::types::{AuctionRecord, Category};
use crate::utils::parse_price_text;

const NO_BIDDER: &[&str] = &["当前无人竞拍", "no current bidder"];
const SECOND_HIGHEST_PREFIXES: &[&str] = &["当前第二高拍卖价为", "second-highest bid is"];
const LEADING_PREFIXES: &[&str] = &["当前你的公司是最高出价:", "you are currently highest at"];

/// Bidding state of an auction as shown by the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    NoBidder,
    /// Someone else leads; the shown price is the second-highest bid
    SecondHighest(u64),
    /// We lead at the shown price
    Leading(u64),
}

impl BidStatus {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if NO_BIDDER.iter().any(|s| text.eq_ignore_ascii_case(s)) {
            return Ok(BidStatus::NoBidder);
        }
        if let Some(rest) = strip_any_prefix(text, SECOND_HIGHEST_PREFIXES) {
            return Ok(BidStatus::SecondHighest(leading_amount(rest, text)?));
        }
        if let Some(rest) = strip_any_prefix(text, LEADING_PREFIXES) {
            return Ok(BidStatus::Leading(leading_amount(rest, text)?));
        }
        Err(BidError::Parse(format!("unrecognized auction status {:?}", text)))
    }

    pub fn is_leading(&self) -> bool {
        matches!(self, BidStatus::Leading(_))
    }
}

fn strip_any_prefix<'t>(text: &'t str, prefixes: &[&str]) -> Option<&'t str> {
    prefixes.iter().find_map(|p| {
        text.get(..p.len())
            .filter(|head| head.eq_ignore_ascii_case(p))
            .map(|_| &text[p.len()..])
    })
}

/// Digits and separators at the start of `rest`, e.g. " 103,000,000 ISK" -> 103000000
fn leading_amount(rest: &str, status: &str) -> Result<u64> {
    let amount: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    parse_price_text(&amount)
        .ok_or_else(|| BidError::Parse(format!("no price in auction status {:?}", status)))
}

/// Raise added on top of the price to beat, and the step it is rounded up to
pub fn bid_increment(category: Category) -> (u64, u64) {
    match category {
        Category::AutoExtractor => (25_000_000, 5_000_000),
        Category::ManualExtractor | Category::StructureRight => (100_000_000, 10_000_000),
    }
}

fn round_up_to(value: u64, step: u64) -> Option<u64> {
    value.div_ceil(step).checked_mul(step)
}

/// Price to offer for `record` this cycle
///
/// `last_submitted` is the highest price this process already bid on the
/// auction; `nudge` adds one ISK after a suspected tie.
pub fn next_bid_price(
    record: &AuctionRecord,
    status: BidStatus,
    last_submitted: Option<u64>,
    nudge: bool,
) -> Result<u64> {
    let start_price = parse_price_text(&record.start_price_text);
    let overflow = || BidError::InvalidPrice(record.id);

    let shown = match status {
        BidStatus::NoBidder => start_price
            .ok_or_else(|| BidError::Parse(format!("bad start price {:?}", record.start_price_text)))?
            .checked_add(1)
            .ok_or_else(overflow)?,
        BidStatus::SecondHighest(price) | BidStatus::Leading(price) => price,
    };
    let mut price = if shown == 0 { start_price.unwrap_or(0) } else { shown };

    if let BidStatus::SecondHighest(_) = status {
        let (raise, step) = bid_increment(record.category);
        price = last_submitted
            .unwrap_or(0)
            .max(price)
            .checked_add(raise)
            .and_then(|p| round_up_to(p, step))
            .ok_or_else(overflow)?;
    }

    if nudge {
        price = price.checked_add(1).ok_or_else(overflow)?;
    }

    if price == 0 {
        return Err(BidError::InvalidPrice(record.id));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auction(category: Category, status: &str, start_price: &str) -> AuctionRecord {
        serde_json::from_value(serde_json::json!({
            "id": 77,
            "itemName": "Moon",
            "itemCategory": category,
            "regionName": "Catch",
            "auctionInfo": status,
            "startPrice": start_price,
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(BidStatus::parse("当前无人竞拍").unwrap(), BidStatus::NoBidder);
        assert_eq!(
            BidStatus::parse("当前第二高拍卖价为103,000,000").unwrap(),
            BidStatus::SecondHighest(103_000_000)
        );
        assert_eq!(
            BidStatus::parse("当前你的公司是最高出价:250,000,001").unwrap(),
            BidStatus::Leading(250_000_001)
        );
        assert_eq!(
            BidStatus::parse("Second-highest bid is 5,000").unwrap(),
            BidStatus::SecondHighest(5_000)
        );
        assert!(BidStatus::parse("已结束").is_err());
        assert!(BidStatus::parse("当前第二高拍卖价为???").is_err());
    }

    #[test]
    fn test_no_bidder_offers_start_plus_one() {
        let record = auction(Category::AutoExtractor, "当前无人竞拍", "100,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(next_bid_price(&record, status, None, false).unwrap(), 100_000_001);
    }

    #[test]
    fn test_auto_extractor_outbid_rounds_up() {
        let record = auction(Category::AutoExtractor, "当前第二高拍卖价为103,000,000", "50,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(next_bid_price(&record, status, None, false).unwrap(), 130_000_000);
    }

    #[test]
    fn test_manual_extractor_outbid_uses_larger_step() {
        let record = auction(Category::ManualExtractor, "当前第二高拍卖价为103,000,000", "50,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(next_bid_price(&record, status, None, false).unwrap(), 210_000_000);
    }

    #[test]
    fn test_outbid_starts_from_own_previous_bid() {
        let record = auction(Category::AutoExtractor, "当前第二高拍卖价为103,000,000", "50,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(
            next_bid_price(&record, status, Some(140_000_000), false).unwrap(),
            165_000_000
        );
        // a stale lower bid does not pull the price down
        assert_eq!(
            next_bid_price(&record, status, Some(1_000), false).unwrap(),
            130_000_000
        );
    }

    #[test]
    fn test_nudge_adds_one() {
        let record = auction(Category::AutoExtractor, "当前第二高拍卖价为103,000,000", "50,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(next_bid_price(&record, status, None, true).unwrap(), 130_000_001);
    }

    #[test]
    fn test_leading_price_is_kept() {
        let record = auction(Category::StructureRight, "当前你的公司是最高出价:60,000,000", "50,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert!(status.is_leading());
        assert_eq!(next_bid_price(&record, status, None, false).unwrap(), 60_000_000);
    }

    #[test]
    fn test_huge_amounts_are_rejected_not_wrapped() {
        let record = auction(
            Category::AutoExtractor,
            "当前第二高拍卖价为18,446,744,073,709,551,615",
            "50,000,000",
        );
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert!(matches!(
            next_bid_price(&record, status, None, false),
            Err(BidError::InvalidPrice(77))
        ));

        // raise fits but rounding up to the step does not
        let near_max = auction(
            Category::AutoExtractor,
            "当前第二高拍卖价为18,446,744,073,684,551,615",
            "50,000,000",
        );
        let status = BidStatus::parse(&near_max.raw_status_text).unwrap();
        assert!(matches!(
            next_bid_price(&near_max, status, None, false),
            Err(BidError::InvalidPrice(77))
        ));

        let no_bidder = auction(Category::AutoExtractor, "当前无人竞拍", "18,446,744,073,709,551,615");
        let status = BidStatus::parse(&no_bidder.raw_status_text).unwrap();
        assert!(matches!(
            next_bid_price(&no_bidder, status, None, false),
            Err(BidError::InvalidPrice(77))
        ));

        let leading = auction(
            Category::AutoExtractor,
            "当前你的公司是最高出价:18,446,744,073,709,551,615",
            "50,000,000",
        );
        let status = BidStatus::parse(&leading.raw_status_text).unwrap();
        assert!(matches!(
            next_bid_price(&leading, status, None, true),
            Err(BidError::InvalidPrice(77))
        ));
    }

    #[test]
    fn test_zero_price_is_rejected() {
        let record = auction(Category::StructureRight, "当前你的公司是最高出价:0", "0");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert!(matches!(
            next_bid_price(&record, status, None, false),
            Err(BidError::InvalidPrice(77))
        ));
    }

    #[test]
    fn test_zero_shown_price_falls_back_to_start() {
        let record = auction(Category::StructureRight, "当前你的公司是最高出价:0", "42,000,000");
        let status = BidStatus::parse(&record.raw_status_text).unwrap();
        assert_eq!(next_bid_price(&record, status, None, false).unwrap(), 42_000_000);
    }

    #[test]
    fn test_unparseable_start_price() {
        let record = auction(Category::AutoExtractor, "当前无人竞拍", "tbd");
        assert!(next_bid_price(&record, BidStatus::NoBidder, None, false).is_err());
    }
}
