//! One refresh cycle: fetch, valuate, evaluate, bid
//!
//! A cycle places at most one bid. Which auction gets it is decided by the
//! order the site lists them in; the first eligible one wins.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::Bidder;
use crate::error::{BidError, Result};
use crate::notify::Notification;
use crate::scan::parse_scan;
use crate::types::{AuctionId, AuctionRecord, BidderState, ValuedAuction};
use crate::valuation::{required_material_ids, BidStatus, Valuator};

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the gate; this request was parked
    Skipped,
    NoCredential,
    /// The site listed nothing; the token was dropped
    CredentialExpired,
    /// Fetching or pricing failed
    Failed,
    NothingEligible,
    BidPlaced { id: AuctionId, price: u64 },
    BidFailed { id: AuctionId },
    /// The bidder was shut down while the cycle ran
    Disposed,
}

/// True if the auction clears its threshold and we do not already lead it
pub fn is_bid_eligible(auction: &ValuedAuction) -> bool {
    let leading = BidStatus::parse(&auction.record.raw_status_text)
        .map(|s| s.is_leading())
        .unwrap_or(false);
    !leading && auction.computed.cost_index >= auction.computed.matched_threshold
}

/// First eligible auction in site order
pub fn select_candidate(valued: &[ValuedAuction]) -> Option<&ValuedAuction> {
    valued.iter().find(|a| is_bid_eligible(a))
}

/// Item details joined the way the normalization service expects them
fn joined_details(auctions: &[AuctionRecord]) -> String {
    auctions.iter().fold(String::new(), |mut acc, a| {
        acc.push('\n');
        acc.push_str(&a.item_detail);
        acc
    })
}

impl Bidder {
    /// Run one cycle unless another one is in flight
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }
        let Some(_guard) = self.gate.try_begin() else {
            return CycleOutcome::Skipped;
        };

        let outcome = self.cycle().await;
        self.state.set(BidderState::Idle);
        debug!("Cycle ended: {:?}", outcome);
        outcome
    }

    async fn cycle(&self) -> CycleOutcome {
        let Some(token) = self.context.credential.get() else {
            debug!("No bearer token, skipping refresh");
            return CycleOutcome::NoCredential;
        };

        self.state.set(BidderState::Fetching);
        let page = match self.deps.auctions.list_open(&token).await {
            Ok(page) => page,
            Err(e) => return self.network_failure(e).await,
        };
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }

        if page.total == 0 {
            self.context.credential.clear();
            self.deps.notifier.notify(&Notification::CredentialExpired).await;
            return CycleOutcome::CredentialExpired;
        }
        info!("Fetched {} open auctions", page.auctions.len());

        self.state.set(BidderState::Valuating);
        let valued = match self.valuate(&page.auctions).await {
            Ok(valued) => valued,
            Err(e) => return self.network_failure(e).await,
        };
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }
        *self.last_valued.write() = valued.clone();

        self.state.set(BidderState::Evaluating);
        tokio::time::sleep(self.timings.bid_settle).await;
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }

        let Some(candidate) = select_candidate(&valued) else {
            debug!("No auction clears its threshold");
            return CycleOutcome::NothingEligible;
        };

        self.state.set(BidderState::Bidding);
        self.bid(&token, candidate).await
    }

    /// Value every auction of the page; auctions that fail are left out
    async fn valuate(&self, auctions: &[AuctionRecord]) -> Result<Vec<ValuedAuction>> {
        let normalized = self.deps.formatter.normalize(&joined_details(auctions)).await?;
        let yields = parse_scan(&normalized, &self.deps.reference);
        if yields.len() != auctions.len() {
            debug!(
                "Scan produced {} yield records for {} auctions",
                yields.len(),
                auctions.len()
            );
        }

        let prices = self
            .deps
            .oracle
            .fetch_prices(&required_material_ids(&yields))
            .await?;
        let rules = self.rules();
        let valuator = Valuator::new(&prices, &rules, Utc::now());

        let mut valued = Vec::with_capacity(auctions.len());
        for (index, record) in auctions.iter().enumerate() {
            let nudge = self.context.nudge.peek() == Some(record.id);
            let last_submitted = self.deps.bids.last_bid(record.id);
            match valuator.value(record, yields.get(index), last_submitted, nudge) {
                Ok(computed) => {
                    if nudge {
                        self.context.nudge.consume(record.id);
                    }
                    valued.push(ValuedAuction {
                        record: record.clone(),
                        computed,
                    });
                }
                Err(e) if e.is_record_local() => {
                    warn!("Skipping auction {} ({}) this cycle: {}", record.id, record.item_name, e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(valued)
    }

    async fn bid(&self, token: &str, candidate: &ValuedAuction) -> CycleOutcome {
        let record = &candidate.record;
        let price = candidate.computed.next_bid_price;

        info!(
            "Bidding {} ISK on auction {} ({}, cost index {:.2})",
            price, record.id, record.item_name, candidate.computed.cost_index
        );
        self.deps
            .notifier
            .notify(&Notification::Bidding {
                id: record.id,
                item_name: record.item_name.clone(),
                price,
            })
            .await;

        let result = self
            .deps
            .auctions
            .submit_bid(token, record.id, price)
            .await
            .and_then(|response| response.into_result(record.id));
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }

        match result {
            Ok(()) => {
                if let Err(e) = self.deps.bids.record_bid(record.id, price) {
                    warn!("Failed to record bid on auction {}: {}", record.id, e);
                }
                info!("Bid of {} ISK on auction {} accepted", price, record.id);
                self.deps
                    .notifier
                    .notify(&Notification::BidPlaced {
                        id: record.id,
                        item_name: record.item_name.clone(),
                        region: record.region,
                        price,
                        cost_index: candidate.computed.cost_index,
                        threshold: candidate.computed.matched_threshold,
                    })
                    .await;
                CycleOutcome::BidPlaced { id: record.id, price }
            }
            Err(e) => {
                warn!("Bid on auction {} failed: {}", record.id, e);
                if let BidError::PriceConflict { id, .. } = &e {
                    self.context.nudge.flag(*id);
                }
                tokio::time::sleep(self.timings.failure_backoff).await;
                self.deps
                    .notifier
                    .notify(&Notification::BidFailed {
                        id: record.id,
                        item_name: record.item_name.clone(),
                        reason: e.to_string(),
                    })
                    .await;
                CycleOutcome::BidFailed { id: record.id }
            }
        }
    }

    async fn network_failure(&self, e: BidError) -> CycleOutcome {
        warn!("Refresh failed: {}", e);
        if self.is_disposed() {
            return CycleOutcome::Disposed;
        }
        self.deps
            .notifier
            .notify(&Notification::NetworkError { reason: e.to_string() })
            .await;
        CycleOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidder::tests::{catch_auto_rule, harness, moon_auction, LEADING_PREFIX};
    use crate::rules::RuleBook;
    use crate::store::BidStore;
    use crate::types::Computed;

    const SECOND_103M: &str = "当前第二高拍卖价为103,000,000";

    fn valued(cost_index: f64, threshold: f64, status: &str) -> ValuedAuction {
        ValuedAuction {
            record: moon_auction(1, "Moon A", 1.0, status),
            computed: Computed {
                cost_index,
                value: 0.0,
                matched_threshold: threshold,
                hours_since_start: 0,
                next_bid_price: 130_000_000,
            },
        }
    }

    fn rules(min_cost_index: f64) -> RuleBook {
        RuleBook::new(vec![catch_auto_rule(min_cost_index)], Vec::new())
    }

    #[test]
    fn test_eligibility_against_threshold() {
        assert!(is_bid_eligible(&valued(4.0, 3.5, SECOND_103M)));
        assert!(is_bid_eligible(&valued(4.0, 4.0, SECOND_103M)));
        assert!(!is_bid_eligible(&valued(4.0, 5.0, SECOND_103M)));
        assert!(!is_bid_eligible(&valued(4.0, f64::INFINITY, SECOND_103M)));
        assert!(!is_bid_eligible(&valued(f64::NAN, 3.5, SECOND_103M)));
    }

    #[test]
    fn test_leading_auction_is_not_eligible() {
        let status = format!("{}130,000,000", LEADING_PREFIX);
        assert!(!is_bid_eligible(&valued(9.0, 1.0, &status)));
    }

    #[test]
    fn test_select_candidate_keeps_site_order() {
        let mut second = valued(6.0, 1.0, SECOND_103M);
        second.record.id = 2;
        let list = vec![valued(0.5, 1.0, SECOND_103M), second, valued(9.0, 1.0, SECOND_103M)];
        assert_eq!(select_candidate(&list).map(|a| a.record.id), Some(2));
        assert!(select_candidate(&list[..1]).is_none());
    }

    #[test]
    fn test_joined_details() {
        let a = moon_auction(1, "Moon A", 1.0, SECOND_103M);
        let b = moon_auction(2, "Moon B", 1.0, SECOND_103M);
        let joined = joined_details(&[a.clone(), b.clone()]);
        assert_eq!(joined, format!("\n{}\n{}", a.item_detail, b.item_detail));
    }

    #[tokio::test]
    async fn test_one_bid_per_cycle_on_first_eligible() {
        let auctions = vec![
            moon_auction(1, "Moon A", 1.0, SECOND_103M),
            moon_auction(2, "Moon B", 1.0, SECOND_103M),
            moon_auction(3, "Moon C", 1.0, SECOND_103M),
        ];
        let h = harness(auctions, 1_000.0, rules(2.0));

        let outcome = h.bidder.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::BidPlaced { id: 1, price: 130_000_000 });
        assert_eq!(h.site.submissions(), vec![(1, 130_000_000)]);
        assert_eq!(h.bids.last_bid(1), Some(130_000_000));
        assert_eq!(h.bidder.state().get(), BidderState::Idle);
        assert_eq!(h.bidder.last_valued().len(), 3);

        let seen = h.notifier.take();
        assert!(matches!(seen[0], Notification::Bidding { id: 1, .. }));
        assert!(matches!(seen[1], Notification::BidPlaced { id: 1, .. }));
    }

    #[tokio::test]
    async fn test_threshold_decides_eligibility() {
        // 780 units/cycle at 1,000 ISK less upkeep, over the horizon, at 130M
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(11.0));
        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::NothingEligible);

        let valued = h.bidder.last_valued();
        let ci = valued[0].computed.cost_index;
        assert!((ci - (690_000.0 * 2160.0 - 130e6) / 130e6).abs() < 1e-9);
        assert_eq!(valued[0].computed.matched_threshold, 11.0);

        h.bidder.add_rule(catch_auto_rule(10.0)).unwrap();
        assert!(matches!(h.bidder.run_cycle().await, CycleOutcome::BidPlaced { id: 1, .. }));
    }

    #[tokio::test]
    async fn test_excluded_item_is_never_bid_on() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(0.0));
        h.bidder.exclude("Moon A").unwrap();
        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::NothingEligible);
        assert!(h.site.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_nudges_next_bid() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        h.site.responses.lock().push_back(500);

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::BidFailed { id: 1 });
        assert_eq!(h.bidder.context().nudge.peek(), Some(1));
        assert!(h.bids.last_bid(1).is_none());
        assert!(h.notifier.take().iter().any(|n| matches!(n, Notification::BidFailed { .. })));

        h.bidder.run_cycle().await;
        assert_eq!(h.site.submissions(), vec![(1, 130_000_000), (1, 130_000_001)]);
        assert_eq!(h.bidder.context().nudge.peek(), None);
    }

    #[tokio::test]
    async fn test_rate_limit_does_not_nudge() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        h.site.responses.lock().push_back(429);

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::BidFailed { id: 1 });
        assert_eq!(h.bidder.context().nudge.peek(), None);

        h.bidder.run_cycle().await;
        assert_eq!(h.site.submissions(), vec![(1, 130_000_000), (1, 130_000_000)]);
    }

    #[tokio::test]
    async fn test_previous_bid_raises_floor() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        h.bids.record_bid(1, 140_000_000).unwrap();

        h.bidder.run_cycle().await;
        assert_eq!(h.site.submissions(), vec![(1, 165_000_000)]);
    }

    #[tokio::test]
    async fn test_empty_listing_clears_token() {
        let h = harness(Vec::new(), 1_000.0, rules(2.0));

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::CredentialExpired);
        assert!(!h.bidder.context().credential.is_present());
        assert_eq!(h.notifier.take(), vec![Notification::CredentialExpired]);

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::NoCredential);
        assert_eq!(h.site.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_network_error_is_reported_not_fatal() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        *h.site.fail_listing.lock() = true;

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::Failed);
        assert!(matches!(h.notifier.take()[..], [Notification::NetworkError { .. }]));
        assert_eq!(h.bidder.state().get(), BidderState::Idle);

        *h.site.fail_listing.lock() = false;
        assert!(matches!(h.bidder.run_cycle().await, CycleOutcome::BidPlaced { .. }));
    }

    #[tokio::test]
    async fn test_price_failure_aborts_cycle() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        *h.prices.fail.lock() = true;

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::Failed);
        assert!(h.site.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_status_skips_only_that_auction() {
        let auctions = vec![
            moon_auction(1, "Moon A", 1.0, "bidding closed"),
            moon_auction(2, "Moon B", 1.0, SECOND_103M),
        ];
        let h = harness(auctions, 1_000.0, rules(2.0));

        assert!(matches!(h.bidder.run_cycle().await, CycleOutcome::BidPlaced { id: 2, .. }));
        assert_eq!(h.bidder.last_valued().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_refuses_concurrent_cycle() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        let guard = h.bidder.gate.try_begin().unwrap();

        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::Skipped);
        assert!(h.bidder.gate.has_pending());
        assert_eq!(h.site.list_calls(), 0);

        drop(guard);
        assert!(matches!(h.bidder.run_cycle().await, CycleOutcome::BidPlaced { .. }));
    }

    #[tokio::test]
    async fn test_disposed_bidder_does_nothing() {
        let h = harness(vec![moon_auction(1, "Moon A", 1.0, SECOND_103M)], 1_000.0, rules(2.0));
        h.bidder.dispose();
        assert_eq!(h.bidder.run_cycle().await, CycleOutcome::Disposed);
        assert_eq!(h.site.list_calls(), 0);
    }
}
