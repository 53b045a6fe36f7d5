//! Autonomous bidding loop
//!
//! `Bidder` owns everything a refresh cycle needs: the collaborators behind
//! traits, the session context (token, rules, nudge slot) and the loop
//! bookkeeping (state, cycle gate, shutdown signal). Rule and token changes go
//! through its methods so they are persisted and trigger an immediate refresh.

pub mod cycle;
pub mod scheduler;

pub use cycle::{is_bid_eligible, select_candidate, CycleOutcome};
pub use scheduler::Trigger;

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::auction::{AuctionApi, ScanFormatter};
use crate::config::Timings;
use crate::error::Result;
use crate::market::PriceOracle;
use crate::materials::MaterialReference;
use crate::notify::Notifier;
use crate::rules::RuleBook;
use crate::state::{CredentialSlot, CycleGate, NudgeSlot, StateManager};
use crate::store::{BidStore, SettingsStore};
use crate::types::{ThresholdRule, ValuedAuction};

/// External collaborators of the bidder
#[derive(Clone)]
pub struct BidderDeps {
    pub auctions: Arc<dyn AuctionApi>,
    pub formatter: Arc<dyn ScanFormatter>,
    pub oracle: Arc<PriceOracle>,
    pub reference: Arc<MaterialReference>,
    pub bids: Arc<dyn BidStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Session state the loop reads every cycle
#[derive(Clone, Default)]
pub struct BidContext {
    pub credential: CredentialSlot,
    pub rules: Arc<RwLock<RuleBook>>,
    pub nudge: NudgeSlot,
}

impl BidContext {
    pub fn new(token: Option<String>, rules: RuleBook) -> Self {
        Self {
            credential: CredentialSlot::new(token),
            rules: Arc::new(RwLock::new(rules)),
            nudge: NudgeSlot::new(),
        }
    }
}

pub struct Bidder {
    deps: BidderDeps,
    context: BidContext,
    timings: Timings,
    state: StateManager,
    gate: CycleGate,
    last_valued: RwLock<Vec<ValuedAuction>>,
    triggers: mpsc::UnboundedSender<Trigger>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<Trigger>>>,
    shutdown: watch::Sender<bool>,
}

impl Bidder {
    pub fn new(deps: BidderDeps, context: BidContext, timings: Timings) -> Self {
        let (triggers, trigger_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            deps,
            context,
            timings,
            state: StateManager::new(),
            gate: CycleGate::new(),
            last_valued: RwLock::new(Vec::new()),
            triggers,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            shutdown,
        }
    }

    pub fn context(&self) -> &BidContext {
        &self.context
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Auctions valued by the most recent completed valuation, in site order
    pub fn last_valued(&self) -> Vec<ValuedAuction> {
        self.last_valued.read().clone()
    }

    /// Ask the loop for an immediate refresh
    pub fn request_refresh(&self, trigger: Trigger) {
        if self.triggers.send(trigger).is_err() {
            warn!("Bidding loop is gone, dropping {:?} refresh", trigger);
        }
    }

    pub fn set_token(&self, token: &str) {
        if self.context.credential.set(token) {
            self.request_refresh(Trigger::Credential);
        }
    }

    pub fn rules(&self) -> RuleBook {
        self.context.rules.read().clone()
    }

    pub fn add_rule(&self, rule: ThresholdRule) -> Result<()> {
        self.update_rules(Trigger::Rules, |book| {
            book.add_rule(rule);
            true
        })
    }

    pub fn remove_rule(&self, index: usize) -> Result<Option<ThresholdRule>> {
        let mut removed = None;
        self.update_rules(Trigger::Rules, |book| {
            removed = book.remove_rule(index);
            removed.is_some()
        })?;
        Ok(removed)
    }

    pub fn exclude(&self, item_name: &str) -> Result<bool> {
        let mut changed = false;
        self.update_rules(Trigger::Exclusions, |book| {
            changed = book.exclude(item_name);
            changed
        })?;
        Ok(changed)
    }

    pub fn include(&self, item_name: &str) -> Result<bool> {
        let mut changed = false;
        self.update_rules(Trigger::Exclusions, |book| {
            changed = book.include(item_name);
            changed
        })?;
        Ok(changed)
    }

    /// Apply `change` to the rule book; persist and refresh if it reports a change
    fn update_rules<F>(&self, trigger: Trigger, change: F) -> Result<()>
    where
        F: FnOnce(&mut RuleBook) -> bool,
    {
        let snapshot = {
            let mut book = self.context.rules.write();
            if !change(&mut book) {
                return Ok(());
            }
            book.clone()
        };
        self.deps.settings.save_rules(&snapshot)?;
        info!("Rules now: {} rule(s), {} exclusion(s)", snapshot.rules.len(), snapshot.exclusions.len());
        self.request_refresh(trigger);
        Ok(())
    }

    /// Stop the loop; results of calls still in flight are discarded
    pub fn dispose(&self) {
        if !self.is_disposed() {
            info!("Shutting down bidding loop");
        }
        self.shutdown.send_replace(true);
    }

    pub fn is_disposed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auction::{AuctionPage, BidResponse, IdentityFormatter};
    use crate::error::BidError;
    use crate::market::oracle::tests::FakePriceSource;
    use crate::materials::FUEL_MATERIAL_ID;
    use crate::notify::tests::RecordingNotifier;
    use crate::scan::parser::tests::sample_reference;
    use crate::store::{MemoryBidStore, MemorySettingsStore};
    use crate::types::{AuctionId, AuctionRecord, Category, Region};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    pub(crate) const LEADING_PREFIX: &str = "当前你的公司是最高出价:";

    /// In-memory auction site
    ///
    /// Accepted bids flip the auction's status to "we lead", like the real site.
    pub(crate) struct FakeAuctionSite {
        pub auctions: Mutex<Vec<AuctionRecord>>,
        pub list_calls: Mutex<usize>,
        pub submissions: Mutex<Vec<(AuctionId, u64)>>,
        /// Scripted response codes; 200 once the script runs out
        pub responses: Mutex<VecDeque<i64>>,
        pub fail_listing: Mutex<bool>,
    }

    impl FakeAuctionSite {
        pub(crate) fn new(auctions: Vec<AuctionRecord>) -> Self {
            Self {
                auctions: Mutex::new(auctions),
                list_calls: Mutex::new(0),
                submissions: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
                fail_listing: Mutex::new(false),
            }
        }

        pub(crate) fn submissions(&self) -> Vec<(AuctionId, u64)> {
            self.submissions.lock().clone()
        }

        pub(crate) fn list_calls(&self) -> usize {
            *self.list_calls.lock()
        }
    }

    #[async_trait]
    impl AuctionApi for FakeAuctionSite {
        async fn list_open(&self, _token: &str) -> Result<AuctionPage> {
            *self.list_calls.lock() += 1;
            if *self.fail_listing.lock() {
                return Err(BidError::Network("connection reset".to_string()));
            }
            let auctions = self.auctions.lock().clone();
            Ok(AuctionPage {
                total: auctions.len() as u64,
                auctions,
            })
        }

        async fn submit_bid(&self, _token: &str, id: AuctionId, price: u64) -> Result<BidResponse> {
            self.submissions.lock().push((id, price));
            let code = self.responses.lock().pop_front().unwrap_or(200);
            if code == 200 {
                if let Some(a) = self.auctions.lock().iter_mut().find(|a| a.id == id) {
                    a.raw_status_text = format!("{}{}", LEADING_PREFIX, price);
                }
            }
            Ok(BidResponse {
                code,
                message: format!("code {}", code),
            })
        }
    }

    /// Auto extractor auction whose item detail is a scan of one moon of `fraction` Zeolites
    pub(crate) fn moon_auction(id: AuctionId, name: &str, fraction: f64, status: &str) -> AuctionRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "itemName": name,
            "itemCategory": Category::AutoExtractor,
            "regionName": Region::Catch,
            "systemName": "K-6K16",
            "auctionInfo": status,
            "itemDetail": format!("{}\n\tZeolites\t{}\t45490", name, fraction),
            "startTime": "2024-10-01 20:00:00",
            "startPrice": "100,000,000",
        }))
        .unwrap()
    }

    pub(crate) struct Harness {
        pub bidder: Arc<Bidder>,
        pub site: Arc<FakeAuctionSite>,
        pub prices: Arc<FakePriceSource>,
        pub bids: MemoryBidStore,
        pub settings: MemorySettingsStore,
        pub notifier: Arc<RecordingNotifier>,
    }

    /// Bidder over fakes with zero delays; 16634 buys at `unit_price`
    pub(crate) fn harness(auctions: Vec<AuctionRecord>, unit_price: f64, rules: RuleBook) -> Harness {
        let timings = Timings {
            poll_interval: Duration::from_secs(3600),
            poll_jitter: Duration::ZERO,
            failure_backoff: Duration::ZERO,
            bid_settle: Duration::ZERO,
        };
        harness_with_timings(auctions, unit_price, rules, timings)
    }

    pub(crate) fn harness_with_timings(
        auctions: Vec<AuctionRecord>,
        unit_price: f64,
        rules: RuleBook,
        timings: Timings,
    ) -> Harness {
        let site = Arc::new(FakeAuctionSite::new(auctions));
        let prices = Arc::new(FakePriceSource::new(&[
            (16634, unit_price, unit_price),
            (FUEL_MATERIAL_ID, 0.0, 0.0),
        ]));
        let bids = MemoryBidStore::new();
        let settings = MemorySettingsStore::new();
        let notifier = Arc::new(RecordingNotifier::default());

        let deps = BidderDeps {
            auctions: site.clone(),
            formatter: Arc::new(IdentityFormatter),
            oracle: Arc::new(PriceOracle::new(prices.clone())),
            reference: Arc::new(sample_reference()),
            bids: Arc::new(bids.clone()),
            settings: Arc::new(settings.clone()),
            notifier: notifier.clone(),
        };
        let bidder = Arc::new(Bidder::new(
            deps,
            BidContext::new(Some("token".to_string()), rules),
            timings,
        ));

        Harness {
            bidder,
            site,
            prices,
            bids,
            settings,
            notifier,
        }
    }

    pub(crate) fn catch_auto_rule(min_cost_index: f64) -> ThresholdRule {
        ThresholdRule {
            region: Region::Catch,
            category: Category::AutoExtractor,
            min_cost_index,
        }
    }

    #[test]
    fn test_rule_changes_are_persisted_and_trigger_refresh() {
        let h = harness(Vec::new(), 1.0, RuleBook::default());
        let mut rx = h.bidder.trigger_rx.lock().take().unwrap();

        h.bidder.add_rule(catch_auto_rule(2.0)).unwrap();
        assert_eq!(h.settings.saved().unwrap().rules.len(), 1);
        assert_eq!(rx.try_recv().unwrap(), Trigger::Rules);

        assert!(h.bidder.exclude("Moon").unwrap());
        assert!(!h.bidder.exclude("Moon").unwrap());
        assert_eq!(rx.try_recv().unwrap(), Trigger::Exclusions);
        assert!(rx.try_recv().is_err());

        assert!(h.bidder.include("Moon").unwrap());
        assert_eq!(rx.try_recv().unwrap(), Trigger::Exclusions);

        assert!(h.bidder.remove_rule(5).unwrap().is_none());
        assert!(h.bidder.remove_rule(0).unwrap().is_some());
        assert_eq!(rx.try_recv().unwrap(), Trigger::Rules);
        assert!(h.settings.saved().unwrap().rules.is_empty());
    }

    #[test]
    fn test_token_change_triggers_refresh() {
        let h = harness(Vec::new(), 1.0, RuleBook::default());
        let mut rx = h.bidder.trigger_rx.lock().take().unwrap();

        h.bidder.set_token("token");
        assert!(rx.try_recv().is_err());
        h.bidder.set_token("fresh");
        assert_eq!(rx.try_recv().unwrap(), Trigger::Credential);
    }

    #[test]
    fn test_dispose() {
        let h = harness(Vec::new(), 1.0, RuleBook::default());
        assert!(!h.bidder.is_disposed());
        h.bidder.dispose();
        assert!(h.bidder.is_disposed());
    }
}
