use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::types::{AuctionRecord, Category, Region, ThresholdRule};

/// Lowest `min_cost_index` among the rules for the record's region and
/// category. Excluded items and items without a rule get `f64::INFINITY`.
pub fn matched_threshold(
    record: &AuctionRecord,
    rules: &[ThresholdRule],
    exclusions: &BTreeSet<String>,
) -> f64 {
    if exclusions.contains(&record.item_name) {
        return f64::INFINITY;
    }

    threshold_for(record.region, record.category, rules)
}

fn threshold_for(region: Region, category: Category, rules: &[ThresholdRule]) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.region == region && rule.category == category)
        .map(|rule| rule.min_cost_index)
        .fold(f64::INFINITY, f64::min)
}

/// User-authored threshold rules and excluded item names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default)]
    pub rules: Vec<ThresholdRule>,
    #[serde(default)]
    pub exclusions: BTreeSet<String>,
}

impl RuleBook {
    pub fn new(rules: Vec<ThresholdRule>, exclusions: impl IntoIterator<Item = String>) -> Self {
        Self {
            rules,
            exclusions: exclusions.into_iter().collect(),
        }
    }

    pub fn threshold(&self, record: &AuctionRecord) -> f64 {
        matched_threshold(record, &self.rules, &self.exclusions)
    }

    pub fn add_rule(&mut self, rule: ThresholdRule) {
        info!("Added rule: {}", rule);
        self.rules.push(rule);
    }

    /// Remove the rule at `index` as listed by `rules`
    pub fn remove_rule(&mut self, index: usize) -> Option<ThresholdRule> {
        if index >= self.rules.len() {
            return None;
        }
        let rule = self.rules.remove(index);
        info!("Removed rule: {}", rule);
        Some(rule)
    }

    /// Returns false if the name was already excluded
    pub fn exclude(&mut self, item_name: &str) -> bool {
        self.exclusions.insert(item_name.to_string())
    }

    /// Returns false if the name was not excluded
    pub fn include(&mut self, item_name: &str) -> bool {
        self.exclusions.remove(item_name)
    }

    /// Flip the exclusion state of an item, returns true if it is now excluded
    pub fn toggle_exclusion(&mut self, item_name: &str) -> bool {
        if self.include(item_name) {
            false
        } else {
            self.exclude(item_name)
        }
    }

    pub fn is_excluded(&self, item_name: &str) -> bool {
        self.exclusions.contains(item_name)
    }
}
