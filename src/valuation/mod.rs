pub mod engine;
pub mod pricing;

pub use engine::{
    cost_index, hours_remaining, hours_since_start, per_cycle_value, price_yield,
    required_material_ids, Valuator, YieldValuation, VALUATION_HORIZON,
};
pub use pricing::{bid_increment, next_bid_price, BidStatus};
