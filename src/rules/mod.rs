pub mod matcher;

pub use matcher::{matched_threshold, RuleBook};
