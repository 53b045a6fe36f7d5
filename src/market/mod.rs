pub mod client;
pub mod oracle;

pub use client::{HttpItemNameSource, HttpPriceSource, ItemNameSource, PriceSource, PriceTable};
pub use oracle::PriceOracle;
