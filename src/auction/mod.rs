pub mod client;

pub use client::{
    AuctionApi, AuctionPage, BidResponse, HttpAuctionApi, HttpScanFormatter, IdentityFormatter,
    ScanFormatter,
};
