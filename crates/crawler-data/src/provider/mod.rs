//! 외부 데이터 제공자.

pub mod cmc;

pub use cmc::{remove_stablecoins, CmcClient, CmcListingsPage};
