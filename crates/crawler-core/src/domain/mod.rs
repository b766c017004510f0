//! 코인 레지스트리 도메인 모델.

pub mod coin;
pub mod registry;

pub use coin::{Coin, CoinListing, CoinMarketData, ExchangeSymbolMapping, RegistryEntry};
pub use registry::{build_registry, STABLECOIN_TAG};
