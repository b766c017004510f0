//! 데이터 계층.
//!
//! 애그리게이터(CoinMarketCap) 목록 제공자, Redis 캐시, Postgres
//! 저장소를 제공합니다. 쓰기 경로는 수집기 하나뿐이고 읽기 경로는
//! Redis를 우선 조회하는 외부 소비자들입니다.

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};
pub use provider::{remove_stablecoins, CmcClient, CmcListingsPage};
pub use storage::price::{CloseStats, PriceStore};
pub use storage::redis::{keys, RedisCache, RedisConfig};
pub use storage::registry::RegistryStore;
