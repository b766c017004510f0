//! Standalone multi-exchange crypto data collector.
//!
//! 이 crate는 수집 파이프라인의 오케스트레이터 바이너리를 제공합니다:
//! - 코인 레지스트리 갱신 (CMC 목록 ↔ 거래소 티커 조정)
//! - 실시간 시세 수집
//! - 호가창 스냅샷 수집
//! - 타임프레임별 OHLCV 수집

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::IngestionStats;
