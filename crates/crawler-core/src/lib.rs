//! # Crawler Core
//!
//! 멀티 거래소 코인 크롤러의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 크롤러 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 코인 레지스트리 도메인 모델 (Coin, ExchangeSymbolMapping, CoinMarketData)
//! - 심볼 조정(reconciliation) 순수 로직
//! - 타임프레임 정의 및 수집 윈도우 계산
//! - 시장 데이터 구조체 (Ticker, OrderBook, OhlcvBar)
//! - 재시도 실행기 (RetryExecutor)
//! - 로깅 인프라

pub mod domain;
pub mod logging;
pub mod retry;
pub mod types;

pub use domain::*;
pub use logging::*;
pub use retry::*;
pub use types::*;
