//! 거래소 trait 정의.

use crate::error::GatewayResult;
use async_trait::async_trait;
use crawler_core::{OhlcvBar, OrderBook, Ticker, Timeframe};
use std::collections::HashMap;

/// 현물 거래소 커넥터 인터페이스.
///
/// 커넥터는 표준 심볼(`BTC/USDT`)을 받아 내부적으로 거래소 고유
/// 포맷으로 변환하고, 응답도 표준 심볼로 되돌려 반환합니다.
#[async_trait]
pub trait SpotExchange: Send + Sync {
    /// 거래소 키 반환 (소문자).
    fn name(&self) -> &'static str;

    /// 호가창 depth 파라미터 지원 여부.
    ///
    /// `false`인 거래소에는 게이트웨이가 depth를 생략해서 전달합니다.
    fn supports_depth_limit(&self) -> bool {
        true
    }

    /// 해당 시장 구분의 전체 시세 스냅샷 조회.
    async fn fetch_tickers(&self, market_type: &str) -> GatewayResult<HashMap<String, Ticker>>;

    /// 호가창 스냅샷 조회.
    ///
    /// `depth`가 `None`이면 파라미터를 생략하고 거래소 기본값을 사용합니다.
    async fn fetch_order_book(&self, symbol: &str, depth: Option<u32>)
        -> GatewayResult<OrderBook>;

    /// OHLCV 캔들 조회. 반환 순서는 시간 오름차순입니다.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
    ) -> GatewayResult<Vec<OhlcvBar>>;
}

/// 오케스트레이터가 소비하는 게이트웨이 표면.
///
/// `ExchangeGateway`가 기본 구현이며, 테스트에서는 가짜 구현으로
/// 대체합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 설정된 거래소 키 목록 (우선순위 순서, 호출 간 고정).
    fn exchanges(&self) -> &[String];

    /// 해당 거래소의 depth 파라미터 지원 여부.
    fn supports_depth_limit(&self, exchange: &str) -> bool;

    /// 거래소의 전체 시세 스냅샷 조회.
    async fn fetch_tickers(
        &self,
        exchange: &str,
        market_type: &str,
    ) -> GatewayResult<HashMap<String, Ticker>>;

    /// 거래소의 호가창 스냅샷 조회 (출처 거래소 태그 포함).
    async fn fetch_order_book(
        &self,
        exchange: &str,
        symbol: &str,
        depth: Option<u32>,
    ) -> GatewayResult<OrderBook>;

    /// 거래소의 OHLCV 캔들 조회.
    async fn fetch_ohlcv(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
    ) -> GatewayResult<Vec<OhlcvBar>>;
}
