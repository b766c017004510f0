//! 거래소 게이트웨이.
//!
//! 커넥터 네 개를 한 번 생성해 보관하고, 거래소 키 기반의 균일한
//! 조회 표면(`MarketDataSource`)을 제공합니다.

use crate::connector::{BingxClient, CoinexClient, ExchangeCredentials, LbankClient, XtClient};
use crate::error::{GatewayError, GatewayResult};
use crate::traits::{MarketDataSource, SpotExchange};
use async_trait::async_trait;
use crawler_core::{OhlcvBar, OrderBook, Ticker, Timeframe};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

/// 지원하는 거래소 키 (기본 우선순위 순서).
pub const EXCHANGES: [&str; 4] = ["bingx", "xt", "lbank", "coinex"];

/// HTTP 요청 타임아웃.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// 거래소 커넥터 레지스트리.
///
/// 프로세스 시작 시 한 번 생성해 `Arc`로 공유합니다. 커넥터와 내부
/// reqwest 클라이언트(커넥션 풀)는 전체 수명 동안 재사용됩니다.
pub struct ExchangeGateway {
    connectors: HashMap<String, Box<dyn SpotExchange>>,
    order: Vec<String>,
}

impl ExchangeGateway {
    /// 우선순위 순서와 거래소별 자격증명으로 게이트웨이 생성.
    ///
    /// `order`에 지원 목록 밖의 거래소가 있으면
    /// [`GatewayError::UnknownExchange`]를 반환합니다. 자격증명이 없는
    /// 거래소는 빈 자격증명으로 생성됩니다 (공개 엔드포인트만 사용).
    pub fn new(
        order: &[String],
        credentials: &HashMap<String, ExchangeCredentials>,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;

        let mut connectors: HashMap<String, Box<dyn SpotExchange>> = HashMap::new();
        for exchange in order {
            let creds = credentials.get(exchange).cloned().unwrap_or_default();
            let connector: Box<dyn SpotExchange> = match exchange.as_str() {
                "bingx" => Box::new(BingxClient::new(client.clone(), creds)),
                "xt" => Box::new(XtClient::new(client.clone(), creds)),
                "lbank" => Box::new(LbankClient::new(client.clone(), creds)),
                "coinex" => Box::new(CoinexClient::new(client.clone(), creds)),
                other => return Err(GatewayError::UnknownExchange(other.to_string())),
            };
            connectors.insert(exchange.clone(), connector);
        }

        info!(exchanges = ?order, "Exchange gateway initialized");
        Ok(Self {
            connectors,
            order: order.to_vec(),
        })
    }

    /// 기본 우선순위로 게이트웨이 생성.
    pub fn with_default_order(
        credentials: &HashMap<String, ExchangeCredentials>,
    ) -> GatewayResult<Self> {
        let order: Vec<String> = EXCHANGES.iter().map(|s| s.to_string()).collect();
        Self::new(&order, credentials)
    }

    fn connector(&self, exchange: &str) -> GatewayResult<&dyn SpotExchange> {
        self.connectors
            .get(exchange)
            .map(|c| c.as_ref())
            .ok_or_else(|| GatewayError::UnknownExchange(exchange.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for ExchangeGateway {
    fn exchanges(&self) -> &[String] {
        &self.order
    }

    fn supports_depth_limit(&self, exchange: &str) -> bool {
        self.connectors
            .get(exchange)
            .map(|c| c.supports_depth_limit())
            .unwrap_or(true)
    }

    async fn fetch_tickers(
        &self,
        exchange: &str,
        market_type: &str,
    ) -> GatewayResult<HashMap<String, Ticker>> {
        let tickers = self.connector(exchange)?.fetch_tickers(market_type).await?;
        Ok(tickers
            .into_iter()
            .map(|(symbol, ticker)| (symbol, ticker.with_exchange(exchange)))
            .collect())
    }

    async fn fetch_order_book(
        &self,
        exchange: &str,
        symbol: &str,
        depth: Option<u32>,
    ) -> GatewayResult<OrderBook> {
        self.connector(exchange)?
            .fetch_order_book(symbol, depth)
            .await
    }

    async fn fetch_ohlcv(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
    ) -> GatewayResult<Vec<OhlcvBar>> {
        self.connector(exchange)?
            .fetch_ohlcv(symbol, timeframe, limit, since_ms, until_ms)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> ExchangeGateway {
        ExchangeGateway::with_default_order(&HashMap::new()).unwrap()
    }

    #[test]
    fn test_default_order_matches_exchange_list() {
        let gw = gateway();
        assert_eq!(gw.exchanges(), &EXCHANGES.map(String::from));
    }

    #[test]
    fn test_unknown_exchange_rejected_at_build() {
        let order = vec!["bingx".to_string(), "binance".to_string()];
        let err = ExchangeGateway::new(&order, &HashMap::new()).err().unwrap();
        assert!(matches!(err, GatewayError::UnknownExchange(e) if e == "binance"));
    }

    #[test]
    fn test_custom_priority_order_preserved() {
        let order = vec!["coinex".to_string(), "bingx".to_string()];
        let gw = ExchangeGateway::new(&order, &HashMap::new()).unwrap();
        assert_eq!(gw.exchanges(), &["coinex", "bingx"]);
    }

    #[test]
    fn test_depth_limit_support() {
        let gw = gateway();
        assert!(gw.supports_depth_limit("bingx"));
        assert!(gw.supports_depth_limit("xt"));
        assert!(gw.supports_depth_limit("lbank"));
        assert!(!gw.supports_depth_limit("coinex"));
    }

    #[tokio::test]
    async fn test_unknown_exchange_on_call() {
        let gw = gateway();
        let err = gw.fetch_tickers("upbit", "spot").await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownExchange(_)));
    }
}
