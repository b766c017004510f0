//! BingX 거래소 커넥터.
//!
//! BingX Spot 공개 REST API 구현. 심볼 포맷은 `BTC-USDT`.

use crate::connector::{
    clamp_bars, parse_bar_row, parse_levels, value_to_decimal, value_to_decimal_opt,
    ExchangeCredentials,
};
use crate::error::{GatewayError, GatewayResult};
use crate::traits::SpotExchange;
use async_trait::async_trait;
use chrono::DateTime;
use crawler_core::{OhlcvBar, OrderBook, Ticker, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const BASE_URL: &str = "https://open-api.bingx.com";

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct BingxEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingxTicker {
    symbol: String,
    last_price: Value,
    #[serde(default)]
    open_price: Option<Value>,
    #[serde(default)]
    high_price: Option<Value>,
    #[serde(default)]
    low_price: Option<Value>,
    #[serde(default)]
    bid_price: Option<Value>,
    #[serde(default)]
    ask_price: Option<Value>,
    #[serde(default)]
    volume: Option<Value>,
    #[serde(default)]
    quote_volume: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BingxDepth {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
    #[serde(default)]
    ts: Option<i64>,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// BingX 현물 클라이언트.
pub struct BingxClient {
    client: Client,
    credentials: ExchangeCredentials,
    base_url: String,
}

impl BingxClient {
    /// 새 클라이언트 생성. 프로세스당 한 번 생성해 재사용합니다.
    pub fn new(client: Client, credentials: ExchangeCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    /// base URL을 지정해 생성 (테스트용).
    pub fn with_base_url(
        client: Client,
        credentials: ExchangeCredentials,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            base_url: base_url.into(),
        }
    }

    /// 표준 심볼을 BingX 포맷으로 변환 (`BTC/USDT` → `BTC-USDT`).
    fn to_native(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    /// BingX 심볼을 표준 포맷으로 변환 (`BTC-USDT` → `BTC/USDT`).
    fn to_canonical(symbol: &str) -> String {
        symbol.replace('-', "/")
    }

    fn api_error(&self, code: i64, msg: Option<String>) -> GatewayError {
        GatewayError::Api {
            exchange: "bingx".to_string(),
            message: format!("code {}: {}", code, msg.unwrap_or_default()),
        }
    }

    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(exchange = "bingx", %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("X-BX-APIKEY", &self.credentials.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api {
                exchange: "bingx".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let envelope: BingxEnvelope<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(self.api_error(envelope.code, envelope.msg));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Parse("missing data field".to_string()))
    }
}

#[async_trait]
impl SpotExchange for BingxClient {
    fn name(&self) -> &'static str {
        "bingx"
    }

    async fn fetch_tickers(&self, _market_type: &str) -> GatewayResult<HashMap<String, Ticker>> {
        let rows: Vec<BingxTicker> = self
            .public_get("/openApi/spot/v1/ticker/24hr", &[])
            .await?;

        let mut tickers = HashMap::with_capacity(rows.len());
        for row in rows {
            let symbol = Self::to_canonical(&row.symbol);
            let ticker = Ticker {
                symbol: symbol.clone(),
                last: value_to_decimal(&row.last_price)?,
                open: value_to_decimal_opt(row.open_price.as_ref()),
                high: value_to_decimal_opt(row.high_price.as_ref()),
                low: value_to_decimal_opt(row.low_price.as_ref()),
                bid: value_to_decimal_opt(row.bid_price.as_ref()),
                ask: value_to_decimal_opt(row.ask_price.as_ref()),
                volume: value_to_decimal_opt(row.volume.as_ref()),
                quote_volume: value_to_decimal_opt(row.quote_volume.as_ref()),
                timestamp: None,
                exchange: None,
            };
            tickers.insert(symbol, ticker);
        }
        Ok(tickers)
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: Option<u32>,
    ) -> GatewayResult<OrderBook> {
        let mut params = vec![("symbol", Self::to_native(symbol))];
        if let Some(limit) = depth {
            params.push(("limit", limit.to_string()));
        }

        let book: BingxDepth = self
            .public_get("/openApi/spot/v1/market/depth", &params)
            .await?;

        Ok(OrderBook {
            exchange: "bingx".to_string(),
            symbol: symbol.to_string(),
            bids: parse_levels(&book.bids)?,
            asks: parse_levels(&book.asks)?,
            timestamp: book.ts.and_then(DateTime::from_timestamp_millis),
        })
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
    ) -> GatewayResult<Vec<OhlcvBar>> {
        let mut params = vec![
            ("symbol", Self::to_native(symbol)),
            ("interval", timeframe.label().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(since) = since_ms {
            params.push(("startTime", since.to_string()));
        }
        if let Some(until) = until_ms {
            params.push(("endTime", until.to_string()));
        }

        let rows: Vec<Vec<Value>> = self
            .public_get("/openApi/spot/v2/market/kline", &params)
            .await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(bar) = parse_bar_row(row, false)? {
                bars.push(bar);
            }
        }
        Ok(clamp_bars(bars, since_ms, until_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_symbol_conversion() {
        assert_eq!(BingxClient::to_native("BTC/USDT"), "BTC-USDT");
        assert_eq!(BingxClient::to_canonical("BTC-USDT"), "BTC/USDT");
    }

    #[test]
    fn test_ticker_envelope_parsing() {
        let body = r#"{
            "code": 0,
            "msg": "",
            "data": [
                {"symbol": "BTC-USDT", "lastPrice": "42000.5", "openPrice": 41000,
                 "highPrice": "42500", "lowPrice": "40900", "volume": "120.5",
                 "quoteVolume": "5000000"}
            ]
        }"#;
        let envelope: BingxEnvelope<Vec<BingxTicker>> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.code, 0);
        let rows = envelope.data.unwrap();
        assert_eq!(rows[0].symbol, "BTC-USDT");
        assert_eq!(value_to_decimal(&rows[0].last_price).unwrap(), dec!(42000.5));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"code": 100400, "msg": "invalid symbol"}"#;
        let envelope: BingxEnvelope<Vec<BingxTicker>> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.code, 100400);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_fetch_tickers_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/openApi/spot/v1/ticker/24hr")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 0, "data": [{"symbol": "BTC-USDT", "lastPrice": "42000.5"}]}"#)
            .create_async()
            .await;

        let client = BingxClient::with_base_url(
            Client::new(),
            ExchangeCredentials::default(),
            server.url(),
        );
        let tickers = client.fetch_tickers("spot").await.unwrap();
        mock.assert_async().await;

        assert_eq!(tickers["BTC/USDT"].last, dec!(42000.5));
    }

    #[tokio::test]
    async fn test_fetch_tickers_error_code_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/openApi/spot/v1/ticker/24hr")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 100400, "msg": "rate limited"}"#)
            .create_async()
            .await;

        let client = BingxClient::with_base_url(
            Client::new(),
            ExchangeCredentials::default(),
            server.url(),
        );
        let err = client.fetch_tickers("spot").await.err().unwrap();
        assert!(matches!(err, GatewayError::Api { exchange, .. } if exchange == "bingx"));
    }
}
