//! XT.com 거래소 커넥터.
//!
//! XT Spot v4 공개 REST API 구현. 심볼 포맷은 소문자 `btc_usdt`.

use crate::connector::{
    clamp_bars, parse_levels, value_to_decimal, value_to_decimal_opt, ExchangeCredentials,
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

const BASE_URL: &str = "https://sapi.xt.com";

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct XtEnvelope<T> {
    rc: i64,
    #[serde(default)]
    mc: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

/// XT 티커는 단문자 필드를 사용합니다 (s=symbol, c=close, q=base volume).
#[derive(Debug, Deserialize)]
struct XtTicker {
    s: String,
    #[serde(default)]
    t: Option<i64>,
    c: Value,
    #[serde(default)]
    o: Option<Value>,
    #[serde(default)]
    h: Option<Value>,
    #[serde(default)]
    l: Option<Value>,
    #[serde(default)]
    q: Option<Value>,
    #[serde(default)]
    v: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct XtDepth {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct XtKline {
    t: i64,
    o: Value,
    h: Value,
    l: Value,
    c: Value,
    q: Value,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// XT 현물 클라이언트.
pub struct XtClient {
    client: Client,
    credentials: ExchangeCredentials,
    base_url: String,
}

impl XtClient {
    /// 새 클라이언트 생성.
    pub fn new(client: Client, credentials: ExchangeCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    /// 표준 심볼을 XT 포맷으로 변환 (`BTC/USDT` → `btc_usdt`).
    fn to_native(symbol: &str) -> String {
        symbol.replace('/', "_").to_lowercase()
    }

    /// XT 심볼을 표준 포맷으로 변환 (`btc_usdt` → `BTC/USDT`).
    fn to_canonical(symbol: &str) -> String {
        symbol.replace('_', "/").to_uppercase()
    }

    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(exchange = "xt", %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("validate-appkey", &self.credentials.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api {
                exchange: "xt".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let envelope: XtEnvelope<T> = response.json().await?;
        if envelope.rc != 0 {
            return Err(GatewayError::Api {
                exchange: "xt".to_string(),
                message: format!(
                    "rc {}: {}",
                    envelope.rc,
                    envelope.mc.unwrap_or_default()
                ),
            });
        }
        envelope
            .result
            .ok_or_else(|| GatewayError::Parse("missing result field".to_string()))
    }
}

#[async_trait]
impl SpotExchange for XtClient {
    fn name(&self) -> &'static str {
        "xt"
    }

    async fn fetch_tickers(&self, _market_type: &str) -> GatewayResult<HashMap<String, Ticker>> {
        let rows: Vec<XtTicker> = self.public_get("/v4/public/ticker/24h", &[]).await?;

        let mut tickers = HashMap::with_capacity(rows.len());
        for row in rows {
            let symbol = Self::to_canonical(&row.s);
            let ticker = Ticker {
                symbol: symbol.clone(),
                last: value_to_decimal(&row.c)?,
                open: value_to_decimal_opt(row.o.as_ref()),
                high: value_to_decimal_opt(row.h.as_ref()),
                low: value_to_decimal_opt(row.l.as_ref()),
                bid: None,
                ask: None,
                volume: value_to_decimal_opt(row.q.as_ref()),
                quote_volume: value_to_decimal_opt(row.v.as_ref()),
                timestamp: row.t.and_then(DateTime::from_timestamp_millis),
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

        let book: XtDepth = self.public_get("/v4/public/depth", &params).await?;

        Ok(OrderBook {
            exchange: "xt".to_string(),
            symbol: symbol.to_string(),
            bids: parse_levels(&book.bids)?,
            asks: parse_levels(&book.asks)?,
            timestamp: book.timestamp.and_then(DateTime::from_timestamp_millis),
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

        let rows: Vec<XtKline> = self.public_get("/v4/public/kline", &params).await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            bars.push(OhlcvBar {
                timestamp: row.t,
                open: value_to_decimal(&row.o)?,
                high: value_to_decimal(&row.h)?,
                low: value_to_decimal(&row.l)?,
                close: value_to_decimal(&row.c)?,
                volume: value_to_decimal(&row.q)?,
            });
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
        assert_eq!(XtClient::to_native("BTC/USDT"), "btc_usdt");
        assert_eq!(XtClient::to_canonical("btc_usdt"), "BTC/USDT");
    }

    #[test]
    fn test_ticker_envelope_parsing() {
        let body = r#"{
            "rc": 0,
            "mc": "SUCCESS",
            "result": [
                {"s": "btc_usdt", "t": 1700000000000, "o": "41000", "c": "42000.5",
                 "h": "42500", "l": "40900", "q": "120.5", "v": "5000000"}
            ]
        }"#;
        let envelope: XtEnvelope<Vec<XtTicker>> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.rc, 0);
        let rows = envelope.result.unwrap();
        assert_eq!(rows[0].s, "btc_usdt");
        assert_eq!(value_to_decimal(&rows[0].c).unwrap(), dec!(42000.5));
    }

    #[test]
    fn test_kline_object_rows() {
        let body = r#"{
            "rc": 0,
            "result": [
                {"t": 1700000000000, "o": "1", "h": "2", "l": "0.5", "c": "1.5", "q": "10"}
            ]
        }"#;
        let envelope: XtEnvelope<Vec<XtKline>> = serde_json::from_str(body).unwrap();
        let rows = envelope.result.unwrap();
        assert_eq!(rows[0].t, 1_700_000_000_000);
        assert_eq!(value_to_decimal(&rows[0].c).unwrap(), dec!(1.5));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"rc": 1, "mc": "SYMBOL_NOT_EXIST"}"#;
        let envelope: XtEnvelope<Vec<XtTicker>> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.rc, 1);
        assert!(envelope.result.is_none());
    }
}
