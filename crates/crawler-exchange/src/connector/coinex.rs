//! CoinEx 거래소 커넥터.
//!
//! CoinEx v1 공개 REST API 구현. 심볼 포맷은 구분자 없는 `BTCUSDT`이고,
//! 캔들 행은 `[time, open, close, high, low, volume, amount]` 순서로
//! 내려옵니다 (close가 high/low보다 앞).

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

const BASE_URL: &str = "https://api.coinex.com";

/// depth 생략 시 사용하는 기본 호가 단계 수.
const DEFAULT_DEPTH: u32 = 20;

/// 구분자 없는 심볼을 되돌릴 때 시도하는 견적 통화 (긴 것 우선).
const QUOTE_CURRENCIES: [&str; 4] = ["USDT", "USDC", "BTC", "ETH"];

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct CoinexEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CoinexTickerAll {
    #[serde(default)]
    date: Option<i64>,
    ticker: HashMap<String, CoinexTicker>,
}

#[derive(Debug, Deserialize)]
struct CoinexTicker {
    last: Value,
    #[serde(default)]
    open: Option<Value>,
    #[serde(default)]
    high: Option<Value>,
    #[serde(default)]
    low: Option<Value>,
    #[serde(default)]
    buy: Option<Value>,
    #[serde(default)]
    sell: Option<Value>,
    #[serde(default)]
    vol: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CoinexDepth {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
    #[serde(default)]
    time: Option<i64>,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// CoinEx 현물 클라이언트.
pub struct CoinexClient {
    client: Client,
    #[allow(dead_code)]
    credentials: ExchangeCredentials,
    base_url: String,
}

impl CoinexClient {
    /// 새 클라이언트 생성.
    pub fn new(client: Client, credentials: ExchangeCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    /// 표준 심볼을 CoinEx 포맷으로 변환 (`BTC/USDT` → `BTCUSDT`).
    fn to_native(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    /// CoinEx 심볼을 표준 포맷으로 변환 (`BTCUSDT` → `BTC/USDT`).
    ///
    /// 구분자가 없으므로 알려진 견적 통화 접미사로 분리합니다. 분리에
    /// 실패하면 원본을 그대로 반환합니다.
    fn to_canonical(symbol: &str) -> String {
        for quote in QUOTE_CURRENCIES {
            if let Some(base) = symbol.strip_suffix(quote) {
                if !base.is_empty() {
                    return format!("{base}/{quote}");
                }
            }
        }
        symbol.to_string()
    }

    /// 타임프레임을 CoinEx kline type 파라미터로 변환.
    fn interval(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::H1 => "1hour",
            Timeframe::H4 => "4hour",
            Timeframe::D1 => "1day",
            Timeframe::W1 => "1week",
        }
    }

    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(exchange = "coinex", %url, "GET");

        let response = self.client.get(&url).query(params).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api {
                exchange: "coinex".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let envelope: CoinexEnvelope<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(GatewayError::Api {
                exchange: "coinex".to_string(),
                message: format!(
                    "code {}: {}",
                    envelope.code,
                    envelope.message.unwrap_or_default()
                ),
            });
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Parse("missing data field".to_string()))
    }
}

#[async_trait]
impl SpotExchange for CoinexClient {
    fn name(&self) -> &'static str {
        "coinex"
    }

    fn supports_depth_limit(&self) -> bool {
        false
    }

    async fn fetch_tickers(&self, _market_type: &str) -> GatewayResult<HashMap<String, Ticker>> {
        let all: CoinexTickerAll = self.public_get("/v1/market/ticker/all", &[]).await?;
        let timestamp = all.date.and_then(DateTime::from_timestamp_millis);

        let mut tickers = HashMap::with_capacity(all.ticker.len());
        for (market, row) in all.ticker {
            let symbol = Self::to_canonical(&market);
            let ticker = Ticker {
                symbol: symbol.clone(),
                last: value_to_decimal(&row.last)?,
                open: value_to_decimal_opt(row.open.as_ref()),
                high: value_to_decimal_opt(row.high.as_ref()),
                low: value_to_decimal_opt(row.low.as_ref()),
                bid: value_to_decimal_opt(row.buy.as_ref()),
                ask: value_to_decimal_opt(row.sell.as_ref()),
                volume: value_to_decimal_opt(row.vol.as_ref()),
                quote_volume: None,
                timestamp,
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
        // limit이 필수 파라미터라 생략 시 기본값을 채웁니다.
        let limit = depth.unwrap_or(DEFAULT_DEPTH);
        let params = vec![
            ("market", Self::to_native(symbol)),
            ("merge", "0".to_string()),
            ("limit", limit.to_string()),
        ];

        let book: CoinexDepth = self.public_get("/v1/market/depth", &params).await?;

        Ok(OrderBook {
            exchange: "coinex".to_string(),
            symbol: symbol.to_string(),
            bids: parse_levels(&book.bids)?,
            asks: parse_levels(&book.asks)?,
            timestamp: book.time.and_then(DateTime::from_timestamp_millis),
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
        let params = vec![
            ("market", Self::to_native(symbol)),
            ("type", Self::interval(timeframe).to_string()),
            ("limit", limit.to_string()),
        ];

        let rows: Vec<Vec<Value>> = self.public_get("/v1/market/kline", &params).await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() < 6 {
                continue;
            }
            let timestamp = row[0]
                .as_i64()
                .ok_or_else(|| GatewayError::Parse(format!("invalid bar timestamp: {}", row[0])))?
                * 1000;
            // 행 순서가 [time, open, close, high, low, volume]입니다.
            bars.push(OhlcvBar {
                timestamp,
                open: value_to_decimal(&row[1])?,
                close: value_to_decimal(&row[2])?,
                high: value_to_decimal(&row[3])?,
                low: value_to_decimal(&row[4])?,
                volume: value_to_decimal(&row[5])?,
            });
        }
        // since/until 파라미터가 없는 API라 클라이언트에서 잘라냅니다.
        Ok(clamp_bars(bars, since_ms, until_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_symbol_conversion() {
        assert_eq!(CoinexClient::to_native("BTC/USDT"), "BTCUSDT");
        assert_eq!(CoinexClient::to_canonical("BTCUSDT"), "BTC/USDT");
        assert_eq!(CoinexClient::to_canonical("ETHBTC"), "ETH/BTC");
        // 알 수 없는 견적 통화는 원본 유지
        assert_eq!(CoinexClient::to_canonical("ABCXYZ"), "ABCXYZ");
    }

    #[test]
    fn test_interval_mapping() {
        assert_eq!(CoinexClient::interval(Timeframe::M5), "5min");
        assert_eq!(CoinexClient::interval(Timeframe::D1), "1day");
        assert_eq!(CoinexClient::interval(Timeframe::W1), "1week");
    }

    #[test]
    fn test_ticker_map_parsing() {
        let body = r#"{
            "code": 0,
            "message": "Ok",
            "data": {
                "date": 1700000000000,
                "ticker": {
                    "BTCUSDT": {"last": "42000.5", "open": "41000", "high": "42500",
                                "low": "40900", "buy": "41999", "sell": "42001",
                                "vol": "120.5"}
                }
            }
        }"#;
        let envelope: CoinexEnvelope<CoinexTickerAll> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.code, 0);
        let data = envelope.data.unwrap();
        let row = &data.ticker["BTCUSDT"];
        assert_eq!(value_to_decimal(&row.last).unwrap(), dec!(42000.5));
    }

    #[test]
    fn test_kline_row_field_order() {
        // [time, open, close, high, low, volume, amount]
        let body = r#"{
            "code": 0,
            "data": [[1700000000, "100", "105", "110", "95", "12.5", "1300"]]
        }"#;
        let envelope: CoinexEnvelope<Vec<Vec<Value>>> = serde_json::from_str(body).unwrap();
        let rows = envelope.data.unwrap();
        assert_eq!(rows[0][2], serde_json::json!("105"));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"code": 23, "message": "market not exist"}"#;
        let envelope: CoinexEnvelope<CoinexTickerAll> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.code, 23);
        assert!(envelope.data.is_none());
    }
}
