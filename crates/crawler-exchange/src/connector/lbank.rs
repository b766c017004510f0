//! LBank 거래소 커넥터.
//!
//! LBank v2 공개 REST API 구현. 심볼 포맷은 소문자 `btc_usdt`이며
//! 캔들 타임스탬프는 초 단위로 내려옵니다.

use crate::connector::{
    clamp_bars, parse_bar_row, parse_levels, value_to_decimal, value_to_decimal_opt,
    ExchangeCredentials,
};
use crate::error::{GatewayError, GatewayResult};
use crate::traits::SpotExchange;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crawler_core::{OhlcvBar, OrderBook, Ticker, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const BASE_URL: &str = "https://api.lbkex.net";

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct LbankEnvelope<T> {
    /// 성공 여부. 문자열 `"true"` 또는 불리언으로 내려옵니다.
    result: Value,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    data: Option<T>,
}

impl<T> LbankEnvelope<T> {
    fn is_ok(&self) -> bool {
        match &self.result {
            Value::Bool(b) => *b,
            Value::String(s) => s == "true",
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LbankTickerRow {
    symbol: String,
    #[serde(default)]
    timestamp: Option<i64>,
    ticker: LbankTicker,
}

#[derive(Debug, Deserialize)]
struct LbankTicker {
    latest: Value,
    #[serde(default)]
    high: Option<Value>,
    #[serde(default)]
    low: Option<Value>,
    #[serde(default)]
    vol: Option<Value>,
    #[serde(default)]
    turnover: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct LbankDepth {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// LBank 현물 클라이언트.
pub struct LbankClient {
    client: Client,
    #[allow(dead_code)]
    credentials: ExchangeCredentials,
    base_url: String,
}

impl LbankClient {
    /// 새 클라이언트 생성. 공개 엔드포인트만 사용하므로 자격증명은
    /// 레이트리밋 완화 용도로만 보관합니다.
    pub fn new(client: Client, credentials: ExchangeCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    /// 표준 심볼을 LBank 포맷으로 변환 (`BTC/USDT` → `btc_usdt`).
    fn to_native(symbol: &str) -> String {
        symbol.replace('/', "_").to_lowercase()
    }

    /// LBank 심볼을 표준 포맷으로 변환 (`btc_usdt` → `BTC/USDT`).
    fn to_canonical(symbol: &str) -> String {
        symbol.replace('_', "/").to_uppercase()
    }

    /// 시작 시각이 주어지지 않았을 때의 kbar 요청 시작 시각(초).
    ///
    /// 현재 시각에서 limit 개수만큼 과거로 거슬러 올라갑니다.
    fn default_start_secs(now_secs: i64, timeframe: Timeframe, limit: u32) -> i64 {
        now_secs - i64::from(limit) * timeframe.as_secs() as i64
    }

    /// 타임프레임을 LBank kbar type 파라미터로 변환.
    fn interval(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M5 => "minute5",
            Timeframe::M15 => "minute15",
            Timeframe::H1 => "hour1",
            Timeframe::H4 => "hour4",
            Timeframe::D1 => "day1",
            Timeframe::W1 => "week1",
        }
    }

    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(exchange = "lbank", %url, "GET");

        let response = self.client.get(&url).query(params).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api {
                exchange: "lbank".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let envelope: LbankEnvelope<T> = response.json().await?;
        if !envelope.is_ok() {
            return Err(GatewayError::Api {
                exchange: "lbank".to_string(),
                message: format!("error_code {}", envelope.error_code.unwrap_or(-1)),
            });
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Parse("missing data field".to_string()))
    }
}

#[async_trait]
impl SpotExchange for LbankClient {
    fn name(&self) -> &'static str {
        "lbank"
    }

    async fn fetch_tickers(&self, _market_type: &str) -> GatewayResult<HashMap<String, Ticker>> {
        let rows: Vec<LbankTickerRow> = self
            .public_get("/v2/ticker/24hr.do", &[("symbol", "all".to_string())])
            .await?;

        let mut tickers = HashMap::with_capacity(rows.len());
        for row in rows {
            let symbol = Self::to_canonical(&row.symbol);
            let ticker = Ticker {
                symbol: symbol.clone(),
                last: value_to_decimal(&row.ticker.latest)?,
                open: None,
                high: value_to_decimal_opt(row.ticker.high.as_ref()),
                low: value_to_decimal_opt(row.ticker.low.as_ref()),
                bid: None,
                ask: None,
                volume: value_to_decimal_opt(row.ticker.vol.as_ref()),
                quote_volume: value_to_decimal_opt(row.ticker.turnover.as_ref()),
                timestamp: row.timestamp.and_then(DateTime::from_timestamp_millis),
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
            params.push(("size", limit.to_string()));
        }

        let book: LbankDepth = self.public_get("/v2/depth.do", &params).await?;

        Ok(OrderBook {
            exchange: "lbank".to_string(),
            symbol: symbol.to_string(),
            bids: parse_levels(&book.bids)?,
            asks: parse_levels(&book.asks)?,
            timestamp: Some(Utc::now()),
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
        // kbar는 시작 시각(초) 파라미터가 필수입니다. since가 없으면
        // limit 개수만큼 과거로 거슬러 올라간 시점부터 요청합니다.
        let start_secs = match since_ms {
            Some(since) => since / 1000,
            None => Self::default_start_secs(Utc::now().timestamp(), timeframe, limit),
        };

        let params = vec![
            ("symbol", Self::to_native(symbol)),
            ("size", limit.to_string()),
            ("type", Self::interval(timeframe).to_string()),
            ("time", start_secs.to_string()),
        ];

        let rows: Vec<Vec<Value>> = self.public_get("/v2/kbar.do", &params).await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(bar) = parse_bar_row(row, true)? {
                bars.push(bar);
            }
        }
        Ok(clamp_bars(bars, since_ms, until_ms))
    }
}
