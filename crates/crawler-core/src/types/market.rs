//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 거래소에서 수집하는 시장 데이터 타입을 정의합니다:
//! - `Ticker` - 실시간 시세 스냅샷
//! - `OrderBook` - 호가창 스냅샷 (출처 거래소 태그 포함)
//! - `OhlcvBar` - OHLCV 캔들 한 개

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 실시간 시세 스냅샷.
///
/// 거래소마다 제공 필드가 다르므로 필수 값은 `symbol`/`last`뿐이고
/// 나머지는 모두 옵션입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// 표준 심볼 (예: "BTC/USDT")
    pub symbol: String,
    /// 최종 체결가
    pub last: Decimal,
    /// 시가 (24시간 기준)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    /// 고가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    /// 저가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    /// 최우선 매수 호가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// 최우선 매도 호가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// 거래량 (기준 자산 단위)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    /// 거래대금 (호가 자산 단위)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<Decimal>,
    /// 스냅샷 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// 출처 거래소 (오케스트레이터가 채움)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl Ticker {
    /// 최소 필드로 새 시세를 생성합니다.
    pub fn new(symbol: impl Into<String>, last: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            last,
            open: None,
            high: None,
            low: None,
            bid: None,
            ask: None,
            volume: None,
            quote_volume: None,
            timestamp: None,
            exchange: None,
        }
    }

    /// 출처 거래소를 태그합니다.
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }
}

/// 호가 한 줄 (가격, 수량).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// 가격
    pub price: Decimal,
    /// 수량
    pub quantity: Decimal,
}

/// 호가창 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    /// 출처 거래소
    pub exchange: String,
    /// 표준 심볼
    pub symbol: String,
    /// 매수 호가 (가격 내림차순)
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 (가격 오름차순)
    pub asks: Vec<OrderBookLevel>,
    /// 스냅샷 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl OrderBook {
    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<&OrderBookLevel> {
        self.asks.first()
    }
}

impl crate::retry::RetryValue for OrderBook {
    /// 양쪽 호가가 모두 비어 있으면 빈 결과로 취급합니다.
    fn is_empty_value(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// 직렬화 시 와이어 포맷 그대로의 배열 형태.
type BarRow = (i64, Decimal, Decimal, Decimal, Decimal, Decimal);

/// OHLCV 캔들 한 개.
///
/// JSON으로는 `[timestamp_ms, open, high, low, close, volume]` 배열로
/// 직렬화됩니다 (거래소 와이어 포맷과 동일).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BarRow", into = "BarRow")]
pub struct OhlcvBar {
    /// 캔들 시작 시각 (에포크 밀리초)
    pub timestamp: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl OhlcvBar {
    /// 캔들 시작 시각을 `DateTime`으로 반환합니다.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

impl From<BarRow> for OhlcvBar {
    fn from((timestamp, open, high, low, close, volume): BarRow) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl From<OhlcvBar> for BarRow {
    fn from(bar: OhlcvBar) -> Self {
        (bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bar_serializes_as_array() {
        let bar = OhlcvBar {
            timestamp: 1_700_000_000_000,
            open: dec!(100),
            high: dec!(110),
            low: dec!(90),
            close: dec!(105),
            volume: dec!(12.5),
        };
        let json = serde_json::to_value(&bar).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0], serde_json::json!(1_700_000_000_000i64));

        let back: OhlcvBar = serde_json::from_value(json).unwrap();
        assert_eq!(back, bar);
    }

    #[test]
    fn test_bar_deserializes_from_wire_format() {
        let bar: OhlcvBar =
            serde_json::from_str(r#"[1700000000000, "42000.1", "42100", "41900", "42050.5", "3.2"]"#)
                .unwrap();
        assert_eq!(bar.close, dec!(42050.5));
    }

    #[test]
    fn test_order_book_best_levels() {
        let book = OrderBook {
            exchange: "bingx".to_string(),
            symbol: "BTC/USDT".to_string(),
            bids: vec![OrderBookLevel {
                price: dec!(100),
                quantity: dec!(1),
            }],
            asks: vec![OrderBookLevel {
                price: dec!(101),
                quantity: dec!(2),
            }],
            timestamp: None,
        };
        assert_eq!(book.best_bid().unwrap().price, dec!(100));
        assert_eq!(book.best_ask().unwrap().price, dec!(101));
    }
}
