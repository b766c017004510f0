//! 거래소별 REST 커넥터.
//!
//! 거래소마다 응답 엔벨로프와 심볼 포맷이 다르므로 커넥터별로 파싱을
//! 구현하고, 공통 헬퍼(수치 파싱, 호가 레벨 변환)만 이 모듈에 둡니다.

pub mod bingx;
pub mod coinex;
pub mod lbank;
pub mod xt;

pub use bingx::BingxClient;
pub use coinex::CoinexClient;
pub use lbank::LbankClient;
pub use xt::XtClient;

use crate::error::{GatewayError, GatewayResult};
use crawler_core::OrderBookLevel;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 거래소 API 자격증명.
///
/// # 보안
/// `Debug` 구현은 민감 정보를 마스킹합니다.
#[derive(Clone, Default)]
pub struct ExchangeCredentials {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: String,
}

impl ExchangeCredentials {
    /// 새 자격증명 생성.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("ExchangeCredentials")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .finish()
    }
}

/// JSON 값(문자열 또는 숫자)을 Decimal로 변환합니다.
///
/// 거래소 API는 같은 필드를 문자열로 주기도 하고 숫자로 주기도 합니다.
pub(crate) fn value_to_decimal(value: &Value) -> GatewayResult<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s)
            .map_err(|e| GatewayError::Parse(format!("invalid decimal string {s:?}: {e}"))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Decimal::from(i))
            } else if let Some(f) = n.as_f64() {
                Decimal::from_f64(f)
                    .ok_or_else(|| GatewayError::Parse(format!("non-finite number: {n}")))
            } else {
                Err(GatewayError::Parse(format!("unrepresentable number: {n}")))
            }
        }
        other => Err(GatewayError::Parse(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// 옵션 JSON 값을 Decimal로 변환합니다 (null/누락은 None).
pub(crate) fn value_to_decimal_opt(value: Option<&Value>) -> Option<Decimal> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => value_to_decimal(v).ok(),
    }
}

/// `[price, quantity, ...]` 형태의 호가 행들을 변환합니다.
pub(crate) fn parse_levels(rows: &[Value]) -> GatewayResult<Vec<OrderBookLevel>> {
    rows.iter()
        .map(|row| {
            let cells = row
                .as_array()
                .ok_or_else(|| GatewayError::Parse(format!("expected level array, got {row}")))?;
            if cells.len() < 2 {
                return Err(GatewayError::Parse(format!("short level row: {row}")));
            }
            Ok(OrderBookLevel {
                price: value_to_decimal(&cells[0])?,
                quantity: value_to_decimal(&cells[1])?,
            })
        })
        .collect()
}

/// `[ts, o, h, l, c, v, ...]` 행 하나를 OHLCV 캔들로 변환합니다.
///
/// `ts_in_seconds`가 true면 타임스탬프를 밀리초로 승격합니다.
/// 필드가 6개 미만인 행은 버립니다 (원천 데이터 불량 방어).
pub(crate) fn parse_bar_row(
    row: &[Value],
    ts_in_seconds: bool,
) -> GatewayResult<Option<crawler_core::OhlcvBar>> {
    if row.len() < 6 {
        return Ok(None);
    }
    let mut timestamp = row[0]
        .as_i64()
        .ok_or_else(|| GatewayError::Parse(format!("invalid bar timestamp: {}", row[0])))?;
    if ts_in_seconds {
        timestamp *= 1000;
    }
    Ok(Some(crawler_core::OhlcvBar {
        timestamp,
        open: value_to_decimal(&row[1])?,
        high: value_to_decimal(&row[2])?,
        low: value_to_decimal(&row[3])?,
        close: value_to_decimal(&row[4])?,
        volume: value_to_decimal(&row[5])?,
    }))
}

/// since/until 범위로 캔들을 잘라내고 시간 오름차순으로 정렬합니다.
pub(crate) fn clamp_bars(
    mut bars: Vec<crawler_core::OhlcvBar>,
    since_ms: Option<i64>,
    until_ms: Option<i64>,
) -> Vec<crawler_core::OhlcvBar> {
    if let Some(since) = since_ms {
        bars.retain(|bar| bar.timestamp >= since);
    }
    if let Some(until) = until_ms {
        bars.retain(|bar| bar.timestamp <= until);
    }
    bars.sort_by_key(|bar| bar.timestamp);
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_value_to_decimal_accepts_both_shapes() {
        assert_eq!(value_to_decimal(&json!("42000.5")).unwrap(), dec!(42000.5));
        assert_eq!(value_to_decimal(&json!(42000.5)).unwrap(), dec!(42000.5));
        assert_eq!(value_to_decimal(&json!(7)).unwrap(), dec!(7));
        assert!(value_to_decimal(&json!(null)).is_err());
        assert!(value_to_decimal(&json!("abc")).is_err());
    }

    #[test]
    fn test_parse_bar_row_drops_short_rows() {
        let short = [json!(1), json!("1"), json!("2")];
        assert!(parse_bar_row(&short, false).unwrap().is_none());

        let full: Vec<_> = [1_700_000_000i64]
            .iter()
            .map(|v| json!(v))
            .chain(["1", "2", "0.5", "1.5", "10"].iter().map(|v| json!(v)))
            .collect();
        let bar = parse_bar_row(&full, true).unwrap().unwrap();
        assert_eq!(bar.timestamp, 1_700_000_000_000);
        assert_eq!(bar.close, dec!(1.5));
    }

    #[test]
    fn test_clamp_bars_filters_and_sorts() {
        let bar = |ts: i64| crawler_core::OhlcvBar {
            timestamp: ts,
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            volume: dec!(1),
        };
        let bars = vec![bar(300), bar(100), bar(200)];
        let clamped = clamp_bars(bars, Some(150), Some(250));
        assert_eq!(clamped.len(), 1);
        assert_eq!(clamped[0].timestamp, 200);
    }

    #[test]
    fn test_credentials_debug_masks_secrets() {
        let creds = ExchangeCredentials::new("super-secret-api-key", "topsecret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret-api-key"));
        assert!(!debug.contains("topsecret"));
    }
}
