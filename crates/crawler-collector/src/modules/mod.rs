//! 수집 모듈.
//!
//! 모듈 하나가 수집 작업 하나(레지스트리/실시간/호가창/OHLCV)입니다.
//! 거래소 접근은 전부 `MarketDataSource` trait을 통해 주입받습니다.

pub mod ohlcv_refresh;
pub mod orderbook;
pub mod realtime;
pub mod registry_refresh;

pub use ohlcv_refresh::refresh_ohlcv;
pub use orderbook::collect_orderbook;
pub use realtime::collect_realtime;
pub use registry_refresh::refresh_registry;

use crawler_core::{retry, RegistryEntry, RetryPolicy, Ticker};
use crawler_exchange::MarketDataSource;
use std::collections::HashMap;
use tracing::warn;

/// 코인 하나의 (거래소, 거래 심볼) 후보를 우선순위 순서로 반환합니다.
///
/// 매핑이 없는 거래소는 건너뜁니다.
pub(crate) fn symbol_candidates(
    entry: &RegistryEntry,
    order: &[String],
) -> Vec<(String, String)> {
    order
        .iter()
        .filter_map(|exchange| {
            entry
                .mappings
                .get(exchange)
                .map(|symbol| (exchange.clone(), symbol.clone()))
        })
        .collect()
}

/// 모든 거래소의 전체 시세 스냅샷을 가져옵니다.
///
/// 거래소 하나의 실패는 로그만 남기고 결과에서 제외합니다. 반환값은
/// (거래소 → 심볼 → 시세, 실패한 거래소 수)입니다.
pub(crate) async fn collect_exchange_tickers(
    source: &dyn MarketDataSource,
    policy: &RetryPolicy,
) -> (HashMap<String, HashMap<String, Ticker>>, usize) {
    let mut tickers_by_exchange = HashMap::new();
    let mut failures = 0;

    for exchange in source.exchanges() {
        match retry(policy, || source.fetch_tickers(exchange, "spot")).await {
            Ok(tickers) => {
                tickers_by_exchange.insert(exchange.clone(), tickers);
            }
            Err(e) => {
                failures += 1;
                warn!(exchange = %exchange, error = %e, "시세 스냅샷 조회 실패, 거래소 제외");
            }
        }
    }

    (tickers_by_exchange, failures)
}


#[cfg(test)]
mod tests {
    use super::testutil::{entry, FakeSource};
    use super::*;
    use crawler_core::Ticker;
    use rust_decimal_macros::dec;

    #[test]
    fn test_symbol_candidates_follow_priority() {
        let entry = entry(1, "BTC", &[("coinex", "BTC/USDT"), ("bingx", "BTC/USDT")]);
        let order = vec!["bingx".to_string(), "xt".to_string(), "coinex".to_string()];

        let candidates = symbol_candidates(&entry, &order);
        assert_eq!(
            candidates,
            vec![
                ("bingx".to_string(), "BTC/USDT".to_string()),
                ("coinex".to_string(), "BTC/USDT".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_exchange_tickers_skips_failed_exchange() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.tickers.insert(
            "bingx".to_string(),
            [("BTC/USDT".to_string(), Ticker::new("BTC/USDT", dec!(42000)))].into(),
        );
        source.failing.insert("xt".to_string());

        let policy = crawler_core::RetryPolicy::default();
        let (tickers, failures) = collect_exchange_tickers(&source, &policy).await;

        assert_eq!(failures, 1);
        assert!(tickers.contains_key("bingx"));
        assert!(!tickers.contains_key("xt"));
    }
}
