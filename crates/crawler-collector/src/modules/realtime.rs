//! 실시간 시세 수집 모듈.
//!
//! 거래소별 전체 시세 스냅샷을 한 번씩 받아 레지스트리의 코인마다
//! 우선순위가 가장 높은 거래소의 시세를 고릅니다. 코인 하나를 해결하지
//! 못해도 배치는 계속됩니다.

use crate::modules::collect_exchange_tickers;
use crate::{CollectorConfig, IngestionStats, Result};
use crawler_core::{RegistryEntry, Ticker};
use crawler_data::{keys, RedisCache, RegistryStore};
use crawler_exchange::MarketDataSource;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use tracing::{info, warn};

/// 코인마다 우선순위 첫 거래소의 시세를 고릅니다.
///
/// 반환값은 (짧은 심볼 → 거래소 태그가 붙은 시세, 미해결 심볼)입니다.
pub fn resolve_realtime(
    entries: &[RegistryEntry],
    tickers_by_exchange: &HashMap<String, HashMap<String, Ticker>>,
    order: &[String],
) -> (BTreeMap<String, Ticker>, BTreeSet<String>) {
    let mut resolved = BTreeMap::new();
    let mut unresolved = BTreeSet::new();

    for entry in entries {
        let hit = order.iter().find_map(|exchange| {
            let symbol = entry.mappings.get(exchange)?;
            let ticker = tickers_by_exchange.get(exchange)?.get(symbol)?;
            let mut ticker = ticker.clone();
            ticker.exchange.get_or_insert_with(|| exchange.clone());
            Some(ticker)
        });

        match hit {
            Some(ticker) => {
                resolved.insert(entry.coin.symbol.clone(), ticker);
            }
            None => {
                unresolved.insert(entry.coin.symbol.clone());
            }
        }
    }

    (resolved, unresolved)
}

/// 실시간 시세 수집을 실행합니다.
pub async fn collect_realtime(
    source: &dyn MarketDataSource,
    cache: &RedisCache,
    store: &RegistryStore,
    config: &CollectorConfig,
) -> Result<IngestionStats> {
    let start = Instant::now();
    let mut stats = IngestionStats::new();
    let policy = config.retry.policy();

    let entries = store.load_registry().await?;
    stats.total = entries.len();
    if entries.is_empty() {
        warn!("레지스트리가 비어 있습니다. 먼저 refresh-registry를 실행하세요");
        stats.elapsed = start.elapsed();
        return Ok(stats);
    }

    let (tickers_by_exchange, failures) =
        collect_exchange_tickers(source, &policy).await;
    stats.errors = failures;

    let (resolved, unresolved) =
        resolve_realtime(&entries, &tickers_by_exchange, &config.exchange_order);
    stats.success = resolved.len();
    stats.unresolved = unresolved;

    // 코인별 키와 전체 스냅샷을 함께 갱신합니다.
    let pairs: Vec<(String, Ticker)> = resolved
        .iter()
        .map(|(symbol, ticker)| (keys::realtime(symbol), ticker.clone()))
        .collect();
    cache.bulk_set(&pairs).await?;
    cache.set(keys::REAL_TIME_DATA, &resolved).await?;

    info!(resolved = resolved.len(), total = entries.len(), "실시간 시세 갱신");

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testutil::entry;
    use rust_decimal_macros::dec;

    fn order() -> Vec<String> {
        vec!["bingx".to_string(), "xt".to_string()]
    }

    fn snapshot(
        pairs: &[(&str, &str, rust_decimal::Decimal)],
    ) -> HashMap<String, HashMap<String, Ticker>> {
        let mut map: HashMap<String, HashMap<String, Ticker>> = HashMap::new();
        for (exchange, symbol, last) in pairs {
            map.entry(exchange.to_string())
                .or_default()
                .insert(symbol.to_string(), Ticker::new(*symbol, *last));
        }
        map
    }

    #[test]
    fn test_first_exchange_in_priority_wins() {
        let entries = vec![entry(
            1,
            "BTC",
            &[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")],
        )];
        let tickers = snapshot(&[
            ("bingx", "BTC/USDT", dec!(42000)),
            ("xt", "BTC/USDT", dec!(42001)),
        ]);

        let (resolved, unresolved) = resolve_realtime(&entries, &tickers, &order());
        assert!(unresolved.is_empty());
        assert_eq!(resolved["BTC"].last, dec!(42000));
        assert_eq!(resolved["BTC"].exchange.as_deref(), Some("bingx"));
    }

    #[test]
    fn test_falls_back_when_snapshot_missing_symbol() {
        let entries = vec![entry(
            1,
            "BTC",
            &[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")],
        )];
        // bingx 스냅샷에는 BTC가 없음
        let tickers = snapshot(&[
            ("bingx", "ETH/USDT", dec!(2500)),
            ("xt", "BTC/USDT", dec!(42001)),
        ]);

        let (resolved, _) = resolve_realtime(&entries, &tickers, &order());
        assert_eq!(resolved["BTC"].exchange.as_deref(), Some("xt"));
    }

    #[test]
    fn test_unresolved_coin_does_not_abort_batch() {
        let entries = vec![
            entry(1, "BTC", &[("bingx", "BTC/USDT")]),
            entry(2, "ZZZ", &[("xt", "ZZZ/USDT")]),
        ];
        let tickers = snapshot(&[("bingx", "BTC/USDT", dec!(42000))]);

        let (resolved, unresolved) = resolve_realtime(&entries, &tickers, &order());
        assert_eq!(resolved.len(), 1);
        assert_eq!(unresolved.into_iter().collect::<Vec<_>>(), vec!["ZZZ"]);
    }

    #[test]
    fn test_absent_exchange_is_skipped() {
        let entries = vec![entry(1, "BTC", &[("bingx", "BTC/USDT")])];
        // bingx 스냅샷 자체가 없음 (조회 실패)
        let tickers = snapshot(&[("xt", "BTC/USDT", dec!(42001))]);

        let (resolved, unresolved) = resolve_realtime(&entries, &tickers, &order());
        assert!(resolved.is_empty());
        assert_eq!(unresolved.len(), 1);
    }
}
