//! 타임프레임별 OHLCV 수집 모듈.
//!
//! 코인마다 우선순위 순서로 거래소를 시도해 첫 비어 있지 않은 캔들
//! 집합을 채택하고, 해당 타임프레임 테이블과 캐시를 갱신합니다.

use crate::modules::symbol_candidates;
use crate::{CollectorConfig, IngestionStats, Result};
use chrono::Utc;
use crawler_core::{retry, OhlcvBar, RetryPolicy, Timeframe};
use crawler_data::{keys, PriceStore, RedisCache, RegistryStore};
use crawler_exchange::MarketDataSource;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 코인 하나의 캔들을 우선순위 폴백으로 가져옵니다.
///
/// 빈 캔들 집합은 실패로 간주하고 다음 거래소를 시도합니다. 모든
/// 후보가 실패하면 `None`을 반환합니다.
pub async fn fetch_coin_bars(
    source: &dyn MarketDataSource,
    candidates: &[(String, String)],
    timeframe: Timeframe,
    limit: u32,
    since_ms: Option<i64>,
    policy: &RetryPolicy,
) -> Option<(String, Vec<OhlcvBar>)> {
    for (exchange, symbol) in candidates {
        match retry(policy, || {
            source.fetch_ohlcv(exchange, symbol, timeframe, limit, since_ms, None)
        })
        .await
        {
            Ok(bars) => return Some((exchange.clone(), bars)),
            Err(e) => {
                warn!(
                    exchange = %exchange,
                    symbol = %symbol,
                    %timeframe,
                    error = %e,
                    "캔들 조회 실패"
                );
            }
        }
    }
    None
}

/// 타임프레임 하나의 OHLCV 수집을 실행합니다.
pub async fn refresh_ohlcv(
    source: &dyn MarketDataSource,
    cache: &RedisCache,
    registry: &RegistryStore,
    prices: &PriceStore,
    timeframe: Timeframe,
    config: &CollectorConfig,
) -> Result<IngestionStats> {
    let start = Instant::now();
    let mut stats = IngestionStats::new();
    let policy = config.retry.policy();

    let mut entries = registry.load_registry().await?;
    entries.truncate(config.registry.coins_limit as usize);
    stats.total = entries.len();

    // 분봉/시간봉은 최근 구간만, 일봉/주봉은 전체 이력을 요청합니다.
    let since_ms = timeframe.lookback_since_ms(Utc::now());
    info!(%timeframe, ?since_ms, coins = entries.len(), "OHLCV 수집 시작");

    let results: Vec<(String, i64, Option<Vec<OhlcvBar>>)> = stream::iter(entries.iter())
        .map(|entry| {
            let candidates = symbol_candidates(entry, &config.exchange_order);
            let policy = &policy;
            async move {
                let fetched = fetch_coin_bars(
                    source,
                    &candidates,
                    timeframe,
                    config.ohlcv.bar_limit,
                    since_ms,
                    policy,
                )
                .await;

                match fetched {
                    Some((exchange, bars)) => {
                        debug!(
                            symbol = %entry.coin.symbol,
                            exchange = %exchange,
                            bars = bars.len(),
                            "캔들 채택"
                        );
                        (entry.coin.symbol.clone(), entry.coin.cmc_id, Some(bars))
                    }
                    None => (entry.coin.symbol.clone(), entry.coin.cmc_id, None),
                }
            }
        })
        .buffer_unordered(config.ohlcv.concurrency)
        .collect()
        .await;

    let mut aggregate: BTreeMap<String, Vec<OhlcvBar>> = BTreeMap::new();
    for (symbol, cmc_id, bars) in results {
        let Some(bars) = bars else {
            stats.errors += 1;
            stats.unresolved.insert(symbol);
            continue;
        };

        // 저장 실패는 해당 코인만 에러로 집계하고 배치는 계속합니다.
        if let Err(e) = prices.replace_bars(cmc_id, timeframe, &bars).await {
            warn!(symbol = %symbol, error = %e, "캔들 저장 실패");
            stats.errors += 1;
            continue;
        }
        if let Err(e) = cache.set(&keys::timeframe(&symbol, timeframe), &bars).await {
            warn!(symbol = %symbol, error = %e, "캔들 캐시 실패");
        }

        stats.success += 1;
        stats.total_bars += bars.len();
        aggregate.insert(symbol, bars);
    }

    cache.set(timeframe.redis_key(), &aggregate).await?;
    info!(
        %timeframe,
        resolved = stats.success,
        total = stats.total,
        bars = stats.total_bars,
        "OHLCV 수집 완료"
    );

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testutil::FakeSource;
    use rust_decimal_macros::dec;

    fn bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| OhlcvBar {
                timestamp: 1_700_000_000_000 + (i as i64) * 300_000,
                open: dec!(100),
                high: dec!(110),
                low: dec!(95),
                close: dec!(105),
                volume: dec!(1),
            })
            .collect()
    }

    fn candidates(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(e, s)| (e.to_string(), s.to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_non_empty_wins() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.bars.insert(
            ("bingx".to_string(), "BTC/USDT".to_string()),
            bars(3),
        );
        source
            .bars
            .insert(("xt".to_string(), "BTC/USDT".to_string()), bars(9));

        let (exchange, found) = fetch_coin_bars(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            Timeframe::M5,
            201,
            None,
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(exchange, "bingx");
        assert_eq!(found.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_bars_fall_back_to_next_exchange() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        // bingx는 200 OK + 빈 목록을 반환
        source
            .bars
            .insert(("xt".to_string(), "BTC/USDT".to_string()), bars(5));

        let (exchange, found) = fetch_coin_bars(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            Timeframe::M5,
            201,
            None,
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(exchange, "xt");
        assert_eq!(found.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_exhausted() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.failing.insert("bingx".to_string());

        let found = fetch_coin_bars(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            Timeframe::H1,
            201,
            None,
            &RetryPolicy::default(),
        )
        .await;

        assert!(found.is_none());
    }
}
