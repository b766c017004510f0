//! 호가창 스냅샷 수집 모듈.
//!
//! 코인마다 우선순위 순서로 거래소를 시도해 첫 성공 호가창을
//! 채택합니다. (코인, 거래소) 실패는 로그를 남기고 쿨다운 후 다음
//! 거래소로 넘어갑니다.

use crate::modules::symbol_candidates;
use crate::{CollectorConfig, IngestionStats, Result};
use crawler_core::{retry, OrderBook, RetryPolicy};
use crawler_data::{keys, RedisCache, RegistryStore};
use crawler_exchange::MarketDataSource;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 코인 하나의 호가창을 우선순위 폴백으로 가져옵니다.
///
/// depth 파라미터를 거부하는 거래소에는 생략해서 전달합니다. 모든
/// 후보가 실패하면 `None`을 반환합니다.
pub async fn fetch_coin_order_book(
    source: &dyn MarketDataSource,
    candidates: &[(String, String)],
    depth: u32,
    policy: &RetryPolicy,
    cooldown: Duration,
) -> Option<OrderBook> {
    for (idx, (exchange, symbol)) in candidates.iter().enumerate() {
        let depth_param = source.supports_depth_limit(exchange).then_some(depth);

        match retry(policy, || {
            source.fetch_order_book(exchange, symbol, depth_param)
        })
        .await
        {
            Ok(book) => return Some(book),
            Err(e) => {
                warn!(exchange = %exchange, symbol = %symbol, error = %e, "호가창 조회 실패");
                // 마지막 후보가 아니면 쿨다운 후 다음 거래소 시도
                if idx + 1 < candidates.len() {
                    tokio::time::sleep(cooldown).await;
                }
            }
        }
    }
    None
}

/// 호가창 수집을 실행합니다.
pub async fn collect_orderbook(
    source: &dyn MarketDataSource,
    cache: &RedisCache,
    store: &RegistryStore,
    config: &CollectorConfig,
) -> Result<IngestionStats> {
    let start = Instant::now();
    let mut stats = IngestionStats::new();
    let policy = config.retry.policy();

    let mut entries = store.load_registry().await?;
    entries.truncate(config.registry.coins_limit as usize);
    stats.total = entries.len();

    let cooldown = config.orderbook.cooldown();
    let coin_delay = config.orderbook.coin_delay();

    let results: Vec<(String, Option<OrderBook>)> = stream::iter(entries.iter())
        .map(|entry| {
            let candidates = symbol_candidates(entry, &config.exchange_order);
            let policy = &policy;
            async move {
                let book = fetch_coin_order_book(
                    source,
                    &candidates,
                    config.orderbook.depth,
                    policy,
                    cooldown,
                )
                .await;
                tokio::time::sleep(coin_delay).await;
                (entry.coin.symbol.clone(), book)
            }
        })
        .buffer_unordered(config.orderbook.concurrency)
        .collect()
        .await;

    let mut books = BTreeMap::new();
    for (symbol, book) in results {
        match book {
            Some(book) => {
                debug!(symbol = %symbol, exchange = %book.exchange, "호가창 채택");
                books.insert(symbol, book);
            }
            None => {
                stats.errors += 1;
                stats.unresolved.insert(symbol);
            }
        }
    }
    stats.success = books.len();

    cache.set(keys::ORDER_BOOK_DATA, &books).await?;
    info!(resolved = books.len(), total = stats.total, "호가창 스냅샷 갱신");

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testutil::FakeSource;
    use crawler_core::OrderBookLevel;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn book(exchange: &str, symbol: &str) -> OrderBook {
        OrderBook {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            bids: vec![OrderBookLevel {
                price: dec!(42000),
                quantity: dec!(1),
            }],
            asks: vec![OrderBookLevel {
                price: dec!(42001),
                quantity: dec!(2),
            }],
            timestamp: None,
        }
    }

    fn candidates(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(e, s)| (e.to_string(), s.to_string()))
            .collect()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_wins() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.order_books.insert(
            ("bingx".to_string(), "BTC/USDT".to_string()),
            book("bingx", "BTC/USDT"),
        );

        let found = fetch_coin_order_book(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            500,
            &policy(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(found.exchange, "bingx");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_next_exchange() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.failing.insert("bingx".to_string());
        source.order_books.insert(
            ("xt".to_string(), "BTC/USDT".to_string()),
            book("xt", "BTC/USDT"),
        );

        let found = fetch_coin_order_book(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            500,
            &policy(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(found.exchange, "xt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_omitted_for_unsupporting_exchange() {
        let mut source = FakeSource::new(&["coinex"]);
        source.no_depth.insert("coinex".to_string());
        source.order_books.insert(
            ("coinex".to_string(), "BTC/USDT".to_string()),
            book("coinex", "BTC/USDT"),
        );

        // depth를 그대로 전달하면 가짜 게이트웨이가 거부합니다.
        let found = fetch_coin_order_book(
            &source,
            &candidates(&[("coinex", "BTC/USDT")]),
            500,
            &policy(),
            Duration::from_secs(5),
        )
        .await;

        assert!(found.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_failed() {
        let mut source = FakeSource::new(&["bingx", "xt"]);
        source.failing.insert("bingx".to_string());
        source.failing.insert("xt".to_string());

        let found = fetch_coin_order_book(
            &source,
            &candidates(&[("bingx", "BTC/USDT"), ("xt", "BTC/USDT")]),
            500,
            &policy(),
            Duration::from_secs(5),
        )
        .await;

        assert!(found.is_none());
    }
}
