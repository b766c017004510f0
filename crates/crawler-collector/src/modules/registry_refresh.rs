//! 코인 레지스트리 갱신 모듈.
//!
//! 애그리게이터 목록과 거래소 티커를 조정해 레지스트리 전체를
//! 교체합니다. 애그리게이터 조회 실패는 작업 전체를 중단시키지만
//! (아무것도 쓰지 않음), 거래소 하나의 실패는 해당 거래소 열만
//! 비우고 계속 진행합니다.

use crate::modules::collect_exchange_tickers;
use crate::{CollectorConfig, IngestionStats, Result};
use crawler_core::{build_registry, retry};
use crawler_data::{keys, remove_stablecoins, CmcClient, RedisCache, RegistryStore};
use crawler_exchange::MarketDataSource;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{info, warn};

/// 애그리게이터 원본 응답을 심볼 → 레코드로 인덱싱합니다.
///
/// `data` 배열이 아니거나 심볼이 없는 레코드는 무시합니다. 같은 심볼이
/// 여러 번 나오면 첫 레코드(순위 상위)가 유지됩니다.
pub fn index_cmc_by_symbol(raw: &Value) -> HashMap<String, Value> {
    let mut by_symbol = HashMap::new();
    if let Some(records) = raw.get("data").and_then(Value::as_array) {
        for record in records {
            if let Some(symbol) = record.get("symbol").and_then(Value::as_str) {
                by_symbol
                    .entry(symbol.to_string())
                    .or_insert_with(|| record.clone());
            }
        }
    }
    by_symbol
}

/// 레지스트리 갱신을 실행합니다.
pub async fn refresh_registry(
    cmc: &CmcClient,
    source: &dyn MarketDataSource,
    cache: &RedisCache,
    store: &RegistryStore,
    config: &CollectorConfig,
) -> Result<IngestionStats> {
    let start = Instant::now();
    let mut stats = IngestionStats::new();
    let policy = config.retry.policy();

    info!(limit = config.registry.listings_limit, "레지스트리 갱신 시작");

    // 1. 애그리게이터 목록. 실패하면 기존 레지스트리를 그대로 둡니다.
    let page = retry(&policy, || {
        cmc.fetch_listings(config.registry.listings_limit)
    })
    .await?;

    // 원본 응답 캐시는 최선 노력입니다.
    if let Err(e) = cache.set(keys::CMC_COINS_DATA, &page.raw).await {
        warn!(error = %e, "CMC 원본 응답 캐시 실패");
    }

    let listings = remove_stablecoins(page.listings);
    stats.total = listings.len();

    // 2. 거래소 티커 스냅샷. 실패한 거래소는 조정에서 빠집니다.
    let (tickers_by_exchange, failures) = collect_exchange_tickers(source, &policy).await;
    stats.errors = failures;

    let symbols_by_exchange: HashMap<String, HashSet<String>> = tickers_by_exchange
        .into_iter()
        .map(|(exchange, tickers)| (exchange, tickers.into_keys().collect()))
        .collect();

    // 3. 조정 및 원자적 교체.
    let entries = build_registry(&listings, &symbols_by_exchange, &config.exchange_order);
    stats.success = entries.len();
    for listing in &listings {
        if !entries.iter().any(|e| e.coin.cmc_id == listing.id) {
            stats.unresolved.insert(listing.symbol.clone());
        }
    }

    store.replace_registry(&entries).await?;

    // 4. 코인별 애그리게이터 데이터 캐시.
    let cmc_by_symbol = index_cmc_by_symbol(&page.raw);
    let pairs: Vec<(String, Value)> = entries
        .iter()
        .filter_map(|entry| {
            cmc_by_symbol
                .get(&entry.coin.symbol)
                .map(|record| (keys::cmc(&entry.coin.symbol), record.clone()))
        })
        .collect();
    if let Err(e) = cache.bulk_set(&pairs).await {
        warn!(error = %e, "코인별 CMC 데이터 캐시 실패");
    }

    // 5. 구독자에게 갱신 알림.
    if let Err(e) = cache.publish("registry", &entries.len()).await {
        warn!(error = %e, "레지스트리 갱신 알림 실패");
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
