//! 심볼 조정(reconciliation) 로직.
//!
//! 애그리게이터 코인 목록과 거래소별 티커 심볼 집합을 교차 검증하여
//! 표준 코인 레지스트리를 만듭니다. 이 모듈은 I/O가 없는 순수 함수로,
//! 입력 순서(애그리게이터 순위 순서)를 그대로 유지합니다.

use crate::domain::coin::{Coin, CoinListing, RegistryEntry};
use std::collections::{BTreeMap, HashMap, HashSet};

/// 스테이블코인 제외 태그 (정확히 일치).
pub const STABLECOIN_TAG: &str = "stablecoin";

/// 레지스트리를 빌드합니다.
///
/// # 인자
/// - `listings` — 애그리게이터 코인 목록 (순위 순서)
/// - `tickers_by_exchange` — 거래소 키 → 해당 거래소의 전체 거래 심볼 집합.
///   티커 조회에 실패한 거래소는 맵에서 빠져 있어야 하며, 그 거래소의
///   매핑 열 전체가 이번 사이클에서 생략됩니다.
/// - `exchange_order` — 설정된 거래소 우선순위 (호출 간 고정)
///
/// # 알고리즘
/// 1. `stablecoin` 태그가 달린 코인 제외
/// 2. 플랫폼 심볼 집합을 계산하고, 자기 심볼이 그 집합에 있으면 `is_main`
/// 3. 코인별로 `SYMBOL/USDT`, `UPPER(NAME)/USDT` 후보 쌍 생성 — 심볼 쌍이
///    먼저 평가되어 둘 다 있으면 심볼 쌍이 선택됨
/// 4. 거래소 열별로 같은 거래 쌍이 여러 코인에 배정되면 처음 것만 유지
/// 5. 어느 거래소에도 매핑이 없는 코인은 제외
pub fn build_registry(
    listings: &[CoinListing],
    tickers_by_exchange: &HashMap<String, HashSet<String>>,
    exchange_order: &[String],
) -> Vec<RegistryEntry> {
    // 1. 스테이블코인 제외
    let filtered: Vec<&CoinListing> = listings
        .iter()
        .filter(|listing| !listing.has_tag(STABLECOIN_TAG))
        .collect();

    // 2. 플랫폼(호스트 체인) 심볼 집합
    let platforms: HashSet<&str> = filtered
        .iter()
        .filter_map(|listing| listing.platform_symbol.as_deref())
        .collect();

    // 3. 코인별 후보 쌍 매칭
    let mut entries: Vec<RegistryEntry> = filtered
        .iter()
        .map(|listing| {
            let symbol_pair = format!("{}/USDT", listing.symbol);
            let name_pair = format!("{}/USDT", listing.name.to_uppercase());

            let mut mappings = BTreeMap::new();
            for exchange in exchange_order {
                // 티커 조회에 실패한 거래소는 열 전체 생략
                let Some(tickers) = tickers_by_exchange.get(exchange) else {
                    continue;
                };
                if tickers.contains(&symbol_pair) {
                    mappings.insert(exchange.clone(), symbol_pair.clone());
                } else if tickers.contains(&name_pair) {
                    mappings.insert(exchange.clone(), name_pair.clone());
                }
            }

            RegistryEntry {
                coin: Coin {
                    cmc_id: listing.id,
                    symbol: listing.symbol.clone(),
                    name: listing.name.clone(),
                    is_main: platforms.contains(listing.symbol.as_str()),
                },
                market: listing.market_data(),
                mappings,
            }
        })
        .collect();

    // 4. 거래소 열별 중복 제거 (first-seen-wins, 입력 순서 기준)
    for exchange in exchange_order {
        let mut seen: HashSet<String> = HashSet::new();
        for entry in entries.iter_mut() {
            if let Some(symbol) = entry.mappings.get(exchange) {
                if !seen.insert(symbol.clone()) {
                    entry.mappings.remove(exchange);
                }
            }
        }
    }

    // 5. 매핑이 전혀 없는 코인 제외
    entries.retain(|entry| !entry.mappings.is_empty());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn listing(id: i64, symbol: &str, name: &str) -> CoinListing {
        CoinListing {
            id,
            symbol: symbol.to_string(),
            name: name.to_string(),
            cmc_rank: id as i32,
            max_supply: None,
            circulating_supply: None,
            total_supply: None,
            infinite_supply: false,
            num_market_pairs: 10,
            last_updated: Utc::now(),
            tags: vec![],
            platform_symbol: None,
        }
    }

    fn exchanges(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn tickers(data: &[(&str, &[&str])]) -> HashMap<String, HashSet<String>> {
        data.iter()
            .map(|(exchange, symbols)| {
                (
                    exchange.to_string(),
                    symbols.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_stablecoins_are_dropped() {
        let mut tether = listing(825, "USDT", "Tether");
        tether.tags = vec!["stablecoin".to_string()];
        let listings = vec![listing(1, "BTC", "Bitcoin"), tether];
        let tickers = tickers(&[("bingx", &["BTC/USDT", "USDT/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["bingx"]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].coin.symbol, "BTC");
    }

    #[test]
    fn test_symbol_pair_takes_priority_over_name_pair() {
        // 거래소에 BTC/USDT만 있고 BITCOIN/USDT는 없는 경우
        let listings = vec![listing(1, "BTC", "Bitcoin")];
        let tickers = tickers(&[("bingx", &["BTC/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["bingx"]));
        assert_eq!(registry[0].mappings["bingx"], "BTC/USDT");

        // 둘 다 있는 경우에도 심볼 쌍이 선택됨
        let both = self::tickers(&[("bingx", &["BTC/USDT", "BITCOIN/USDT"])]);
        let registry = build_registry(&listings, &both, &exchanges(&["bingx"]));
        assert_eq!(registry[0].mappings["bingx"], "BTC/USDT");
    }

    #[test]
    fn test_name_pair_fallback() {
        let listings = vec![listing(1, "BTC", "Bitcoin")];
        let tickers = tickers(&[("xt", &["BITCOIN/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["xt"]));
        assert_eq!(registry[0].mappings["xt"], "BITCOIN/USDT");
    }

    #[test]
    fn test_unmapped_coins_are_dropped() {
        let listings = vec![listing(1, "BTC", "Bitcoin"), listing(2, "XYZ", "Nowhere")];
        let tickers = tickers(&[("bingx", &["BTC/USDT"]), ("xt", &["BTC/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["bingx", "xt"]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].coin.cmc_id, 1);
    }

    #[test]
    fn test_failed_exchange_column_is_absent() {
        let listings = vec![listing(1, "BTC", "Bitcoin")];
        // lbank 티커 조회 실패 → 맵에 없음
        let tickers = tickers(&[("bingx", &["BTC/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["bingx", "lbank"]));
        assert!(registry[0].mappings.contains_key("bingx"));
        assert!(!registry[0].mappings.contains_key("lbank"));
    }

    #[test]
    fn test_duplicate_pair_keeps_first_coin() {
        // 두 코인의 이름 쌍이 같은 거래 쌍으로 해석되는 충돌 케이스
        let first = listing(1, "BTC", "Bitcoin");
        let mut shadow = listing(2, "XBT", "Bitcoin");
        shadow.name = "Bitcoin".to_string();
        let listings = vec![first, shadow];
        let tickers = tickers(&[("coinex", &["BITCOIN/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["coinex"]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].coin.cmc_id, 1);
    }

    #[test]
    fn test_is_main_from_platform_symbols() {
        let mut token = listing(2, "USDX", "SomeToken");
        token.platform_symbol = Some("ETH".to_string());
        let listings = vec![listing(1, "ETH", "Ethereum"), token];
        let tickers = tickers(&[("bingx", &["ETH/USDT", "USDX/USDT"])]);

        let registry = build_registry(&listings, &tickers, &exchanges(&["bingx"]));
        assert!(registry[0].coin.is_main);
        assert!(!registry[1].coin.is_main);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let listings = vec![listing(1, "BTC", "Bitcoin"), listing(2, "ETH", "Ethereum")];
        let tickers = tickers(&[
            ("bingx", &["BTC/USDT", "ETH/USDT"]),
            ("xt", &["ETH/USDT"]),
        ]);
        let order = exchanges(&["bingx", "xt"]);

        let first = build_registry(&listings, &tickers, &order);
        let second = build_registry(&listings, &tickers, &order);
        assert_eq!(first, second);
    }

    proptest! {
        /// 중복 제거 후 (거래소, 거래 쌍) → 코인은 단사여야 한다.
        #[test]
        fn prop_dedup_guarantees_injectivity(
            symbols in proptest::collection::vec("[A-Z]{2,4}", 1..30),
            pool in proptest::collection::hash_set("[A-Z]{2,4}/USDT", 0..40),
        ) {
            let listings: Vec<CoinListing> = symbols
                .iter()
                .enumerate()
                .map(|(i, s)| listing(i as i64 + 1, s, s))
                .collect();
            let tickers: HashMap<String, HashSet<String>> =
                [("bingx".to_string(), pool)].into_iter().collect();

            let registry = build_registry(&listings, &tickers, &exchanges(&["bingx"]));

            let mut seen = HashSet::new();
            for entry in &registry {
                if let Some(symbol) = entry.mappings.get("bingx") {
                    prop_assert!(seen.insert(symbol.clone()), "duplicate mapping: {}", symbol);
                }
            }
        }
    }
}
