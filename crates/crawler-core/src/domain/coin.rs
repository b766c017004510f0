//! 코인, 거래소 심볼 매핑, 시장 데이터 엔티티.
//!
//! 코인의 식별자는 애그리게이터(CoinMarketCap)가 부여한 숫자 id(`cmc_id`)이며
//! 레지스트리 갱신 시 전체 집합이 원자적으로 교체됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 레지스트리의 코인 한 개.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// 애그리게이터 부여 숫자 id (불변, PK)
    pub cmc_id: i64,
    /// 짧은 심볼 (예: "BTC")
    pub symbol: String,
    /// 표시 이름 (예: "Bitcoin")
    pub name: String,
    /// 다른 코인의 호스트 체인 플랫폼 심볼로 등장하면 true
    pub is_main: bool,
}

/// (코인, 거래소) → 거래 심볼 매핑.
///
/// (cmc_id, exchange) 쌍당 최대 하나, 거래소 내에서 거래 심볼당 최대
/// 하나의 코인만 매핑됩니다 (조정 단계의 중복 제거로 보장).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSymbolMapping {
    /// 코인 id
    pub cmc_id: i64,
    /// 거래소 키 (소문자, 예: "bingx")
    pub exchange: String,
    /// 해당 거래소의 거래 심볼 (예: "BTC/USDT")
    pub symbol: String,
    /// 활성 여부
    pub is_active: bool,
}

/// 코인과 1:1인 애그리게이터 시장 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarketData {
    /// 코인 id
    pub cmc_id: i64,
    /// 시가총액 순위
    pub cmc_rank: i32,
    /// 최대 공급량
    pub max_supply: Option<Decimal>,
    /// 유통 공급량
    pub circulating_supply: Option<Decimal>,
    /// 총 공급량
    pub total_supply: Option<Decimal>,
    /// 무한 공급 여부
    pub infinite_supply: bool,
    /// 거래 쌍 수
    pub num_market_pairs: i32,
    /// 애그리게이터 기준 최종 갱신 시각
    pub last_updated: DateTime<Utc>,
    /// 태그 목록 (예: "mineable", "stablecoin")
    pub tags: Vec<String>,
}

/// 애그리게이터 코인 목록의 레코드 한 개.
///
/// `CmcClient`가 listings 응답을 이 형태로 변환하며, 심볼 조정의 입력이
/// 됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinListing {
    /// 애그리게이터 부여 숫자 id
    pub id: i64,
    /// 짧은 심볼
    pub symbol: String,
    /// 표시 이름
    pub name: String,
    /// 시가총액 순위
    pub cmc_rank: i32,
    /// 최대 공급량
    pub max_supply: Option<Decimal>,
    /// 유통 공급량
    pub circulating_supply: Option<Decimal>,
    /// 총 공급량
    pub total_supply: Option<Decimal>,
    /// 무한 공급 여부
    pub infinite_supply: bool,
    /// 거래 쌍 수
    pub num_market_pairs: i32,
    /// 최종 갱신 시각
    pub last_updated: DateTime<Utc>,
    /// 태그 목록
    pub tags: Vec<String>,
    /// 호스트 체인 플랫폼 심볼 (토큰인 경우)
    pub platform_symbol: Option<String>,
}

impl CoinListing {
    /// 정확히 일치하는 태그가 있는지 확인합니다.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// 이 레코드의 시장 데이터 엔티티를 생성합니다.
    pub fn market_data(&self) -> CoinMarketData {
        CoinMarketData {
            cmc_id: self.id,
            cmc_rank: self.cmc_rank,
            max_supply: self.max_supply,
            circulating_supply: self.circulating_supply,
            total_supply: self.total_supply,
            infinite_supply: self.infinite_supply,
            num_market_pairs: self.num_market_pairs,
            last_updated: self.last_updated,
            tags: self.tags.clone(),
        }
    }
}

/// 레지스트리 한 줄: 코인 + 시장 데이터 + 거래소별 심볼 매핑.
///
/// `mappings`는 거래소 키 → 거래 심볼이며, 매핑이 없는 거래소는
/// 키 자체가 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// 코인
    pub coin: Coin,
    /// 애그리게이터 시장 데이터
    pub market: CoinMarketData,
    /// 거래소 키 → 거래 심볼
    pub mappings: BTreeMap<String, String>,
}

impl RegistryEntry {
    /// 매핑을 `ExchangeSymbolMapping` 엔티티 목록으로 펼칩니다.
    pub fn symbol_mappings(&self) -> Vec<ExchangeSymbolMapping> {
        self.mappings
            .iter()
            .map(|(exchange, symbol)| ExchangeSymbolMapping {
                cmc_id: self.coin.cmc_id,
                exchange: exchange.clone(),
                symbol: symbol.clone(),
                is_active: true,
            })
            .collect()
    }
}
