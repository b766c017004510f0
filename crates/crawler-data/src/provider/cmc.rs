//! CoinMarketCap 목록 제공자.
//!
//! 시가총액 순위 상위 코인 목록을 가져와 도메인 `CoinListing`으로
//! 변환합니다. 원본 응답(`raw`)은 캐시에 그대로 저장할 수 있도록 함께
//! 반환합니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use crawler_core::CoinListing;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const BASE_URL: &str = "https://pro-api.coinmarketcap.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct CmcResponse {
    status: CmcStatus,
    #[serde(default)]
    data: Vec<CmcCoin>,
}

#[derive(Debug, Deserialize)]
struct CmcStatus {
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CmcCoin {
    id: i64,
    name: String,
    symbol: String,
    #[serde(default)]
    cmc_rank: Option<i32>,
    #[serde(default)]
    max_supply: Option<Decimal>,
    #[serde(default)]
    circulating_supply: Option<Decimal>,
    #[serde(default)]
    total_supply: Option<Decimal>,
    #[serde(default)]
    infinite_supply: Option<bool>,
    #[serde(default)]
    num_market_pairs: Option<i32>,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    platform: Option<CmcPlatform>,
}

#[derive(Debug, Deserialize)]
struct CmcPlatform {
    symbol: String,
}

/// listings 호출 한 번의 결과.
#[derive(Debug, Clone)]
pub struct CmcListingsPage {
    /// 원본 JSON 응답 (캐시 저장용)
    pub raw: Value,
    /// 도메인으로 변환된 목록 (순위 오름차순)
    pub listings: Vec<CoinListing>,
}

impl crawler_core::RetryValue for CmcListingsPage {
    /// 코인이 하나도 없는 응답은 빈 결과로 취급합니다.
    fn is_empty_value(&self) -> bool {
        self.listings.is_empty()
    }
}

/// 스테이블코인 태그가 붙은 코인을 목록에서 제거합니다.
pub fn remove_stablecoins(listings: Vec<CoinListing>) -> Vec<CoinListing> {
    listings
        .into_iter()
        .filter(|coin| !coin.has_tag(crawler_core::STABLECOIN_TAG))
        .collect()
}

// ============================================================================
// 클라이언트
// ============================================================================

/// CoinMarketCap Pro API 클라이언트.
pub struct CmcClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CmcClient {
    /// 새 클라이언트 생성.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// base URL을 지정해 생성 (테스트용).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| DataError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// 시가총액 순위 상위 `limit`개 코인 목록 조회.
    pub async fn fetch_listings(&self, limit: u32) -> Result<CmcListingsPage> {
        let url = format!("{}/v1/cryptocurrency/listings/latest", self.base_url);
        debug!(%url, limit, "Fetching CMC listings");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", "1".to_string()),
                ("limit", limit.to_string()),
                ("convert", "USD".to_string()),
            ])
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "CMC HTTP {}",
                response.status()
            )));
        }

        let raw: Value = response.json().await?;
        let parsed: CmcResponse = serde_json::from_value(raw.clone())?;

        if parsed.status.error_code != 0 {
            return Err(DataError::FetchError(format!(
                "CMC error {}: {}",
                parsed.status.error_code,
                parsed.status.error_message.unwrap_or_default()
            )));
        }

        let listings: Vec<CoinListing> = parsed
            .data
            .into_iter()
            .map(|coin| CoinListing {
                id: coin.id,
                symbol: coin.symbol,
                name: coin.name,
                cmc_rank: coin.cmc_rank.unwrap_or(0),
                max_supply: coin.max_supply,
                circulating_supply: coin.circulating_supply,
                total_supply: coin.total_supply,
                infinite_supply: coin.infinite_supply.unwrap_or(false),
                num_market_pairs: coin.num_market_pairs.unwrap_or(0),
                last_updated: coin.last_updated,
                tags: coin.tags,
                platform_symbol: coin.platform.map(|p| p.symbol),
            })
            .collect();

        info!(count = listings.len(), "Fetched CMC listings");
        Ok(CmcListingsPage { raw, listings })
    }
}
