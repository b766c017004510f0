//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use crawler_core::RetryPolicy;
use crawler_exchange::{ExchangeCredentials, EXCHANGES};
use std::collections::HashMap;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// Redis URL
    pub redis_url: String,
    /// CoinMarketCap API 키
    pub cmc_api_key: String,
    /// 거래소 우선순위 (폴백 순서)
    pub exchange_order: Vec<String>,
    /// 거래소별 API 자격증명
    pub credentials: HashMap<String, ExchangeCredentials>,
    /// 레지스트리 갱신 설정
    pub registry: RegistryConfig,
    /// 호가창 수집 설정
    pub orderbook: OrderbookConfig,
    /// OHLCV 수집 설정
    pub ohlcv: OhlcvConfig,
    /// 재시도 설정
    pub retry: RetryConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 레지스트리 갱신 설정
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// 한 사이클에 수집하는 상위 코인 수
    pub coins_limit: u32,
    /// 애그리게이터 목록 요청 크기 (조정 후보 풀)
    pub listings_limit: u32,
}

/// 호가창 수집 설정
#[derive(Debug, Clone)]
pub struct OrderbookConfig {
    /// 요청할 호가 단계 수
    pub depth: u32,
    /// (코인, 거래소) 실패 후 다음 시도까지 대기 (밀리초)
    pub cooldown_ms: u64,
    /// 코인 간 딜레이 (밀리초)
    pub coin_delay_ms: u64,
    /// 동시 수집 코인 수
    pub concurrency: usize,
}

/// OHLCV 수집 설정
#[derive(Debug, Clone)]
pub struct OhlcvConfig {
    /// 코인당 요청 캔들 수
    pub bar_limit: u32,
    /// 동시 수집 코인 수
    pub concurrency: usize,
}

/// 재시도 설정
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 총 시도 횟수
    pub retries: u32,
    /// 초기 대기 시간 (밀리초)
    pub delay_ms: u64,
    /// 지수 백오프 계수
    pub backoff: f64,
    /// 시도 한 번의 최대 허용 시간 (밀리초, 0이면 제한 없음)
    pub timeout_ms: u64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 실시간 시세 수집 주기 (초)
    pub realtime_secs: u64,
    /// 5분봉/15분봉 수집 주기 (분)
    pub intraday_minutes: u64,
    /// 1시간봉/4시간봉/일봉/주봉 수집 주기 (분)
    pub hourly_minutes: u64,
    /// 레지스트리 갱신 주기 (시간)
    pub registry_hours: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;
        let redis_url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379/0".to_string());
        let cmc_api_key = std::env::var("CMC_API_KEY").unwrap_or_default();

        let exchange_order = parse_exchange_order(
            &std::env::var("EXCHANGE_PRIORITY").unwrap_or_default(),
        );

        let mut credentials = HashMap::new();
        for exchange in &exchange_order {
            let prefix = exchange.to_uppercase();
            let api_key = std::env::var(format!("{prefix}_API_KEY")).unwrap_or_default();
            let api_secret = std::env::var(format!("{prefix}_API_SECRET")).unwrap_or_default();
            credentials.insert(
                exchange.clone(),
                ExchangeCredentials::new(api_key, api_secret),
            );
        }

        Ok(Self {
            database_url,
            redis_url,
            cmc_api_key,
            exchange_order,
            credentials,
            registry: RegistryConfig {
                coins_limit: env_var_parse("COINS_LIMIT", 500),
                listings_limit: env_var_parse("CMC_LISTINGS_LIMIT", 1000),
            },
            orderbook: OrderbookConfig {
                depth: env_var_parse("ORDERBOOK_DEPTH", 500),
                cooldown_ms: env_var_parse("ORDERBOOK_COOLDOWN_MS", 5000),
                coin_delay_ms: env_var_parse("ORDERBOOK_COIN_DELAY_MS", 100),
                concurrency: env_var_parse("ORDERBOOK_CONCURRENCY", 4),
            },
            ohlcv: OhlcvConfig {
                bar_limit: env_var_parse("OHLCV_BAR_LIMIT", 201),
                concurrency: env_var_parse("OHLCV_CONCURRENCY", 4),
            },
            retry: RetryConfig {
                retries: env_var_parse("RETRY_COUNT", 3),
                delay_ms: env_var_parse("RETRY_DELAY_MS", 1000),
                backoff: env_var_parse("RETRY_BACKOFF", 2.0),
                timeout_ms: env_var_parse("RETRY_TIMEOUT_MS", 0),
            },
            daemon: DaemonConfig {
                realtime_secs: env_var_parse("DAEMON_REALTIME_SECS", 60),
                intraday_minutes: env_var_parse("DAEMON_INTRADAY_MINUTES", 7),
                hourly_minutes: env_var_parse("DAEMON_HOURLY_MINUTES", 60),
                registry_hours: env_var_parse("DAEMON_REGISTRY_HOURS", 12),
            },
        })
    }
}

impl RetryConfig {
    /// 재시도 정책으로 변환
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            reject_empty: true,
        }
    }
}

impl OrderbookConfig {
    /// 실패 후 대기 시간을 Duration으로 반환
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// 코인 간 딜레이를 Duration으로 반환
    pub fn coin_delay(&self) -> Duration {
        Duration::from_millis(self.coin_delay_ms)
    }
}

impl DaemonConfig {
    /// 실시간 수집 주기
    pub fn realtime_interval(&self) -> Duration {
        Duration::from_secs(self.realtime_secs)
    }

    /// 분봉 수집 주기
    pub fn intraday_interval(&self) -> Duration {
        Duration::from_secs(self.intraday_minutes * 60)
    }

    /// 시간봉 이상 수집 주기
    pub fn hourly_interval(&self) -> Duration {
        Duration::from_secs(self.hourly_minutes * 60)
    }

    /// 레지스트리 갱신 주기
    pub fn registry_interval(&self) -> Duration {
        Duration::from_secs(self.registry_hours * 3600)
    }
}

/// 쉼표 구분 거래소 목록 파싱. 비어 있으면 기본 우선순위를 사용합니다.
fn parse_exchange_order(raw: &str) -> Vec<String> {
    let parsed: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if parsed.is_empty() {
        EXCHANGES.iter().map(|s| s.to_string()).collect()
    } else {
        parsed
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exchange_order_defaults() {
        assert_eq!(parse_exchange_order(""), EXCHANGES.map(String::from));
        assert_eq!(
            parse_exchange_order("coinex, BINGX"),
            vec!["coinex".to_string(), "bingx".to_string()]
        );
    }

    #[test]
    fn test_retry_config_policy() {
        let config = RetryConfig {
            retries: 5,
            delay_ms: 500,
            backoff: 3.0,
            timeout_ms: 0,
        };
        let policy = config.policy();
        assert_eq!(policy.retries, 5);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert!(policy.timeout.is_none());
        assert!(policy.reject_empty);

        let with_timeout = RetryConfig {
            timeout_ms: 2000,
            ..config
        };
        assert_eq!(
            with_timeout.policy().timeout,
            Some(Duration::from_secs(2))
        );
    }
}
