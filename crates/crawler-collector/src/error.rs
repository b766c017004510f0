//! 에러 타입 정의.

use std::fmt;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터베이스 에러
    Database(sqlx::Error),
    /// 데이터 계층 에러 (CMC, Redis, Postgres)
    Data(crawler_data::DataError),
    /// 거래소 게이트웨이 에러
    Gateway(crawler_exchange::GatewayError),
    /// 재시도 예산 소진/타임아웃
    Retry(crawler_core::RetryError),
    /// 잘못된 타임프레임 인자
    Timeframe(crawler_core::TimeframeError),
    /// 설정 에러
    Config(String),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Gateway(e) => write!(f, "Gateway error: {}", e),
            Self::Retry(e) => write!(f, "Retry error: {}", e),
            Self::Timeframe(e) => write!(f, "Timeframe error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<crawler_data::DataError> for CollectorError {
    fn from(err: crawler_data::DataError) -> Self {
        Self::Data(err)
    }
}

impl From<crawler_exchange::GatewayError> for CollectorError {
    fn from(err: crawler_exchange::GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl From<crawler_core::RetryError> for CollectorError {
    fn from(err: crawler_core::RetryError) -> Self {
        Self::Retry(err)
    }
}

impl From<crawler_core::TimeframeError> for CollectorError {
    fn from(err: crawler_core::TimeframeError) -> Self {
        Self::Timeframe(err)
    }
}

impl From<std::env::VarError> for CollectorError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
