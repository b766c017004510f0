//! 게이트웨이 에러 타입.

use thiserror::Error;

/// 거래소 호출 관련 에러.
///
/// 단일 거래소 호출 실패는 해당 (거래소, 코인)으로 범위가 한정되며,
/// 이 계층에서 조용히 삼켜지지 않습니다. 배치 중단 여부는 호출자
/// (오케스트레이터)가 결정합니다.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 거래소 API가 오류 응답을 반환함
    #[error("Exchange {exchange} API error: {message}")]
    Api {
        /// 거래소 키
        exchange: String,
        /// 업스트림 오류 메시지
        message: String,
    },

    /// 응답 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 설정에 없는 거래소 키
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    /// 해당 거래소가 지원하지 않는 타임프레임
    #[error("Exchange {exchange} does not support timeframe {timeframe}")]
    UnsupportedTimeframe {
        /// 거래소 키
        exchange: String,
        /// 타임프레임 라벨
        timeframe: String,
    },
}

impl GatewayError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Network(_) | GatewayError::Timeout(_) | GatewayError::Api { .. }
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_decode() {
            GatewayError::Parse(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Parse(err.to_string())
    }
}

/// 게이트웨이 작업을 위한 Result 타입.
pub type GatewayResult<T> = Result<T, GatewayError>;
