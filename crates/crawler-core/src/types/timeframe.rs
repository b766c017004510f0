//! 캔들 데이터 수집을 위한 타임프레임 정의.
//!
//! 타임프레임마다 세 가지 매핑을 가집니다:
//! - 라벨 (`5m`, `1h` 등) — 거래소 API 및 CLI 파라미터에 사용
//! - Redis 집계 키 (`FiveMinuteData` 등) — 타임프레임 전체 스냅샷 저장 키
//! - 테이블 이름 (`five_minute_price` 등) — 타임프레임별 가격 테이블

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 타임프레임 관련 오류.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeframeError {
    /// 지원되지 않는 타임프레임 문자열
    #[error("Invalid timeframe: {0} (supported: 5m, 15m, 1h, 4h, 1d, 1w)")]
    Invalid(String),
}

/// 수집 대상 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 1시간봉
    H1,
    /// 4시간봉
    H4,
    /// 일봉
    D1,
    /// 주봉
    W1,
}

impl Timeframe {
    /// 지원되는 모든 타임프레임.
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M5 => Duration::from_secs(5 * 60),
            Timeframe::M15 => Duration::from_secs(15 * 60),
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::H4 => Duration::from_secs(4 * 60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
            Timeframe::W1 => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// 거래소 API 및 캐시 키에 사용하는 라벨을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    /// 타임프레임 전체 스냅샷을 저장하는 Redis 집계 키를 반환합니다.
    pub fn redis_key(&self) -> &'static str {
        match self {
            Timeframe::M5 => "FiveMinuteData",
            Timeframe::M15 => "FifteenMinutesData",
            Timeframe::H1 => "OneHourData",
            Timeframe::H4 => "FourHourData",
            Timeframe::D1 => "DailyData",
            Timeframe::W1 => "WeeklyData",
        }
    }

    /// 이 타임프레임의 가격 테이블 이름을 반환합니다.
    pub fn table(&self) -> &'static str {
        match self {
            Timeframe::M5 => "five_minute_price",
            Timeframe::M15 => "fifteen_minute_price",
            Timeframe::H1 => "one_hour_price",
            Timeframe::H4 => "four_hour_price",
            Timeframe::D1 => "daily_price",
            Timeframe::W1 => "weekly_price",
        }
    }

    /// 장중(intraday) 타임프레임인지 확인합니다.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Timeframe::M5 | Timeframe::M15 | Timeframe::H1 | Timeframe::H4
        )
    }

    /// OHLCV 수집 시작 시각(에포크 밀리초)을 계산합니다.
    ///
    /// 장중 타임프레임은 최근 1000봉 분량의 윈도우를 사용하고,
    /// 일봉/주봉은 거래소 기본 범위를 쓰도록 `None`을 반환합니다.
    pub fn lookback_since_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_intraday() {
            return None;
        }
        let window_secs = 1000 * self.as_secs() as i64;
        Some((now.timestamp() - window_secs) * 1000)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            other => Err(TimeframeError::Invalid(other.to_string())),
        }
    }
}
