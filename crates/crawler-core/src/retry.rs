//! 재시도 실행기 (RetryExecutor).
//!
//! 모든 외부 네트워크 호출을 감싸는 지수 백오프 재시도 래퍼입니다.
//!
//! # 동작
//!
//! - 첫 시도 전에는 대기하지 않고, k번째 시도가 실패하면
//!   `delay * backoff^(k-1)` 만큼 대기 후 다음 시도를 합니다.
//! - `timeout`이 설정되면 시도 한 번이 그 시간을 넘는 즉시
//!   `RetryError::Timeout`으로 중단하며, 타임아웃은 재시도하지 않습니다.
//! - `reject_empty`가 켜져 있으면 빈 결과(빈 Vec/Map 등)도 실패로
//!   간주합니다. 거래소가 200 OK와 빈 목록을 돌려주는 경우를 다음
//!   거래소로 폴백시키기 위한 규칙입니다.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

/// 재시도 정책.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 총 시도 횟수
    pub retries: u32,
    /// 초기 대기 시간
    pub delay: Duration,
    /// 지수 백오프 계수
    pub backoff: f64,
    /// 시도 한 번의 최대 허용 시간
    pub timeout: Option<Duration>,
    /// 빈 결과를 실패로 간주할지 여부
    pub reject_empty: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(1),
            backoff: 2.0,
            timeout: None,
            reject_empty: true,
        }
    }
}

impl RetryPolicy {
    /// k번째 시도 실패 후의 대기 시간을 계산합니다 (k는 1부터).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.powi(attempt as i32 - 1);
        Duration::from_secs_f64(self.delay.as_secs_f64() * factor)
    }
}

/// 재시도 실패.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// 시도 한 번이 허용 시간을 초과함 (즉시 중단, 재시도 없음)
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    /// 재시도 예산 소진 (마지막 오류 포함)
    #[error("All {attempts} attempts failed, last error: {last}")]
    Exhausted {
        /// 수행한 시도 횟수
        attempts: u32,
        /// 마지막 오류 메시지
        last: String,
    },
}

/// `reject_empty` 판정 대상 값.
///
/// 기본 구현은 "비어 있지 않음"이며, 컬렉션 타입에 대해서만 빈 상태를
/// 실패로 취급합니다.
pub trait RetryValue {
    /// 이 값이 빈 결과인지 확인합니다.
    fn is_empty_value(&self) -> bool {
        false
    }
}

impl<T> RetryValue for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> RetryValue for HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> RetryValue for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> RetryValue for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl RetryValue for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl RetryValue for serde_json::Value {
    fn is_empty_value(&self) -> bool {
        self.is_null()
    }
}

impl<T: RetryValue> RetryValue for std::sync::Arc<T> {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

/// 작업을 정책에 따라 재시도합니다.
///
/// 성공 값은 그대로 반환하고, 모든 시도가 실패하면 마지막 오류를 담은
/// `RetryError::Exhausted`를 반환합니다.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, RetryError>
where
    T: RetryValue,
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last = String::from("no attempts were made");

    for attempt in 1..=policy.retries.max(1) {
        let outcome = match policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => return Err(RetryError::Timeout(limit)),
            },
            None => operation().await,
        };

        match outcome {
            Ok(value) if policy.reject_empty && value.is_empty_value() => {
                last = String::from("empty result");
            }
            Ok(value) => return Ok(value),
            Err(e) => {
                last = e.to_string();
            }
        }

        if attempt < policy.retries {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(RetryError::Exhausted {
        attempts: policy.retries.max(1),
        last,
    })
}
