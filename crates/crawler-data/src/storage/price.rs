//! 타임프레임별 가격 테이블 저장소.
//!
//! 캔들은 타임프레임마다 별도 테이블(`five_minute_price` 등)에 저장되며
//! 스키마는 동일합니다 (cmc_id, timestamp, open, high, low, close,
//! volume). 코인 하나의 갱신은 해당 코인 행을 지우고 새 캔들을 넣는
//! 트랜잭션입니다.

use crate::error::Result;
use crawler_core::{OhlcvBar, Timeframe};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::{FromRow, QueryBuilder};
use tracing::{debug, instrument};

/// 캔들 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct BarRecord {
    pub cmc_id: i64,
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl BarRecord {
    /// 도메인 캔들로 변환.
    pub fn to_bar(&self) -> OhlcvBar {
        OhlcvBar {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// 코인 하나의 종가 통계.
#[derive(Debug, Clone, FromRow)]
pub struct CloseStats {
    pub cmc_id: i64,
    pub max_close: Decimal,
    pub min_close: Decimal,
    pub avg_close: Decimal,
}

/// 가격 저장소.
#[derive(Clone)]
pub struct PriceStore {
    pool: PgPool,
}

impl PriceStore {
    /// 새 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 코인 하나의 캔들을 교체합니다.
    ///
    /// 같은 타임스탬프 캔들이 경합하면 먼저 들어간 쪽이 유지됩니다.
    #[instrument(skip(self, bars), fields(count = bars.len()))]
    pub async fn replace_bars(
        &self,
        cmc_id: i64,
        timeframe: Timeframe,
        bars: &[OhlcvBar],
    ) -> Result<()> {
        let table = timeframe.table();
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {table} WHERE cmc_id = $1"))
            .bind(cmc_id)
            .execute(&mut *tx)
            .await?;

        if !bars.is_empty() {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {table} (cmc_id, timestamp, open, high, low, close, volume) "
            ));
            builder.push_values(bars, |mut row, bar| {
                row.push_bind(cmc_id)
                    .push_bind(bar.timestamp)
                    .push_bind(bar.open)
                    .push_bind(bar.high)
                    .push_bind(bar.low)
                    .push_bind(bar.close)
                    .push_bind(bar.volume);
            });
            builder.push(" ON CONFLICT (cmc_id, timestamp) DO NOTHING");
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(cmc_id, %timeframe, count = bars.len(), "Bars replaced");
        Ok(())
    }

    /// 코인 하나의 캔들을 시간 오름차순으로 조회합니다.
    ///
    /// `since_ms`/`until_ms`는 밀리초 타임스탬프 경계이며 둘 다 포함
    /// 범위입니다.
    pub async fn fetch_bars(
        &self,
        cmc_id: i64,
        timeframe: Timeframe,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
    ) -> Result<Vec<OhlcvBar>> {
        let table = timeframe.table();
        let records: Vec<BarRecord> = sqlx::query_as(&format!(
            r#"
            SELECT cmc_id, timestamp, open, high, low, close, volume
            FROM {table}
            WHERE cmc_id = $1
              AND ($2::BIGINT IS NULL OR timestamp >= $2)
              AND ($3::BIGINT IS NULL OR timestamp <= $3)
            ORDER BY timestamp ASC
            "#
        ))
        .bind(cmc_id)
        .bind(since_ms)
        .bind(until_ms)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(BarRecord::to_bar).collect())
    }

    /// 코인별 종가 통계 (max/min/avg)를 계산합니다.
    pub async fn close_stats(&self, timeframe: Timeframe) -> Result<Vec<CloseStats>> {
        let table = timeframe.table();
        let stats: Vec<CloseStats> = sqlx::query_as(&format!(
            r#"
            SELECT cmc_id,
                   MAX(close) AS max_close,
                   MIN(close) AS min_close,
                   AVG(close) AS avg_close
            FROM {table}
            GROUP BY cmc_id
            ORDER BY cmc_id
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(timestamp: i64, close: Decimal) -> OhlcvBar {
        OhlcvBar {
            timestamp,
            open: dec!(100),
            high: dec!(110),
            low: dec!(95),
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn test_record_to_bar() {
        let record = BarRecord {
            cmc_id: 1,
            timestamp: 1_700_000_000_000,
            open: dec!(100),
            high: dec!(110),
            low: dec!(95),
            close: dec!(105),
            volume: dec!(12.5),
        };
        let bar = record.to_bar();
        assert_eq!(bar.timestamp, 1_700_000_000_000);
        assert_eq!(bar.close, dec!(105));
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요: DATABASE_URL 설정 후 --ignored로 실행
    async fn test_replace_bars_swaps_rows() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        let store = PriceStore::new(pool);
        let cmc_id = 900_000_001;

        let old = vec![
            bar(1_700_000_000_000, dec!(101)),
            bar(1_700_000_300_000, dec!(102)),
        ];
        store
            .replace_bars(cmc_id, Timeframe::M5, &old)
            .await
            .unwrap();

        let new = vec![bar(1_700_000_600_000, dec!(103))];
        store
            .replace_bars(cmc_id, Timeframe::M5, &new)
            .await
            .unwrap();

        // 이전 행은 사라지고 정확히 새 캔들만 남는다
        let fetched = store
            .fetch_bars(cmc_id, Timeframe::M5, None, None)
            .await
            .unwrap();
        assert_eq!(fetched, new);

        store
            .replace_bars(cmc_id, Timeframe::M5, &[])
            .await
            .unwrap();
        let emptied = store
            .fetch_bars(cmc_id, Timeframe::M5, None, None)
            .await
            .unwrap();
        assert!(emptied.is_empty());
    }
}
