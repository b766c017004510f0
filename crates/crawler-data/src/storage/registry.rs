//! 코인 레지스트리 저장소.
//!
//! 조정 결과(코인 + 시장 데이터 + 거래소 심볼 매핑 + 태그)를 Postgres에
//! 보관합니다. 갱신은 부분 갱신이 아니라 트랜잭션 하나에서 전체 집합을
//! 지우고 다시 만드는 방식입니다. 실패 시 롤백되어 이전 레지스트리가
//! 그대로 남습니다.

use crate::error::Result;
use chrono::{DateTime, Utc};
use crawler_core::{Coin, CoinMarketData, RegistryEntry};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

/// coin ⋈ cmc_market_data 조회 레코드.
#[derive(Debug, Clone, FromRow)]
struct CoinRow {
    cmc_id: i64,
    symbol: String,
    name: String,
    is_main: bool,
    cmc_rank: i32,
    max_supply: Option<Decimal>,
    circulating_supply: Option<Decimal>,
    total_supply: Option<Decimal>,
    infinite_supply: bool,
    num_market_pairs: i32,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct TagRow {
    cmc_id: i64,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct MappingRow {
    cmc_id: i64,
    exchange: String,
    symbol: String,
}

/// 레지스트리 저장소.
#[derive(Clone)]
pub struct RegistryStore {
    pool: PgPool,
}

impl RegistryStore {
    /// 새 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 레지스트리 전체를 원자적으로 교체합니다.
    ///
    /// 삭제는 자식 테이블부터 진행합니다 (FK 제약).
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn replace_registry(&self, entries: &[RegistryEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cmc_coin_tag")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cmc_market_data")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM exchange_symbol")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM coin").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cmc_tag").execute(&mut *tx).await?;

        // 태그 이름 → id 캐시. 같은 태그를 여러 코인이 공유합니다.
        let mut tag_ids: HashMap<String, i64> = HashMap::new();

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO coin (cmc_id, symbol, name, is_main)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(entry.coin.cmc_id)
            .bind(&entry.coin.symbol)
            .bind(&entry.coin.name)
            .bind(entry.coin.is_main)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO cmc_market_data
                    (cmc_id, cmc_rank, max_supply, circulating_supply, total_supply,
                     infinite_supply, num_market_pairs, last_updated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(entry.market.cmc_id)
            .bind(entry.market.cmc_rank)
            .bind(entry.market.max_supply)
            .bind(entry.market.circulating_supply)
            .bind(entry.market.total_supply)
            .bind(entry.market.infinite_supply)
            .bind(entry.market.num_market_pairs)
            .bind(entry.market.last_updated)
            .execute(&mut *tx)
            .await?;

            for tag in &entry.market.tags {
                let tag_id = match tag_ids.get(tag) {
                    Some(id) => *id,
                    None => {
                        let (id,): (i64,) = sqlx::query_as(
                            r#"
                            INSERT INTO cmc_tag (name)
                            VALUES ($1)
                            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                            RETURNING id
                            "#,
                        )
                        .bind(tag)
                        .fetch_one(&mut *tx)
                        .await?;
                        tag_ids.insert(tag.clone(), id);
                        id
                    }
                };

                sqlx::query(
                    r#"
                    INSERT INTO cmc_coin_tag (cmc_id, tag_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(entry.coin.cmc_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
            }

            for mapping in entry.symbol_mappings() {
                sqlx::query(
                    r#"
                    INSERT INTO exchange_symbol (cmc_id, exchange, symbol, is_active)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(mapping.cmc_id)
                .bind(&mapping.exchange)
                .bind(&mapping.symbol)
                .bind(mapping.is_active)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(count = entries.len(), "Registry replaced");
        Ok(())
    }

    /// 레지스트리 전체를 순위 오름차순으로 읽어옵니다.
    pub async fn load_registry(&self) -> Result<Vec<RegistryEntry>> {
        let coins: Vec<CoinRow> = sqlx::query_as(
            r#"
            SELECT c.cmc_id, c.symbol, c.name, c.is_main,
                   m.cmc_rank, m.max_supply, m.circulating_supply, m.total_supply,
                   m.infinite_supply, m.num_market_pairs, m.last_updated
            FROM coin c
            JOIN cmc_market_data m ON m.cmc_id = c.cmc_id
            ORDER BY m.cmc_rank ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let tags: Vec<TagRow> = sqlx::query_as(
            r#"
            SELECT ct.cmc_id, t.name
            FROM cmc_coin_tag ct
            JOIN cmc_tag t ON t.id = ct.tag_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mappings: Vec<MappingRow> = sqlx::query_as(
            r#"
            SELECT cmc_id, exchange, symbol
            FROM exchange_symbol
            WHERE is_active
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_coin: HashMap<i64, Vec<String>> = HashMap::new();
        for tag in tags {
            tags_by_coin.entry(tag.cmc_id).or_default().push(tag.name);
        }

        let mut mappings_by_coin: HashMap<i64, BTreeMap<String, String>> = HashMap::new();
        for mapping in mappings {
            mappings_by_coin
                .entry(mapping.cmc_id)
                .or_default()
                .insert(mapping.exchange, mapping.symbol);
        }

        Ok(coins
            .into_iter()
            .map(|row| RegistryEntry {
                coin: Coin {
                    cmc_id: row.cmc_id,
                    symbol: row.symbol,
                    name: row.name,
                    is_main: row.is_main,
                },
                market: CoinMarketData {
                    cmc_id: row.cmc_id,
                    cmc_rank: row.cmc_rank,
                    max_supply: row.max_supply,
                    circulating_supply: row.circulating_supply,
                    total_supply: row.total_supply,
                    infinite_supply: row.infinite_supply,
                    num_market_pairs: row.num_market_pairs,
                    last_updated: row.last_updated,
                    tags: tags_by_coin.remove(&row.cmc_id).unwrap_or_default(),
                },
                mappings: mappings_by_coin.remove(&row.cmc_id).unwrap_or_default(),
            })
            .collect())
    }

    /// 등록된 코인 수.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coin")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
