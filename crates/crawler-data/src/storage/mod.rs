//! 저장소 계층 (Redis 캐시, Postgres 저장소).

pub mod price;
pub mod redis;
pub mod registry;
