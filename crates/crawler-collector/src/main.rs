//! Standalone data collector CLI.

use clap::{Parser, Subcommand};
use crawler_collector::{modules, CollectorConfig};
use crawler_core::{LogConfig, LogFormat, Timeframe};
use crawler_data::{CmcClient, PriceStore, RedisCache, RedisConfig, RegistryStore};
use crawler_exchange::ExchangeGateway;

#[derive(Parser)]
#[command(name = "crawler-collector")]
#[command(about = "Multi-Exchange Crypto Data Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 코인 레지스트리 갱신 (CMC ↔ 거래소 심볼 조정)
    RefreshRegistry,

    /// 실시간 시세 수집
    CollectRealtime,

    /// 호가창 스냅샷 수집
    CollectOrderbook,

    /// OHLCV 캔들 수집
    CollectOhlcv {
        /// 타임프레임 (5m, 15m, 1h, 4h, 1d, 1w)
        #[arg(long)]
        timeframe: String,
    },

    /// 전체 워크플로우 실행 (레지스트리 → 실시간 → 호가창 → 전체 타임프레임)
    RunAll,

    /// 데몬 모드: 주기적으로 수집 실행
    Daemon,
}

/// 모듈이 공유하는 연결 묶음.
struct Services {
    cmc: CmcClient,
    gateway: ExchangeGateway,
    cache: RedisCache,
    registry: RegistryStore,
    prices: PriceStore,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    crawler_core::init_logging(LogConfig::new(cli.log_level.clone()).with_format(cli.log_format))?;

    tracing::info!("Coin Crawler Collector 시작");

    let config = CollectorConfig::from_env()?;
    tracing::debug!(exchanges = ?config.exchange_order, "설정 로드 완료");

    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    tracing::info!("데이터베이스 연결 성공");

    let cache = RedisCache::connect(&RedisConfig {
        url: config.redis_url.clone(),
    })
    .await?;

    let services = Services {
        cmc: CmcClient::new(&config.cmc_api_key)?,
        gateway: ExchangeGateway::new(&config.exchange_order, &config.credentials)?,
        cache,
        registry: RegistryStore::new(pool.clone()),
        prices: PriceStore::new(pool.clone()),
    };

    match cli.command {
        Commands::RefreshRegistry => {
            let stats = modules::refresh_registry(
                &services.cmc,
                &services.gateway,
                &services.cache,
                &services.registry,
                &config,
            )
            .await?;
            stats.log_summary("레지스트리 갱신");
        }
        Commands::CollectRealtime => {
            let stats = modules::collect_realtime(
                &services.gateway,
                &services.cache,
                &services.registry,
                &config,
            )
            .await?;
            stats.log_summary("실시간 시세 수집");
        }
        Commands::CollectOrderbook => {
            let stats = modules::collect_orderbook(
                &services.gateway,
                &services.cache,
                &services.registry,
                &config,
            )
            .await?;
            stats.log_summary("호가창 수집");
        }
        Commands::CollectOhlcv { timeframe } => {
            let timeframe: Timeframe = timeframe.parse()?;
            let stats = modules::refresh_ohlcv(
                &services.gateway,
                &services.cache,
                &services.registry,
                &services.prices,
                timeframe,
                &config,
            )
            .await?;
            stats.log_summary("OHLCV 수집");
        }
        Commands::RunAll => {
            tracing::info!("=== 전체 워크플로우 시작 ===");
            run_all(&services, &config).await?;
            tracing::info!("=== 전체 워크플로우 완료 ===");
        }
        Commands::Daemon => {
            run_daemon(&services, &config).await;
        }
    }

    pool.close().await;
    tracing::info!("Coin Crawler Collector 종료");

    Ok(())
}

/// 레지스트리 → 실시간 → 호가창 → 전체 타임프레임 순서로 실행합니다.
async fn run_all(
    services: &Services,
    config: &CollectorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = modules::refresh_registry(
        &services.cmc,
        &services.gateway,
        &services.cache,
        &services.registry,
        config,
    )
    .await?;
    stats.log_summary("레지스트리 갱신");

    let stats = modules::collect_realtime(
        &services.gateway,
        &services.cache,
        &services.registry,
        config,
    )
    .await?;
    stats.log_summary("실시간 시세 수집");

    let stats = modules::collect_orderbook(
        &services.gateway,
        &services.cache,
        &services.registry,
        config,
    )
    .await?;
    stats.log_summary("호가창 수집");

    for timeframe in Timeframe::ALL {
        let stats = modules::refresh_ohlcv(
            &services.gateway,
            &services.cache,
            &services.registry,
            &services.prices,
            timeframe,
            config,
        )
        .await?;
        stats.log_summary(&format!("OHLCV 수집 ({timeframe})"));
    }

    Ok(())
}

/// 데몬 모드: 작업 종류별 주기로 수집을 반복합니다.
async fn run_daemon(services: &Services, config: &CollectorConfig) {
    tracing::info!(
        realtime_secs = config.daemon.realtime_secs,
        intraday_minutes = config.daemon.intraday_minutes,
        hourly_minutes = config.daemon.hourly_minutes,
        registry_hours = config.daemon.registry_hours,
        "=== 데몬 모드 시작 ==="
    );

    let mut realtime = tokio::time::interval(config.daemon.realtime_interval());
    let mut intraday = tokio::time::interval(config.daemon.intraday_interval());
    let mut hourly = tokio::time::interval(config.daemon.hourly_interval());
    let mut registry = tokio::time::interval(config.daemon.registry_interval());
    for interval in [&mut realtime, &mut intraday, &mut hourly, &mut registry] {
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = registry.tick() => {
                match modules::refresh_registry(
                    &services.cmc,
                    &services.gateway,
                    &services.cache,
                    &services.registry,
                    config,
                )
                .await
                {
                    Ok(stats) => stats.log_summary("레지스트리 갱신"),
                    Err(e) => tracing::error!("레지스트리 갱신 실패: {}", e),
                }
            }
            _ = realtime.tick() => {
                match modules::collect_realtime(
                    &services.gateway,
                    &services.cache,
                    &services.registry,
                    config,
                )
                .await
                {
                    Ok(stats) => stats.log_summary("실시간 시세 수집"),
                    Err(e) => tracing::error!("실시간 시세 수집 실패: {}", e),
                }

                match modules::collect_orderbook(
                    &services.gateway,
                    &services.cache,
                    &services.registry,
                    config,
                )
                .await
                {
                    Ok(stats) => stats.log_summary("호가창 수집"),
                    Err(e) => tracing::error!("호가창 수집 실패: {}", e),
                }
            }
            _ = intraday.tick() => {
                collect_timeframes(services, config, &[Timeframe::M5, Timeframe::M15]).await;
            }
            _ = hourly.tick() => {
                collect_timeframes(
                    services,
                    config,
                    &[Timeframe::H1, Timeframe::H4, Timeframe::D1, Timeframe::W1],
                )
                .await;
            }
        }
    }
}

/// 타임프레임 목록을 순서대로 수집합니다. 실패는 로그만 남깁니다.
async fn collect_timeframes(
    services: &Services,
    config: &CollectorConfig,
    timeframes: &[Timeframe],
) {
    for &timeframe in timeframes {
        match modules::refresh_ohlcv(
            &services.gateway,
            &services.cache,
            &services.registry,
            &services.prices,
            timeframe,
            config,
        )
        .await
        {
            Ok(stats) => stats.log_summary(&format!("OHLCV 수집 ({timeframe})")),
            Err(e) => tracing::error!("OHLCV 수집 실패 ({}): {}", timeframe, e),
        }
    }
}
