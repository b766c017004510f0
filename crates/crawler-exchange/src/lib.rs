//! 거래소 REST 커넥터 및 시장 데이터 게이트웨이.
//!
//! 고정된 거래소 집합(bingx, xt, lbank, coinex)에 대한 균일한 접근을
//! 제공합니다. 커넥터는 프로세스 수명 동안 한 번만 생성되어 재사용되며,
//! 오케스트레이터는 `MarketDataSource` trait을 통해 게이트웨이를
//! 주입받습니다.

pub mod connector;
pub mod error;
pub mod gateway;
pub mod traits;

pub use connector::ExchangeCredentials;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ExchangeGateway, EXCHANGES};
pub use traits::{MarketDataSource, SpotExchange};
