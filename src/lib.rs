// Library entry point
pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod pool;
pub mod record;
pub mod schema;
pub mod transport;

pub use config::{Config, TransportConfig};
pub use error::{ConfigError, Error, Result, TransportError};
pub use events::TransportEvent;
pub use record::LogRecord;
pub use transport::{DeliveryStats, LogCallback, LogSinkTransport};
