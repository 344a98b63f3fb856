pub mod cancel;
pub mod chain;
pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod fetcher;
pub mod report;

pub use cancel::{CancelHandle, CancelToken};
pub use chain::{ChainResult, ChainWalker, TrustStatus, ZoneVerdict};
pub use config::ChainConfig;
pub use error::{ChainError, ConfigError, FetchError};
