mod client;
mod config;
mod diff;
mod error;
mod lease;
mod logger;
mod poller;
mod protocol;
mod signer;
mod types;

pub use client::{DEFAULT_TIMEOUT, TuyaClient, TuyaClientBuilder};
pub use config::{
    AccessoryType, Credentials, DEFAULT_POLL_INTERVAL, DeviceConfig, PlatformConfig,
    PluginOptions, Region,
};
pub use error::{AuthStage, Error, Result};
pub use lease::{REFRESH_MARGIN_SECS, TokenLease};
pub use logger::MessageLogMode;
pub use poller::Poller;
pub use signer::{Signer, canonical_url, content_hash};
pub use types::*;
