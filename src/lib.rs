#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;
mod helpers;
mod prelude;
mod req;

// Shared utilities
pub mod serde_utils;
pub mod types;

// Feature modules
pub mod config;
pub mod derived;
pub mod fetcher;
pub mod logging;
pub mod notify;
mod orchestrator;
mod slot;

// Re-exports
pub use consts::{
    DEFAULT_HISTORY_WINDOW_DAYS, DEFAULT_TOP_DRIVERS, LOCAL_API_URL, LOW_RISK_UPPER_BOUND,
    MAX_RISK_SCORE, MEDIUM_RISK_UPPER_BOUND, PRODUCTION_API_URL, STAGING_API_URL,
};
pub use errors::{Error, ErrorKind, RecoveryHint};
pub use fetcher::{ResourceFetcher, ResourceKind, RiskClient, RiskPayload, RiskRequest};
pub use helpers::BaseUrl;
pub use notify::{ChannelObserver, SlotEvent, SlotObserver, SlotSnapshot, SubscriptionId};
pub use orchestrator::{ClearTarget, ProfileSnapshot, RiskOrchestrator};
pub use req::{HttpClient, StaticToken, TokenSource};
pub use slot::{ResourceSlot, SlotStatus};
pub use types::*;
