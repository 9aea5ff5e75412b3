//! Core state logic for the dashboard UI.
//! This crate is the single source of truth for collection and session invariants.

pub mod auth;
pub mod collection;
pub mod config;
pub mod logging;
pub mod model;

pub use auth::driver::{AuthSyncHandle, Visibility};
pub use auth::navigator::{is_same_route, Navigator, RedirectQueue};
pub use auth::session::{
    AuthFailure, AuthPhase, AuthSession, LinkedIdentity, SessionCell, SessionReader, UserIdentity,
};
pub use auth::synchronizer::{AuthSynchronizer, LogoutOutcome, VerifyTrigger};
pub use auth::transport::{
    AuthTransport, AuthTransportError, HttpAuthTransport, StatusCharacter, StatusResponse,
};
pub use collection::notice::{LogNoticeSink, Notice, NoticeKind, NoticeQueue, NoticeSink};
pub use collection::reducer::{
    reduce, CollectionAction, CollectionError, NoOpReason, OrderedCollection, ReduceOutcome,
    Reduction, SortDirection,
};
pub use collection::store::CollectionStore;
pub use config::{AuthSyncConfig, ConfigError, ResponseOrdering};
pub use logging::{
    default_log_level, init_logging, logging_status, LogLevel, LoggingError, LoggingStatus,
};
pub use model::feature_items::{ChatMessage, ChatThread, CollectionFeature, FeedPost, MailMessage};
pub use model::item::{CollectionItem, ItemId, Record, SortKey};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
