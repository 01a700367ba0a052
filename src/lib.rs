pub mod config;
pub mod debounce;
pub mod envelope;
pub mod error;
pub mod fake_gateway;
pub mod filter;
pub mod gateway;
pub mod loader;
pub mod records;
pub mod state;
pub mod types;
pub mod visibility;

pub use crate::error::GatewayError;
pub use crate::filter::{Facets, FilterState, SortKey, SortOrder};
pub use crate::gateway::{CollectionGateway, GatewayConfig, HttpGateway};
pub use crate::loader::CatalogLoader;
pub use crate::records::{Article, Event, Exam, Note};
pub use crate::state::{LoadOutcome, SkipReason};
pub use crate::types::{CatalogItem, CatalogStatus, ItemId, PageResult, Resource, ResourceKind};
pub use crate::visibility::VisibilityTrigger;

/// Install the log subscriber.
pub fn init_tracing() {
    // Release builds only log WARN and above to keep query text out of logs
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();
}
