//! Card identity and image resolution for deck-list tooling.
//!
//! Turns bare card names into hydrated [`CardRecord`]s by joining a card
//! table and an identifier table, and lazily downloads card artwork with a
//! placeholder fallback for missing backs.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod tables;

// Re-export commonly used items
pub use api::{ImageHosts, ImageResolver};
pub use cache::RecordCache;
pub use config::ProviderConfig;
pub use error::{FetchFailure, ProviderError, Result};
pub use models::{normalize_name, CardImage, CardRecord, CardSummary, Face};
pub use provider::CardProvider;
pub use tables::{CardRecordResolver, ColumnIndex};
pub use tokio_util::sync::CancellationToken;
