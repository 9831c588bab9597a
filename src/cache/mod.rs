//! Caching layer for resolved card records

pub mod record_cache;

pub use record_cache::{LookupPlan, PendingLookup, RecordCache, ScanClaim, WaitOutcome};
