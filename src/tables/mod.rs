//! Readers for the card and identifier CSV tables

pub mod columns;
pub mod resolver;

pub use columns::{ColumnIndex, CARD_COLUMNS, IDENTIFIER_COLUMNS};
pub use resolver::{CardRecordResolver, Resolution};
