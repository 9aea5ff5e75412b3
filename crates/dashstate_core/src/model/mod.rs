//! Domain model for collection items shared by dashboard features.
//!
//! # Responsibility
//! - Define identity and sort-key contracts for collection items.
//! - Provide typed items for chat, feed and mail features.
//!
//! # Invariants
//! - Within one collection every item id is unique.

pub mod feature_items;
pub mod item;
