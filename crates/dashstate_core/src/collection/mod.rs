//! Ordered-collection state management for list-shaped UI features.
//!
//! # Responsibility
//! - Pure reducer over insertion-ordered, uniquely keyed collections.
//! - Feature-scoped dispatch handles with a duplicate-notice hook.
//!
//! # Invariants
//! - Invalid input degrades to a no-op, never to a panic or error.

pub mod notice;
pub mod reducer;
pub mod store;
