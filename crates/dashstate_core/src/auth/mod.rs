//! Authentication status synchronization.
//!
//! # Responsibility
//! - Keep a local belief about the remote session (`session`).
//! - Verify it against the remote authority (`transport`, `synchronizer`).
//! - Drive periodic and visibility-triggered checks (`driver`).
//! - Redirect to login on invalidation (`navigator`).
//!
//! # Invariants
//! - Session state is written only by `AuthSynchronizer`.
//! - Failures degrade to "logged out"; they are never raised to callers.

pub mod driver;
pub mod navigator;
pub mod session;
pub mod synchronizer;
pub mod transport;
