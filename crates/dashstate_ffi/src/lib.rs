//! Flutter-facing bridge over `dashstate_core`.

pub mod api;
