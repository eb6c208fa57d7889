//! # Web API Handlers
//!
//! Health and cache-metrics endpoints owned by this crate.

pub mod health;
