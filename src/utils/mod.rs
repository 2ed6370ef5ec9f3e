//! Utilities module
//!
//! Contains error handling, logging helpers and the local credential cache

pub mod auth_cache;
pub mod error;
pub mod logging;
