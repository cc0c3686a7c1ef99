//! Axum-based API gateway for the astra platform: route wiring, request
//! DTOs, bearer-token extraction, and the error-to-status mapping.
//!
//! Exposed as a library so integration tests can drive the router directly;
//! the binary entry point lives in `main.rs`.

pub mod api;
pub mod error;
pub mod state;
