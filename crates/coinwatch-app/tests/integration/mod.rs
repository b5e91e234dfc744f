//! Integration tests for coinwatch.
//!
//! These tests drive the full pipeline against a local websocket server:
//! - Connection lifecycle
//! - Subscription envelopes and acknowledgements
//! - Trade frames reaching the registry

pub mod common;
