//! `lb-gateway`: the LinkBridge web service.
//!
//! Wires the two OAuth logins, the encrypted session cookie and the link
//! orchestrator into an axum router. The binary lives in `main.rs`; this
//! library half exists so the router can be driven from tests.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod oauth;
pub mod runtime;
pub mod session;
pub mod state;
