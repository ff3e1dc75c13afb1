//! `lb-domain`: shared types for the LinkBridge crates.
//!
//! Holds the configuration model, the shared [`error::Error`] type, the
//! two identity shapes produced by the OAuth callbacks, and the structured
//! [`trace::TraceEvent`] log events.

pub mod config;
pub mod error;
pub mod identity;
pub mod trace;
