//! Domain Layer - Core price stream types.
//!
//! This layer contains the price update and session lifecycle types
//! with no I/O. Everything here is plain data and pure state transitions.

/// Price update types.
pub mod market;

/// Session state machine, close reasons and summary.
pub mod session;
