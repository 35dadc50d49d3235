//! Application Layer - Port definitions.
//!
//! This layer contains the port interfaces that define how the session
//! loop interacts with the network and with its output.

/// Port interfaces for external systems (message channel, event sink).
pub mod ports;
