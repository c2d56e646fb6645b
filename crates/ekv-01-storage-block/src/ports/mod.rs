//! # Ports Layer
//!
//! Defines the port traits for the Storage Block subsystem.
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving ports (management API and chain data path)
//! - `outbound.rs` - Driven ports (backing store, peer transport, auto-scaler)

pub mod inbound;
pub mod outbound;
