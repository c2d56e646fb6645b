//! # Ports Layer
//!
//! - `inbound.rs` - Driving port (`BlockAllocationApi`)
//! - `outbound.rs` - Driven port (`BlockResetProbe`)

pub mod inbound;
pub mod outbound;
