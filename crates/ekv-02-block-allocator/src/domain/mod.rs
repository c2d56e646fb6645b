//! # Domain Layer
//!
//! Pool state and allocator errors.

mod config;
mod errors;
mod pool;

pub use config::*;
pub use errors::*;
pub use pool::*;
