//! # Adapters Layer

mod probe;

pub use probe::StaticResetProbe;
