//! # Integration Flows

pub mod fixtures;

mod allocation;
mod migration;
mod persistence;
mod replication;
