//! CLI command implementations

pub mod audit;
