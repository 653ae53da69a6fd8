//! KubeGreen audit service
//!
//! Exposes the waste audit over HTTP alongside health and metrics endpoints.

pub mod api;
pub mod config;
