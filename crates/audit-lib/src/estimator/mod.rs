//! Waste estimation rules
//!
//! - Compute: request versus usage per workload, priced per core-hour and GiB-hour
//! - Storage: claims that no workload mounts, priced at a flat monthly rate

mod compute;
mod storage;

pub use compute::{ComputeEstimate, ComputeEstimator};
pub use storage::{active_claims, OrphanDetector};
