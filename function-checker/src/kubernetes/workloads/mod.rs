//! Workload resources

pub mod pods;
pub mod statefulsets;

pub use statefulsets::ReplicaCounts;
