//! Cluster-scoped resources

pub mod namespaces;
