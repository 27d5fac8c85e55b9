//! Networking resources
//!
//! - Services exposing the workload inside the cluster
//! - Ingresses and IngressClasses for external access

pub mod ingress;
pub mod services;
