//! Kubernetes integration
//!
//! Thin typed wrappers over kube-rs for the object kinds the checker touches:
//! - Cluster connection via kubeconfig
//! - Workloads (StatefulSets, Pods)
//! - Networking (Services, Ingresses, IngressClasses)
//! - Configuration and storage (ConfigMaps, PVCs, StorageClasses)
//! - Namespaces
//! - Remote command execution in pods

pub mod client;
pub mod error;

pub mod cluster_resources;
pub mod config_storage;
pub mod exec;
pub mod networking;
pub mod workloads;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
