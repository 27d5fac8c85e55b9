//! function-checker
//!
//! Creates a ConfigMap, Service, StatefulSet and (when an ingress controller
//! is found) an Ingress, waits for the workload, checks service reachability
//! from inside a pod, asks the operator to confirm the ingress from a
//! browser, and removes everything it created.

pub mod discovery;
pub mod kubernetes;
pub mod lifecycle;
pub mod logging;
pub mod manifests;
pub mod preflight;
pub mod resources;
pub mod shutdown;

pub use kubernetes::{K8sClient, K8sError, K8sResult};
pub use lifecycle::{Orchestrator, RunOutcome, RunReport, Stages};
pub use manifests::{IngressBinding, ManifestFactory};
pub use resources::{ManagedResource, OperatorRegistry};
pub use shutdown::{ShutdownCoordinator, SignalAction};
