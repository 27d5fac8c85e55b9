//! Kubernetes error types
//!
//! Wraps kube-rs errors and exposes the "not found" condition the checker
//! branches on.

use thiserror::Error;

/// Kubernetes-specific errors
#[derive(Debug, Error)]
pub enum K8sError {
    /// Error from kube-rs client
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Invalid kubeconfig or client construction failure
    #[error("Invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    /// Exec session error
    #[error("Exec error: {0}")]
    ExecError(String),

    /// Object returned by the API server is missing a field we rely on
    #[error("Malformed {kind} {name}: {reason}")]
    Malformed {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

impl K8sError {
    /// Whether the API server answered 404 Not Found
    pub fn is_not_found(&self) -> bool {
        matches!(self, K8sError::KubeError(e) if is_not_found(e))
    }

    /// Whether the API server answered 409 Conflict (object already exists)
    pub fn is_conflict(&self) -> bool {
        matches!(self, K8sError::KubeError(kube::Error::Api(resp)) if resp.code == 409)
    }
}

/// Whether a kube-rs error is an API 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// Result type alias for Kubernetes operations
pub type K8sResult<T> = std::result::Result<T, K8sError>;
