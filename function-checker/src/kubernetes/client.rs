//! Kubernetes client wrapper
//!
//! Wraps the kube-rs Client with the context it was built from.

use kube::config::KubeConfigOptions;
use kube::{Client, Config};

use super::error::{K8sError, K8sResult};

/// Wrapper around kube-rs Client with cluster context
#[derive(Clone)]
pub struct K8sClient {
    inner: Client,
    context: String,
    api_server: String,
}

impl K8sClient {
    /// Create client from the standard kubeconfig (`KUBECONFIG` or
    /// `~/.kube/config`), falling back to in-cluster configuration
    pub async fn from_default_kubeconfig(context: Option<&str>) -> K8sResult<Self> {
        let options = KubeConfigOptions {
            context: context.map(String::from),
            ..Default::default()
        };

        let config = match Config::from_kubeconfig(&options).await {
            Ok(config) => config,
            Err(kubeconfig_err) if context.is_none() => {
                tracing::debug!("No usable kubeconfig ({}), trying in-cluster config", kubeconfig_err);
                Config::incluster().map_err(|e| {
                    K8sError::InvalidKubeconfig(format!(
                        "Failed to load kubeconfig ({}) or in-cluster config ({})",
                        kubeconfig_err, e
                    ))
                })?
            }
            Err(e) => {
                return Err(K8sError::InvalidKubeconfig(format!(
                    "Failed to load kubeconfig: {}",
                    e
                )))
            }
        };

        let api_server = config.cluster_url.to_string();

        let client = Client::try_from(config)
            .map_err(|e| K8sError::InvalidKubeconfig(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            inner: client,
            context: context.unwrap_or("current-context").to_string(),
            api_server,
        })
    }

    /// Wrap an already built client
    pub fn from_client(client: Client, context: impl Into<String>) -> Self {
        Self {
            inner: client,
            context: context.into(),
            api_server: String::new(),
        }
    }

    /// Get the inner kube-rs Client
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Get the kubeconfig context name
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Get API server URL
    pub fn api_server(&self) -> &str {
        &self.api_server
    }
}

impl std::fmt::Debug for K8sClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8sClient")
            .field("context", &self.context)
            .field("api_server", &self.api_server)
            .finish()
    }
}
