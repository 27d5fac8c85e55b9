//! Cluster defaults discovery
//!
//! Finds the default ingress class, the `--ingress-class=` argument of a
//! running ingress-nginx controller, and the default storage class.

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, warn};

use crate::kubernetes::cluster_resources::namespaces;
use crate::kubernetes::config_storage::storageclasses;
use crate::kubernetes::networking::ingress;
use crate::kubernetes::workloads::pods;
use crate::kubernetes::{K8sClient, K8sResult};
use crate::manifests::IngressBinding;

/// Label selector of ingress-nginx controller pods
pub const INGRESS_CONTROLLER_SELECTOR: &str =
    "app.kubernetes.io/name=ingress-nginx,app.kubernetes.io/component=controller";
pub const INGRESS_CLASS_ARG: &str = "--ingress-class=";
pub const INGRESS_CONTAINER_NAME: &str = "controller";

/// Name of the IngressClass annotated as cluster default
pub async fn default_ingress_class(client: &K8sClient) -> K8sResult<Option<String>> {
    ingress::find_default_ingress_class(client).await
}

/// Value of the controller's `--ingress-class=` argument
///
/// Returns `None` when the namespace does not exist or holds no controller
/// pod.
pub async fn ingress_controller_arg(
    client: &K8sClient,
    ingress_namespace: &str,
) -> K8sResult<Option<String>> {
    if !namespaces::namespace_exists(client, ingress_namespace).await? {
        debug!(namespace = %ingress_namespace, "Ingress namespace not found");
        return Ok(None);
    }

    let controllers =
        pods::list_pods(client, ingress_namespace, Some(INGRESS_CONTROLLER_SELECTOR)).await?;
    Ok(ingress_class_arg(&controllers))
}

/// Scan the first pod's `controller` container for `--ingress-class=`
pub fn ingress_class_arg(pods: &[Pod]) -> Option<String> {
    let pod = pods.first()?;
    let containers = &pod.spec.as_ref()?.containers;

    let controller = containers
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(INGRESS_CONTAINER_NAME))?;

    controller
        .args
        .as_ref()?
        .iter()
        .find_map(|arg| arg.strip_prefix(INGRESS_CLASS_ARG))
        .map(String::from)
}

/// Name of the StorageClass annotated as cluster default
pub async fn default_storage_class(client: &K8sClient) -> K8sResult<Option<String>> {
    storageclasses::find_default_storage_class(client).await
}

/// Work out how the ingress should pick its controller
///
/// Lookup failures are logged and treated as "not found".
pub async fn discover_ingress_binding(
    client: &K8sClient,
    ingress_namespace: &str,
) -> Option<IngressBinding> {
    let class = default_ingress_class(client).await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to look up the default ingressclass");
        None
    });
    let controller_arg = ingress_controller_arg(client, ingress_namespace)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to inspect the ingress controller");
            None
        });

    debug!(?class, ?controller_arg, "Ingress discovery finished");
    IngressBinding::from_discovery(class, controller_arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec};

    fn pod(containers: Vec<(&str, Vec<&str>)>) -> Pod {
        Pod {
            spec: Some(PodSpec {
                containers: containers
                    .into_iter()
                    .map(|(name, args)| Container {
                        name: name.to_string(),
                        args: Some(args.into_iter().map(String::from).collect()),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_finds_ingress_class_arg() {
        let pods = vec![pod(vec![
            ("sidecar", vec!["--ingress-class=wrong"]),
            (
                "Controller",
                vec!["/nginx-ingress-controller", "--ingress-class=nginx", "--ingress-class=other"],
            ),
        ])];
        assert_eq!(ingress_class_arg(&pods), Some("nginx".to_string()));
    }

    #[test]
    fn test_only_first_pod_is_inspected() {
        let pods = vec![
            pod(vec![("controller", vec!["--v=2"])]),
            pod(vec![("controller", vec!["--ingress-class=nginx"])]),
        ];
        assert_eq!(ingress_class_arg(&pods), None);
    }

    #[test]
    fn test_no_pods_or_container() {
        assert_eq!(ingress_class_arg(&[]), None);
        assert_eq!(ingress_class_arg(&[Pod::default()]), None);
        assert_eq!(
            ingress_class_arg(&[pod(vec![("nginx", vec!["--ingress-class=nginx"])])]),
            None
        );
    }
}
