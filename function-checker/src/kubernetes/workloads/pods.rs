//! Pod operations

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// List pods in a namespace, optionally filtered by label selector
pub async fn list_pods(
    client: &K8sClient,
    namespace: &str,
    label_selector: Option<&str>,
) -> K8sResult<Vec<Pod>> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);

    let mut lp = ListParams::default();
    if let Some(selector) = label_selector {
        lp = lp.labels(selector);
    }

    let pod_list = pods.list(&lp).await?;

    Ok(pod_list.items)
}
