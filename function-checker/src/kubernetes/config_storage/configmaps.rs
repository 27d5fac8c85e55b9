//! ConfigMap operations

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, DeleteParams, PostParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// Create a ConfigMap in `namespace`
pub async fn create_configmap(
    client: &K8sClient,
    namespace: &str,
    configmap: &ConfigMap,
) -> K8sResult<ConfigMap> {
    let configmaps: Api<ConfigMap> = Api::namespaced(client.inner().clone(), namespace);
    let created = configmaps.create(&PostParams::default(), configmap).await?;

    Ok(created)
}

/// Delete a ConfigMap
pub async fn delete_configmap(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let configmaps: Api<ConfigMap> = Api::namespaced(client.inner().clone(), namespace);
    configmaps.delete(name, &DeleteParams::default()).await?;

    Ok(())
}
