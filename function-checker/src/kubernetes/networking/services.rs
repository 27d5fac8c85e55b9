//! Service operations

use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, PostParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// Create a Service in `namespace`
pub async fn create_service(
    client: &K8sClient,
    namespace: &str,
    service: &Service,
) -> K8sResult<Service> {
    let services: Api<Service> = Api::namespaced(client.inner().clone(), namespace);
    let created = services.create(&PostParams::default(), service).await?;

    Ok(created)
}

/// Delete a Service
pub async fn delete_service(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let services: Api<Service> = Api::namespaced(client.inner().clone(), namespace);
    services.delete(name, &DeleteParams::default()).await?;

    Ok(())
}
