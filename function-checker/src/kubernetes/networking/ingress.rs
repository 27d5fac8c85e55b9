//! Ingress and IngressClass operations

use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::api::{Api, DeleteParams, ListParams, PostParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// Annotation marking the cluster default ingress class
pub const DEFAULT_INGRESS_CLASS_ANNOTATION: &str = "ingressclass.kubernetes.io/is-default-class";

/// Create an Ingress in `namespace`
pub async fn create_ingress(
    client: &K8sClient,
    namespace: &str,
    ingress: &Ingress,
) -> K8sResult<Ingress> {
    let ingresses: Api<Ingress> = Api::namespaced(client.inner().clone(), namespace);
    let created = ingresses.create(&PostParams::default(), ingress).await?;

    Ok(created)
}

/// Delete an Ingress
pub async fn delete_ingress(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let ingresses: Api<Ingress> = Api::namespaced(client.inner().clone(), namespace);
    ingresses.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

/// Find the IngressClass annotated as cluster default
pub async fn find_default_ingress_class(client: &K8sClient) -> K8sResult<Option<String>> {
    let classes: Api<IngressClass> = Api::all(client.inner().clone());
    let list = classes.list(&ListParams::default()).await?;

    Ok(list
        .items
        .iter()
        .find(|class| is_default_ingress_class(class))
        .and_then(|class| class.metadata.name.clone()))
}

/// Whether an IngressClass carries the default-class annotation set to "true"
pub fn is_default_ingress_class(class: &IngressClass) -> bool {
    class
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DEFAULT_INGRESS_CLASS_ANNOTATION))
        .map(|v| v == "true")
        .unwrap_or(false)
}
