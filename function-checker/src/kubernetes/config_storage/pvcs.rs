//! PersistentVolumeClaim operations
//!
//! Claims created from a StatefulSet's volume claim templates outlive the
//! workload, so they are removed explicitly by label.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{Api, DeleteParams, ListParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// Delete every PVC in `namespace` matching `label_selector` in one call
pub async fn delete_pvcs_by_label(
    client: &K8sClient,
    namespace: &str,
    label_selector: &str,
) -> K8sResult<()> {
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client.inner().clone(), namespace);

    pvcs.delete_collection(
        &DeleteParams::default(),
        &ListParams::default().labels(label_selector),
    )
    .await?;

    tracing::debug!(
        namespace,
        selector = label_selector,
        "Deleted persistent volume claims"
    );

    Ok(())
}
