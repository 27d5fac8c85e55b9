//! Configuration and storage resources
//!
//! - ConfigMaps carrying the probe page and script
//! - PersistentVolumeClaims left behind by the stateful workload
//! - StorageClasses (existence and default lookup)

pub mod configmaps;
pub mod pvcs;
pub mod storageclasses;
