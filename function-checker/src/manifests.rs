//! Object specs for the probe resources
//!
//! Everything that varies between runs (names, labels, image, replica count,
//! storage settings) comes from [`ManifestFactory`]'s inputs.

use std::collections::BTreeMap;

use function_checker_common::{CheckerConfig, ManifestConfig, ProbeConfig};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Affinity, ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, KeyToPath,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodAffinityTerm, PodAntiAffinity, PodSpec,
    PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
    VolumeResourceRequirements, WeightedPodAffinityTerm,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, LabelSelectorRequirement, ObjectMeta,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::kubernetes::exec::ExecRequest;
use crate::kubernetes::K8sResult;
use crate::resources::ManagedResource;

/// Label shared by every probe object; also the PVC cleanup selector key
pub const COMPONENT_LABEL: &str = "component";
/// Per-kind label
pub const TYPE_LABEL: &str = "type";
/// Legacy annotation selecting an ingress controller
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

pub const PAGE_KEY: &str = "index.html";
pub const SCRIPT_KEY: &str = "service-checker.sh";
pub const SCRIPT_MOUNT_PATH: &str = "/script";
pub const PAGE_MOUNT_PATH: &str = "/usr/share/nginx/html";
pub const CLAIM_MOUNT_PATH: &str = "/opt";
pub const CLAIM_TEMPLATE_NAME: &str = "pvc";

const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Requests the service `count` times and prints every response body
const SERVICE_CHECKER_SCRIPT: &str = r#"#!/bin/bash
count=$1
host=$2
for i in $(seq 1 "$count"); do
  curl -s "http://${host}/"
done
"#;

/// How the ingress selects its controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressBinding {
    /// `spec.ingressClassName`
    ClassName(String),
    /// `kubernetes.io/ingress.class` annotation
    Annotation(String),
}

impl IngressBinding {
    /// Pick a binding from discovery results; the class name wins when both
    /// are known. `None` means no ingress can be created.
    pub fn from_discovery(class: Option<String>, controller_arg: Option<String>) -> Option<Self> {
        match (class, controller_arg) {
            (Some(class), _) => Some(IngressBinding::ClassName(class)),
            (None, Some(arg)) => Some(IngressBinding::Annotation(arg)),
            (None, None) => None,
        }
    }
}

/// Builds the ConfigMap, Service, StatefulSet and Ingress for one run
#[derive(Debug, Clone)]
pub struct ManifestFactory {
    manifest: ManifestConfig,
    probe: ProbeConfig,
    namespace: String,
    storage_class: String,
    capacity: String,
    host: String,
}

impl ManifestFactory {
    /// `storage_class` is the resolved class (explicit or discovered default)
    pub fn new(config: &CheckerConfig, storage_class: impl Into<String>) -> Self {
        Self {
            manifest: config.manifest.clone(),
            probe: config.probe.clone(),
            namespace: config.target.namespace.clone(),
            storage_class: storage_class.into(),
            capacity: config.target.capacity.clone(),
            host: config.target.host.clone(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn config_map_name(&self) -> String {
        format!("{}-cm", self.manifest.name_prefix)
    }

    pub fn service_name(&self) -> String {
        format!("{}-svc", self.manifest.name_prefix)
    }

    pub fn stateful_set_name(&self) -> String {
        format!("{}-sts", self.manifest.name_prefix)
    }

    pub fn ingress_name(&self) -> String {
        format!("{}-ingress", self.manifest.name_prefix)
    }

    /// Selector matching every volume claim spawned by the workload
    pub fn claim_selector(&self) -> String {
        format!("{}={}", COMPONENT_LABEL, self.manifest.component)
    }

    /// Body every request to the service returns
    pub fn expected_output(&self) -> &str {
        &self.probe.expected
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn labels(&self, kind: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (COMPONENT_LABEL.to_string(), self.manifest.component.clone()),
            (TYPE_LABEL.to_string(), kind.to_string()),
        ])
    }

    fn metadata(&self, name: String, kind: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels(kind)),
            ..Default::default()
        }
    }

    /// Pod labels of the workload, also the service selector
    fn workload_labels(&self) -> BTreeMap<String, String> {
        self.labels("statefulset")
    }

    pub fn config_map(&self) -> ConfigMap {
        ConfigMap {
            metadata: self.metadata(self.config_map_name(), "configmap"),
            data: Some(BTreeMap::from([
                (PAGE_KEY.to_string(), self.probe.expected.clone()),
                (SCRIPT_KEY.to_string(), SERVICE_CHECKER_SCRIPT.to_string()),
            ])),
            ..Default::default()
        }
    }

    pub fn service(&self) -> Service {
        let port = self.manifest.service_port;

        Service {
            metadata: self.metadata(self.service_name(), "service"),
            spec: Some(ServiceSpec {
                selector: Some(self.workload_labels()),
                ports: Some(vec![ServicePort {
                    name: Some("function-checker-svc".to_string()),
                    protocol: Some("TCP".to_string()),
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn stateful_set(&self) -> StatefulSet {
        let labels = self.workload_labels();

        let anti_affinity = Affinity {
            pod_anti_affinity: Some(PodAntiAffinity {
                preferred_during_scheduling_ignored_during_execution: Some(vec![
                    WeightedPodAffinityTerm {
                        weight: 100,
                        pod_affinity_term: PodAffinityTerm {
                            label_selector: Some(LabelSelector {
                                match_expressions: Some(vec![LabelSelectorRequirement {
                                    key: COMPONENT_LABEL.to_string(),
                                    operator: "In".to_string(),
                                    values: Some(vec![self.manifest.component.clone()]),
                                }]),
                                ..Default::default()
                            }),
                            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
                            ..Default::default()
                        },
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = Container {
            name: self.manifest.container_name.clone(),
            image: Some(self.manifest.image.clone()),
            ports: Some(vec![ContainerPort {
                container_port: self.manifest.service_port,
                ..Default::default()
            }]),
            volume_mounts: Some(vec![
                mount(CLAIM_TEMPLATE_NAME, CLAIM_MOUNT_PATH),
                mount("webpage", PAGE_MOUNT_PATH),
                mount("script", SCRIPT_MOUNT_PATH),
            ]),
            ..Default::default()
        };

        let volumes = vec![
            self.config_map_volume("webpage", PAGE_KEY, None),
            self.config_map_volume("script", SCRIPT_KEY, Some(0o755)),
        ];

        let claim_template = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(CLAIM_TEMPLATE_NAME.to_string()),
                labels: Some(BTreeMap::from([(
                    COMPONENT_LABEL.to_string(),
                    self.manifest.component.clone(),
                )])),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                storage_class_name: Some(self.storage_class.clone()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(self.capacity.clone()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        StatefulSet {
            metadata: self.metadata(self.stateful_set_name(), "statefulset"),
            spec: Some(StatefulSetSpec {
                replicas: Some(self.manifest.replicas),
                service_name: self.service_name().into(),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        affinity: Some(anti_affinity),
                        containers: vec![container],
                        volumes: Some(volumes),
                        ..Default::default()
                    }),
                },
                volume_claim_templates: Some(vec![claim_template]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn config_map_volume(&self, name: &str, key: &str, mode: Option<i32>) -> Volume {
        Volume {
            name: name.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: self.config_map_name().into(),
                items: Some(vec![KeyToPath {
                    key: key.to_string(),
                    path: key.to_string(),
                    mode,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn ingress(&self, binding: &IngressBinding) -> Ingress {
        let mut metadata = self.metadata(self.ingress_name(), "ingress");
        let mut ingress_class_name = None;

        match binding {
            IngressBinding::ClassName(class) => ingress_class_name = Some(class.clone()),
            IngressBinding::Annotation(value) => {
                metadata.annotations = Some(BTreeMap::from([(
                    INGRESS_CLASS_ANNOTATION.to_string(),
                    value.clone(),
                )]));
            }
        }

        Ingress {
            metadata,
            spec: Some(IngressSpec {
                ingress_class_name,
                rules: Some(vec![IngressRule {
                    host: Some(self.host.clone()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: self.service_name(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(self.manifest.service_port),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Every resource of a run in creation order; the ingress only when a
    /// binding was discovered
    pub fn resources(&self, binding: Option<&IngressBinding>) -> K8sResult<Vec<ManagedResource>> {
        let mut resources = vec![
            ManagedResource::config_map(self.config_map())?,
            ManagedResource::service(self.service())?,
            ManagedResource::stateful_set(self.stateful_set(), self.claim_selector())?,
        ];

        if let Some(binding) = binding {
            resources.push(ManagedResource::ingress(self.ingress(binding))?);
        }

        Ok(resources)
    }

    /// Exec request run in the first workload pod to reach the service
    pub fn probe_request(&self) -> ExecRequest {
        let command = format!(
            "/bin/bash {}/{} {} {}.{}",
            SCRIPT_MOUNT_PATH,
            SCRIPT_KEY,
            self.probe.repeat,
            self.service_name(),
            self.namespace
        );

        ExecRequest {
            namespace: self.namespace.clone(),
            pod: format!("{}-0", self.stateful_set_name()),
            container: Some(self.manifest.container_name.clone()),
            command: command.split_whitespace().map(String::from).collect(),
        }
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}
