//! Configuration management for function-checker
//!
//! Settings are resolved in this order (later wins):
//! 1. Default values
//! 2. Configuration file (TOML format)
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Upper bound for the readiness timeout and poll interval (one day)
pub const MAX_READINESS_SECS: u64 = 24 * 60 * 60;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Where the probe resources are created
    pub target: TargetConfig,
    /// Values fed into the manifest factory
    pub manifest: ManifestConfig,
    /// Readiness polling settings
    pub readiness: ReadinessConfig,
    /// In-cluster connectivity probe settings
    pub probe: ProbeConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Cluster-side target of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Namespace the probe resources are created in
    pub namespace: String,
    /// Namespace the ingress controller runs in
    pub ingress_namespace: String,
    /// Storage class for the volume claims; the cluster default is used when unset
    pub storage_class: Option<String>,
    /// Requested volume size, e.g. "50Gi"
    pub capacity: String,
    /// Host used in the ingress rule
    pub host: String,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
}

/// Inputs for the object specs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Prefix for every object name (`<prefix>-cm`, `<prefix>-svc`, ...)
    pub name_prefix: String,
    /// Value of the `component` label shared by all objects
    pub component: String,
    /// Replica count of the stateful workload
    pub replicas: i32,
    /// Web server image run by the workload
    pub image: String,
    /// Container name, also the exec target
    pub container_name: String,
    /// Port exposed by the service and the container
    pub service_port: i32,
}

/// Readiness poller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Upper bound for the readiness wait
    pub timeout_secs: u64,
    /// Delay between two status fetches
    pub interval_secs: u64,
    /// What to do when the workload never became ready
    pub on_timeout: TimeoutPolicy,
}

/// Connectivity probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Page content served by the workload and expected back from the service
    pub expected: String,
    /// Number of requests issued against the service
    pub repeat: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

/// Behaviour after the readiness wait timed out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutPolicy {
    /// Run the probe anyway and tag the report
    #[default]
    Proceed,
    /// Skip the probe and record the timeout as an error
    SkipProbe,
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPolicy::Proceed => write!(f, "proceed"),
            TimeoutPolicy::SkipProbe => write!(f, "skip-probe"),
        }
    }
}

impl FromStr for TimeoutPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proceed" => Ok(TimeoutPolicy::Proceed),
            "skip-probe" | "skip_probe" => Ok(TimeoutPolicy::SkipProbe),
            other => Err(ConfigError::Validation(format!(
                "unknown readiness timeout policy '{}' (expected 'proceed' or 'skip-probe')",
                other
            ))),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            ingress_namespace: String::new(),
            storage_class: None,
            capacity: "50Gi".to_string(),
            host: "nginx-test.js.sgcc.com.cn".to_string(),
            context: None,
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            name_prefix: "k8s-function-checker".to_string(),
            component: "k8s-function-checker".to_string(),
            replicas: 3,
            image: "registry.cn-shanghai.aliyuncs.com/ltzhang/nginx:1.21.4".to_string(),
            container_name: "function-check-container".to_string(),
            service_port: 80,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            interval_secs: 2,
            on_timeout: TimeoutPolicy::Proceed,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            expected: "it works!".to_string(),
            repeat: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CheckerConfig {
    /// Load defaults, then the config file (explicit path or discovered), then
    /// environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit
            .map(Path::to_path_buf)
            .or_else(Self::find_config_file)
        {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("FUNCTION_CHECKER_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("./function-checker.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply `FUNCTION_CHECKER_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Target
        if let Some(ns) = lookup("FUNCTION_CHECKER_NAMESPACE") {
            self.target.namespace = ns;
        }
        if let Some(ns) = lookup("FUNCTION_CHECKER_INGRESS_NAMESPACE") {
            self.target.ingress_namespace = ns;
        }
        if let Some(sc) = lookup("FUNCTION_CHECKER_STORAGECLASS") {
            self.target.storage_class = Some(sc).filter(|s| !s.is_empty());
        }
        if let Some(capacity) = lookup("FUNCTION_CHECKER_CAPACITY") {
            self.target.capacity = capacity;
        }
        if let Some(host) = lookup("FUNCTION_CHECKER_HOST") {
            self.target.host = host;
        }
        if let Some(context) = lookup("FUNCTION_CHECKER_CONTEXT") {
            self.target.context = Some(context).filter(|c| !c.is_empty());
        }

        // Readiness
        if let Some(timeout) = lookup("FUNCTION_CHECKER_READINESS_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.readiness.timeout_secs = timeout;
            }
        }
        if let Some(interval) = lookup("FUNCTION_CHECKER_POLL_INTERVAL") {
            if let Ok(interval) = interval.parse() {
                self.readiness.interval_secs = interval;
            }
        }
        if let Some(policy) = lookup("FUNCTION_CHECKER_ON_READINESS_TIMEOUT") {
            if let Ok(policy) = policy.parse() {
                self.readiness.on_timeout = policy;
            }
        }

        // Logging
        if let Some(level) = lookup("FUNCTION_CHECKER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("FUNCTION_CHECKER_LOG_JSON") {
            self.logging.json = json.parse().unwrap_or(false);
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validate the configuration
    ///
    /// Cluster-dependent checks (namespaces, storage class, capacity format)
    /// happen later, against the live cluster.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.namespace.is_empty() {
            return Err(ConfigError::Validation("namespace cannot be empty".to_string()));
        }
        if self.target.ingress_namespace.is_empty() {
            return Err(ConfigError::Validation(
                "ingress namespace is required".to_string(),
            ));
        }
        if self.manifest.name_prefix.is_empty() || self.manifest.component.is_empty() {
            return Err(ConfigError::Validation(
                "manifest name prefix and component label cannot be empty".to_string(),
            ));
        }
        if self.manifest.replicas < 1 {
            return Err(ConfigError::Validation(
                "replicas must be at least 1".to_string(),
            ));
        }
        if self.readiness.interval_secs == 0 || self.readiness.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "readiness timeout and interval must be positive".to_string(),
            ));
        }
        if self.readiness.timeout_secs > MAX_READINESS_SECS
            || self.readiness.interval_secs > MAX_READINESS_SECS
        {
            return Err(ConfigError::Validation(format!(
                "readiness timeout and interval cannot exceed {} seconds",
                MAX_READINESS_SECS
            )));
        }
        if self.probe.repeat == 0 || self.probe.expected.is_empty() {
            return Err(ConfigError::Validation(
                "probe needs a non-empty expected output and a positive repeat count".to_string(),
            ));
        }

        Ok(())
    }
}
