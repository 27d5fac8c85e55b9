//! Common types shared by the function-checker library and binary

pub mod config;

pub use config::{
    CheckerConfig, ConfigError, LoggingConfig, ManifestConfig, ProbeConfig, ReadinessConfig,
    TargetConfig, TimeoutPolicy,
};
