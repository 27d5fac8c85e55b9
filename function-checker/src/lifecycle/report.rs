//! Run report
//!
//! Append-only record of every soft failure of a run, plus tags noting
//! deviations that are not errors.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::resources::ResourceError;

/// Stage of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Create,
    Readiness,
    Probe,
    Ingress,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Create,
        Stage::Readiness,
        Stage::Probe,
        Stage::Ingress,
        Stage::Cleanup,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Create => "create",
            Stage::Readiness => "readiness",
            Stage::Probe => "probe",
            Stage::Ingress => "ingress",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// A soft failure recorded in the report
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Create(ResourceError),

    #[error("{workload} did not become ready within {timeout:?}")]
    ReadinessTimeout { workload: String, timeout: Duration },

    #[error("service is not reachable from {target}")]
    ProbeFailed { target: String },

    #[error("ingress host {host} was reported unreachable")]
    UserRejection { host: String },

    #[error("confirmation prompt failed: {0}")]
    Prompt(#[from] std::io::Error),

    #[error(transparent)]
    Delete(ResourceError),
}

/// Errors and tags collected over one run
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<(Stage, RunError)>,
    tags: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, error: RunError) {
        tracing::warn!(stage = %stage, error = %error, "Recorded failure");
        self.entries.push((stage, error));
    }

    pub fn tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        tracing::info!(tag = %tag, "Report tagged");
        self.tags.push(tag);
    }

    pub fn error_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors_in(&self, stage: Stage) -> impl Iterator<Item = &RunError> {
        self.entries
            .iter()
            .filter(move |(s, _)| *s == stage)
            .map(|(_, e)| e)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, needle: &str) -> bool {
        self.tags.iter().any(|t| t.contains(needle))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            writeln!(f, "All function tests passed")?;
        } else {
            writeln!(f, "Function test finished with {} error(s)", self.error_count())?;
            for stage in Stage::ALL {
                let mut errors = self.errors_in(stage).peekable();
                if errors.peek().is_none() {
                    continue;
                }
                writeln!(f, "  [{}]", stage)?;
                for error in errors {
                    writeln!(f, "    - {}", error)?;
                }
            }
        }

        for tag in &self.tags {
            writeln!(f, "  note: {}", tag)?;
        }

        Ok(())
    }
}
