//! In-cluster connectivity probe
//!
//! Runs the service checker script inside the first workload pod and
//! compares what it printed with the page every replica serves.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::kubernetes::exec::{self, ExecOutput, ExecRequest};
use crate::kubernetes::{K8sClient, K8sResult};

/// A check that either passes or fails
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> bool;

    /// Label used in logs and report entries
    fn describe(&self) -> String;
}

/// Output the probe must print: one page body per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutput {
    expected: String,
}

impl ExpectedOutput {
    pub fn repeated(page: &str, count: usize) -> Self {
        Self {
            expected: page.repeat(count),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.expected
    }

    /// Whole-buffer, case-insensitive equality
    pub fn matches(&self, stdout: &[u8]) -> bool {
        String::from_utf8_lossy(stdout).to_lowercase() == self.expected.to_lowercase()
    }
}

/// Probe backed by a pod `exec`
#[derive(Debug, Clone)]
pub struct ExecProbe {
    client: K8sClient,
    request: ExecRequest,
    expected: ExpectedOutput,
}

impl ExecProbe {
    pub fn new(client: K8sClient, request: ExecRequest, expected: ExpectedOutput) -> Self {
        Self {
            client,
            request,
            expected,
        }
    }
}

/// Decide the probe result from an exec attempt, logging why it failed
pub fn classify(result: K8sResult<ExecOutput>, expected: &ExpectedOutput) -> bool {
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "Error occurred while executing command in the pod");
            return false;
        }
    };

    if output.failed() {
        warn!(
            exit_code = ?output.exit_code(),
            stdout = %output.stdout_lossy(),
            stderr = %output.stderr_lossy(),
            "Command in the pod failed"
        );
        return false;
    }

    if expected.matches(&output.stdout) {
        return true;
    }

    warn!(
        expected = %expected.as_str(),
        stdout = %output.stdout_lossy(),
        stderr = %output.stderr_lossy(),
        "Unexpected probe output"
    );
    false
}

#[async_trait]
impl ConnectivityProbe for ExecProbe {
    async fn probe(&self) -> bool {
        info!(
            pod = %self.request.pod,
            command = %self.request.command.join(" "),
            "Testing service access from inside the cluster"
        );

        let result = exec::exec_command(&self.client, &self.request).await;
        classify(result, &self.expected)
    }

    fn describe(&self) -> String {
        format!("{}/pods/{}", self.request.namespace, self.request.pod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::K8sError;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;

    fn expected() -> ExpectedOutput {
        ExpectedOutput::repeated("it works!", 3)
    }

    fn output(stdout: &str, status: Option<&str>) -> ExecOutput {
        ExecOutput {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            status: status.map(|s| Status {
                status: Some(s.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_matches_whole_buffer_case_insensitively() {
        let e = expected();
        assert_eq!(e.as_str(), "it works!it works!it works!");
        assert!(e.matches(b"it works!it works!it works!"));
        assert!(e.matches(b"IT WORKS!it Works!it works!"));

        assert!(!e.matches(b"it works!it works!"));
        assert!(!e.matches(b"it works!it works!it works!it works!"));
        assert!(!e.matches(b"it works!it works!it works!\n"));
        assert!(!e.matches(b""));
    }

    #[test]
    fn test_classify() {
        let e = expected();
        let good = "it works!it works!it works!";

        assert!(classify(Ok(output(good, Some("Success"))), &e));
        assert!(classify(Ok(output(good, None)), &e));

        assert!(!classify(Ok(output(good, Some("Failure"))), &e));
        assert!(!classify(Ok(output("it works!", Some("Success"))), &e));
        assert!(!classify(Err(K8sError::ExecError("stream closed".to_string())), &e));
    }
}
