//! Kubernetes exec operations
//!
//! Runs a command in a container over the streaming `exec` sub-resource and
//! demultiplexes stdout, stderr and the status channel.

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::{K8sError, K8sResult};

/// Exec target and command
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub command: Vec<String>,
}

/// Output from an exec command
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
    /// Final status sent on the error channel, if any
    pub status: Option<Status>,
}

impl ExecOutput {
    /// Whether the remote side reported a failure on the status channel
    pub fn failed(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.status.as_deref())
            .map(|s| s != "Success")
            .unwrap_or(false)
    }

    /// Exit code of the remote command (0 for success, 1 when the failure
    /// carries no exit code cause)
    pub fn exit_code(&self) -> Option<i32> {
        let status = self.status.as_ref()?;
        if status.status.as_deref() == Some("Success") {
            return Some(0);
        }

        let from_causes = status
            .details
            .as_ref()
            .and_then(|d| d.causes.as_ref())
            .and_then(|causes| {
                causes
                    .iter()
                    .find(|c| c.reason.as_deref() == Some("ExitCode"))
                    .and_then(|c| c.message.as_deref())
                    .and_then(|m| m.trim().parse().ok())
            });

        Some(from_causes.unwrap_or(1))
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Execute a command in a container and collect its output
///
/// stdin stays closed; stdout and stderr are drained concurrently until the
/// remote command exits.
pub async fn exec_command(client: &K8sClient, request: &ExecRequest) -> K8sResult<ExecOutput> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), &request.namespace);

    let attach_params = AttachParams {
        container: request.container.clone(),
        tty: false,
        stdin: false,
        stdout: true,
        stderr: true,
        max_stdin_buf_size: Some(1024),
        max_stdout_buf_size: Some(1024 * 1024),
        max_stderr_buf_size: Some(1024 * 1024),
    };

    let mut attached = pods
        .exec(&request.pod, request.command.clone(), &attach_params)
        .await?;

    let status_rx = attached.take_status();
    let (stdout, stderr) = tokio::join!(
        read_stream(attached.stdout()),
        read_stream(attached.stderr())
    );
    let stdout = stdout.map_err(|e| K8sError::ExecError(format!("reading stdout: {}", e)))?;
    let stderr = stderr.map_err(|e| K8sError::ExecError(format!("reading stderr: {}", e)))?;

    let status = match status_rx {
        Some(rx) => rx.await,
        None => None,
    };

    attached
        .join()
        .await
        .map_err(|e| K8sError::ExecError(e.to_string()))?;

    Ok(ExecOutput {
        stdout,
        stderr,
        status,
    })
}

async fn read_stream<R>(reader: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
