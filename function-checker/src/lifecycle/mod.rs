//! Lifecycle orchestration
//!
//! One pass per invocation: create -> wait for readiness -> probe ->
//! confirm ingress -> report. Cleanup runs exactly once at the end, whether
//! the pass completed or was interrupted.

pub mod probe;
pub mod prompt;
pub mod readiness;
pub mod report;

use function_checker_common::TimeoutPolicy;
use tracing::{info, warn};

use crate::kubernetes::K8sClient;
use crate::resources::OperatorRegistry;
use crate::shutdown::ShutdownCoordinator;

pub use probe::{ConnectivityProbe, ExecProbe, ExpectedOutput};
pub use prompt::{AutoConfirm, ConfirmationPrompt, LinePrompt};
pub use readiness::{ReadinessOutcome, ReadinessPoller, ReplicaSource, StatefulSetReplicas};
pub use report::{RunError, RunReport, Stage};

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage ran and the report was produced
    Completed(RunReport),
    /// Shutdown was requested; cleanup still ran
    Interrupted(RunReport),
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Interrupted(report) => report,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunOutcome::Interrupted(_))
    }

    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Interrupted(_) => 130,
        }
    }
}

/// Pluggable collaborators of the verify stages
pub struct Stages {
    pub replicas: Box<dyn ReplicaSource>,
    pub probe: Box<dyn ConnectivityProbe>,
    pub prompt: Box<dyn ConfirmationPrompt>,
}

/// Returned by a stage when shutdown was observed
#[derive(Debug)]
struct Interrupted;

/// Drives one lifecycle pass over a populated registry
pub struct Orchestrator {
    client: K8sClient,
    registry: OperatorRegistry,
    stages: Stages,
    poller: ReadinessPoller,
    on_timeout: TimeoutPolicy,
    host: String,
    shutdown: ShutdownCoordinator,
}

impl Orchestrator {
    pub fn new(
        client: K8sClient,
        registry: OperatorRegistry,
        stages: Stages,
        poller: ReadinessPoller,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            client,
            registry,
            stages,
            poller,
            on_timeout: TimeoutPolicy::default(),
            host: String::new(),
            shutdown,
        }
    }

    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.on_timeout = policy;
        self
    }

    /// Host the operator is asked to open when an ingress is registered
    pub fn with_ingress_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    fn has_ingress(&self) -> bool {
        self.registry.contains_kind("ingresses")
    }

    fn checkpoint(&self, next: Stage) -> Result<(), Interrupted> {
        if self.shutdown.is_shutting_down() {
            warn!(stage = %next, "Interrupted, skipping remaining stages");
            return Err(Interrupted);
        }
        Ok(())
    }

    /// Run every stage, then clean up
    pub async fn run(mut self) -> RunOutcome {
        let mut report = RunReport::new();

        info!(resources = self.registry.len(), "Start to verify k8s function");
        let interrupted = self.run_stages(&mut report).await.is_err();

        self.cleanup(&mut report).await;

        if interrupted {
            RunOutcome::Interrupted(report)
        } else {
            RunOutcome::Completed(report)
        }
    }

    async fn run_stages(&mut self, report: &mut RunReport) -> Result<(), Interrupted> {
        self.checkpoint(Stage::Create)?;
        self.create(report).await;

        self.checkpoint(Stage::Readiness)?;
        let run_probe = self.wait_ready(report).await?;

        self.checkpoint(Stage::Probe)?;
        if run_probe {
            self.probe(report).await;
        } else {
            report.tag("connectivity probe skipped");
        }

        self.checkpoint(Stage::Ingress)?;
        self.confirm_ingress(report).await
    }

    async fn create(&mut self, report: &mut RunReport) {
        let shutdown = self.shutdown.clone();
        let result = self
            .registry
            .create_all_until(&self.client, || shutdown.is_shutting_down())
            .await;

        if let Err(aggregate) = result {
            for error in aggregate.into_errors() {
                report.record(Stage::Create, RunError::Create(error));
            }
        }
    }

    /// Returns whether the probe should run
    async fn wait_ready(&mut self, report: &mut RunReport) -> Result<bool, Interrupted> {
        let outcome = self
            .poller
            .wait(self.stages.replicas.as_ref(), &self.shutdown)
            .await;

        match outcome {
            ReadinessOutcome::Ready { .. } => Ok(true),
            ReadinessOutcome::Cancelled { .. } => Err(Interrupted),
            ReadinessOutcome::TimedOut { ticks } => match self.on_timeout {
                TimeoutPolicy::Proceed => {
                    report.tag(format!(
                        "readiness timed out after {} checks, probe ran anyway",
                        ticks
                    ));
                    Ok(true)
                }
                TimeoutPolicy::SkipProbe => {
                    report.record(
                        Stage::Readiness,
                        RunError::ReadinessTimeout {
                            workload: self.stages.replicas.describe(),
                            timeout: self.poller.timeout(),
                        },
                    );
                    Ok(false)
                }
            },
        }
    }

    async fn probe(&mut self, report: &mut RunReport) {
        if self.stages.probe.probe().await {
            info!("Access service from internal successfully");
        } else {
            warn!("Access service from internal failed");
            report.record(
                Stage::Probe,
                RunError::ProbeFailed {
                    target: self.stages.probe.describe(),
                },
            );
        }
    }

    async fn confirm_ingress(&mut self, report: &mut RunReport) -> Result<(), Interrupted> {
        if !self.has_ingress() {
            report.tag("no ingress created, ingress check skipped");
            return Ok(());
        }

        info!(host = %self.host, "Waiting for user to access the ingress from a browser");
        let question = format!(
            "Open http://{}/ in a browser. Was the page reachable?",
            self.host
        );

        let answer = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(Interrupted),
            answer = self.stages.prompt.confirm(&question) => answer,
        };

        match answer {
            Ok(true) => info!("Ingress access test successful"),
            Ok(false) => {
                warn!("Ingress access test failed");
                report.record(
                    Stage::Ingress,
                    RunError::UserRejection {
                        host: self.host.clone(),
                    },
                );
            }
            Err(e) => report.record(Stage::Ingress, RunError::Prompt(e)),
        }

        Ok(())
    }

    async fn cleanup(&mut self, report: &mut RunReport) {
        info!(created = self.registry.created_count(), "Cleaning up resources");

        if let Err(aggregate) = self.registry.delete_all(&self.client).await {
            for error in aggregate.into_errors() {
                report.record(Stage::Cleanup, RunError::Delete(error));
            }
        }
    }
}
