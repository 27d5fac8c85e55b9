mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{paths, ApiMock, MockConfig};
use function_checker::kubernetes::workloads::ReplicaCounts;
use function_checker::kubernetes::{K8sClient, K8sError, K8sResult};
use function_checker::lifecycle::{
    AutoConfirm, ConfirmationPrompt, ConnectivityProbe, ExecProbe, ExpectedOutput, LinePrompt,
    ReadinessPoller, ReplicaSource, RunError, RunOutcome, Stage, StatefulSetReplicas,
};
use function_checker::manifests::IngressBinding;
use function_checker::{ManifestFactory, OperatorRegistry, Orchestrator, ShutdownCoordinator, Stages};
use function_checker_common::{CheckerConfig, TimeoutPolicy};
use http::Method;
use k8s_openapi::api::apps::v1::StatefulSetStatus;

struct Replicas {
    ready: bool,
    interrupt_on_fetch: Option<ShutdownCoordinator>,
}

#[async_trait]
impl ReplicaSource for Replicas {
    async fn replica_counts(&self) -> K8sResult<ReplicaCounts> {
        if let Some(trigger) = &self.interrupt_on_fetch {
            trigger.shutdown();
        }
        Ok(ReplicaCounts {
            declared: 3,
            ready: if self.ready { 3 } else { 0 },
        })
    }

    fn describe(&self) -> String {
        "default/statefulsets/k8s-function-checker-sts".to_string()
    }
}

struct FixedProbe {
    result: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ConnectivityProbe for FixedProbe {
    async fn probe(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }

    fn describe(&self) -> String {
        "default/pods/k8s-function-checker-sts-0".to_string()
    }
}

struct CountingPrompt {
    answer: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ConfirmationPrompt for CountingPrompt {
    async fn confirm(&mut self, _question: &str) -> std::io::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

/// Raises shutdown and then waits for an answer that never comes
struct HangingPrompt {
    trigger: ShutdownCoordinator,
}

#[async_trait]
impl ConfirmationPrompt for HangingPrompt {
    async fn confirm(&mut self, _question: &str) -> std::io::Result<bool> {
        self.trigger.shutdown();
        std::future::pending().await
    }
}

struct Harness {
    ready: bool,
    probe_result: bool,
    with_ingress: bool,
    interrupt_on_fetch: Option<ShutdownCoordinator>,
    prompt: Option<Box<dyn ConfirmationPrompt>>,
    policy: TimeoutPolicy,
    timeout: Duration,
    probe_calls: Arc<AtomicUsize>,
    prompt_calls: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            ready: true,
            probe_result: true,
            with_ingress: true,
            interrupt_on_fetch: None,
            prompt: None,
            policy: TimeoutPolicy::Proceed,
            timeout: Duration::from_millis(200),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            prompt_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn orchestrator(&mut self, client: K8sClient, shutdown: ShutdownCoordinator) -> Orchestrator {
        let mut config = CheckerConfig::default();
        config.target.ingress_namespace = "ingress-nginx".to_string();
        let factory = ManifestFactory::new(&config, "standard");

        let binding = IngressBinding::ClassName("nginx".to_string());
        let mut registry = OperatorRegistry::new();
        registry
            .add(
                factory
                    .resources(self.with_ingress.then_some(&binding))
                    .unwrap(),
            )
            .unwrap();

        let prompt = self.prompt.take().unwrap_or_else(|| {
            Box::new(CountingPrompt {
                answer: true,
                calls: self.prompt_calls.clone(),
            }) as Box<dyn ConfirmationPrompt>
        });

        let stages = Stages {
            replicas: Box::new(Replicas {
                ready: self.ready,
                interrupt_on_fetch: self.interrupt_on_fetch.clone(),
            }),
            probe: Box::new(FixedProbe {
                result: self.probe_result,
                calls: self.probe_calls.clone(),
            }),
            prompt,
        };

        let poller = ReadinessPoller::new(self.timeout, Duration::from_millis(10));
        Orchestrator::new(client, registry, stages, poller, shutdown)
            .with_timeout_policy(self.policy)
            .with_ingress_host(factory.host())
    }

    async fn run(&mut self, config: MockConfig) -> (RunOutcome, ApiMock) {
        let (client, mock) = ApiMock::start(config);
        let outcome = self.orchestrator(client, ShutdownCoordinator::new()).run().await;
        (outcome, mock)
    }
}

#[tokio::test]
async fn test_happy_path_with_ingress() {
    let mut harness = Harness::new();
    let (outcome, mock) = harness.run(MockConfig::new()).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 0);
    let report = outcome.report();
    assert!(report.is_clean(), "{}", report);
    assert_eq!(report.error_count(), 0);
    assert!(report.tags().is_empty());

    assert_eq!(mock.count(Method::POST), 4);
    // four resources plus the claim collection
    assert_eq!(mock.count(Method::DELETE), 5);
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.prompt_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_without_ingress_skips_confirmation() {
    let mut harness = Harness::new();
    harness.with_ingress = false;
    let (outcome, mock) = harness.run(MockConfig::new()).await;

    let report = outcome.report();
    assert!(report.is_clean());
    assert!(report.has_tag("no ingress"));
    assert_eq!(mock.count(Method::POST), 3);
    assert_eq!(mock.count(Method::DELETE), 4);
    assert_eq!(harness.prompt_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_probe_failure_is_recorded() {
    let mut harness = Harness::new();
    harness.probe_result = false;
    let (outcome, mock) = harness.run(MockConfig::new()).await;

    assert_eq!(outcome.exit_code(), 0);
    let report = outcome.report();
    assert_eq!(report.error_count(), 1);
    assert!(matches!(
        report.errors_in(Stage::Probe).next(),
        Some(RunError::ProbeFailed { .. })
    ));
    assert_eq!(mock.count(Method::DELETE), 5);
}

#[tokio::test]
async fn test_user_rejection_after_reprompt() {
    let mut harness = Harness::new();
    harness.prompt = Some(Box::new(LinePrompt::new(&b"maybe\nN\n"[..], tokio::io::sink())));
    let (outcome, _mock) = harness.run(MockConfig::new()).await;

    let report = outcome.report();
    assert_eq!(report.error_count(), 1);
    assert!(matches!(
        report.errors_in(Stage::Ingress).next(),
        Some(RunError::UserRejection { host }) if host == "nginx-test.js.sgcc.com.cn"
    ));
}

#[tokio::test]
async fn test_create_errors_are_reported_and_run_continues() {
    let mut harness = Harness::new();
    let config = MockConfig::new().fail(Method::POST, "/ingresses", 409);
    let (outcome, mock) = harness.run(config).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    let report = outcome.report();
    assert_eq!(report.errors_in(Stage::Create).count(), 1);
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 1);
    // the ingress was never created, so it is not deleted
    assert!(!mock
        .paths(Method::DELETE)
        .iter()
        .any(|p| p.contains("/ingresses/")));
}

#[tokio::test]
async fn test_readiness_timeout_proceeds_by_default() {
    let mut harness = Harness::new();
    harness.ready = false;
    let (outcome, _mock) = harness.run(MockConfig::new()).await;

    let report = outcome.report();
    assert!(report.is_clean());
    assert!(report.has_tag("readiness timed out"));
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_readiness_timeout_can_skip_probe() {
    let mut harness = Harness::new();
    harness.ready = false;
    harness.policy = TimeoutPolicy::SkipProbe;
    let (outcome, mock) = harness.run(MockConfig::new()).await;

    let report = outcome.report();
    assert_eq!(report.error_count(), 1);
    assert!(matches!(
        report.errors_in(Stage::Readiness).next(),
        Some(RunError::ReadinessTimeout { .. })
    ));
    assert!(report.has_tag("probe skipped"));
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.count(Method::DELETE), 5);
}

#[tokio::test]
async fn test_unbounded_readiness_timeout_still_cleans_up() {
    let mut harness = Harness::new();
    harness.timeout = Duration::MAX;
    let (outcome, mock) = harness.run(MockConfig::new()).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert!(outcome.report().is_clean());
    assert_eq!(mock.count(Method::POST), 4);
    assert_eq!(mock.count(Method::DELETE), 5);
}

#[tokio::test]
async fn test_interrupt_during_create_cleans_up_created_only() {
    let shutdown = ShutdownCoordinator::new();
    let trigger = shutdown.clone();
    // the signal lands while the service create is in flight
    let config = MockConfig::new().on_request(move |call| {
        if call.is(Method::POST, "/services") {
            trigger.shutdown();
        }
    });

    let (client, mock) = ApiMock::start(config);
    let mut harness = Harness::new();
    let outcome = harness.orchestrator(client, shutdown).run().await;

    assert!(outcome.is_interrupted());
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(mock.paths(Method::POST), vec![paths::CONFIGMAPS, paths::SERVICES]);
    assert_eq!(
        mock.paths(Method::DELETE),
        vec![
            paths::named(paths::CONFIGMAPS, "k8s-function-checker-cm"),
            paths::named(paths::SERVICES, "k8s-function-checker-svc"),
        ]
    );
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_interrupt_during_readiness_wait() {
    let shutdown = ShutdownCoordinator::new();

    let (client, mock) = ApiMock::start(MockConfig::new());
    let mut harness = Harness::new();
    harness.ready = false;
    harness.interrupt_on_fetch = Some(shutdown.clone());
    let outcome = harness.orchestrator(client, shutdown).run().await;

    assert!(outcome.is_interrupted());
    assert!(outcome.report().is_clean());
    assert_eq!(mock.count(Method::DELETE), 5);
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.prompt_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_interrupt_during_prompt() {
    let shutdown = ShutdownCoordinator::new();

    let (client, mock) = ApiMock::start(MockConfig::new());
    let mut harness = Harness::new();
    harness.prompt = Some(Box::new(HangingPrompt {
        trigger: shutdown.clone(),
    }));
    let outcome = harness.orchestrator(client, shutdown).run().await;

    assert!(outcome.is_interrupted());
    assert!(outcome.report().is_clean());
    assert_eq!(harness.probe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.count(Method::DELETE), 5);
}

#[tokio::test]
async fn test_auto_confirm_accepts_ingress() {
    let mut harness = Harness::new();
    harness.prompt = Some(Box::new(AutoConfirm(true)));
    let (outcome, _mock) = harness.run(MockConfig::new()).await;
    assert!(outcome.report().is_clean());
}

#[tokio::test]
async fn test_exec_probe_transport_error_is_false() {
    let (client, _mock) = ApiMock::start(MockConfig::new());

    let mut config = CheckerConfig::default();
    config.target.ingress_namespace = "ingress-nginx".to_string();
    let factory = ManifestFactory::new(&config, "standard");

    let probe = ExecProbe::new(
        client,
        factory.probe_request(),
        ExpectedOutput::repeated("it works!", 3),
    );
    assert!(!probe.probe().await);
    assert_eq!(probe.describe(), "default/pods/k8s-function-checker-sts-0");
}

#[tokio::test]
async fn test_statefulset_replicas_from_api() {
    let mut config = CheckerConfig::default();
    config.target.ingress_namespace = "ingress-nginx".to_string();
    let factory = ManifestFactory::new(&config, "standard");

    let mut sts = factory.stateful_set();
    sts.status = Some(StatefulSetStatus {
        replicas: 3,
        ready_replicas: Some(2),
        ..Default::default()
    });

    let mock_config = MockConfig::new().object(
        &paths::named(paths::STATEFULSETS, "k8s-function-checker-sts"),
        serde_json::to_value(&sts).unwrap(),
    );
    let (client, _mock) = ApiMock::start(mock_config);

    let source = StatefulSetReplicas::new(client.clone(), "default", "k8s-function-checker-sts");
    let counts = source.replica_counts().await.unwrap();
    assert_eq!(counts, ReplicaCounts { declared: 3, ready: 2 });

    let missing = StatefulSetReplicas::new(client, "default", "absent");
    let err: K8sError = missing.replica_counts().await.unwrap_err();
    assert!(err.is_not_found());
}
