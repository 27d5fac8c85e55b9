//! function-checker CLI
//!
//! Verifies that a Kubernetes cluster can run a stateful workload with
//! persistent storage, route service traffic, and expose it through an
//! ingress.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use function_checker::discovery;
use function_checker::lifecycle::{
    AutoConfirm, ConfirmationPrompt, ExecProbe, ExpectedOutput, LinePrompt, ReadinessPoller,
    StatefulSetReplicas,
};
use function_checker::logging::LogSettings;
use function_checker::preflight;
use function_checker::{
    K8sClient, ManifestFactory, OperatorRegistry, Orchestrator, ShutdownCoordinator, Stages,
};
use function_checker_common::{CheckerConfig, TimeoutPolicy};

#[derive(Parser)]
#[command(name = "function-checker", author, version, long_about = None)]
#[command(about = "Create a configmap/statefulset/service/ingress to test if k8s works fine")]
struct Cli {
    /// Namespace to test kubernetes function in [default: default]
    #[arg(short, long)]
    namespace: Option<String>,

    /// Namespace where ingress-nginx is located (required)
    #[arg(short, long)]
    ingress_namespace: Option<String>,

    /// Storageclass to request storage from [default: cluster default]
    #[arg(short = 's', long = "storageclass")]
    storage_class: Option<String>,

    /// Capacity of each persistent volume, in Gi [default: 50Gi]
    #[arg(short, long)]
    capacity: Option<String>,

    /// Host to use in the ingress rule [default: nginx-test.js.sgcc.com.cn]
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Answer the ingress confirmation with 'y'
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Seconds to wait for the workload to become ready [default: 300]
    #[arg(long, value_name = "SECS")]
    readiness_timeout: Option<u64>,

    /// Seconds between readiness checks [default: 2]
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// What to do when readiness times out (proceed, skip-probe)
    #[arg(long, value_name = "POLICY")]
    on_readiness_timeout: Option<TimeoutPolicy>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    fn apply(&self, config: &mut CheckerConfig) {
        if let Some(ref ns) = self.namespace {
            config.target.namespace = ns.clone();
        }
        if let Some(ref ns) = self.ingress_namespace {
            config.target.ingress_namespace = ns.clone();
        }
        if let Some(ref sc) = self.storage_class {
            config.target.storage_class = Some(sc.clone());
        }
        if let Some(ref capacity) = self.capacity {
            config.target.capacity = capacity.clone();
        }
        if let Some(ref host) = self.host {
            config.target.host = host.clone();
        }
        if let Some(ref context) = self.context {
            config.target.context = Some(context.clone());
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if let Some(timeout) = self.readiness_timeout {
            config.readiness.timeout_secs = timeout;
        }
        if let Some(interval) = self.poll_interval {
            config.readiness.interval_secs = interval;
        }
        if let Some(policy) = self.on_readiness_timeout {
            config.readiness.on_timeout = policy;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // stdin may still be held by a blocking read; exit without waiting on it
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    if cli.print_config {
        print!("{}", CheckerConfig::generate_sample());
        return Ok(0);
    }

    let mut config = CheckerConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    LogSettings::from(&config.logging)
        .init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let client = K8sClient::from_default_kubeconfig(config.target.context.as_deref())
        .await
        .context("failed to build the Kubernetes client")?;
    info!(context = %client.context(), api_server = %client.api_server(), "Connected");

    let storage_class = preflight::verify(&client, &config.target).await?;

    let binding =
        discovery::discover_ingress_binding(&client, &config.target.ingress_namespace).await;
    if binding.is_none() {
        warn!(
            "Cannot find either a default ingressclass or an --ingress-class controller argument, \
             will not create ingress resource"
        );
    }

    let factory = ManifestFactory::new(&config, storage_class);
    let mut registry = OperatorRegistry::new();
    registry.add(factory.resources(binding.as_ref())?)?;

    let prompt: Box<dyn ConfirmationPrompt> = if cli.assume_yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(LinePrompt::stdio())
    };

    let stages = Stages {
        replicas: Box::new(StatefulSetReplicas::new(
            client.clone(),
            factory.namespace(),
            factory.stateful_set_name(),
        )),
        probe: Box::new(ExecProbe::new(
            client.clone(),
            factory.probe_request(),
            ExpectedOutput::repeated(factory.expected_output(), config.probe.repeat),
        )),
        prompt,
    };

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.listen();

    let outcome = Orchestrator::new(
        client,
        registry,
        stages,
        ReadinessPoller::from_config(&config.readiness),
        shutdown,
    )
    .with_timeout_policy(config.readiness.on_timeout)
    .with_ingress_host(factory.host())
    .run()
    .await;

    listener.abort();

    print!("{}", outcome.report());
    if outcome.is_interrupted() {
        warn!("Run interrupted, created resources were cleaned up");
    }

    Ok(outcome.exit_code())
}
