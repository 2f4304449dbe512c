use anyhow::Context;
use dotenv::dotenv;
use runner_container_step::ci::connectors::kubernetes::KubectlClient;
use runner_container_step::ci::HookInput;
use runner_container_step::{KubernetesConnector, RunnerConfig};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // stdout carries the step's container logs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ Container step failed: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> anyhow::Result<i32> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read hook input from stdin")?;

    let step = HookInput::from_json(&input)?.into_step()?;
    let config = Arc::new(RunnerConfig::from_env()?);
    let client = Arc::new(KubectlClient::from_config(&config));
    let connector = KubernetesConnector::new(config, client);

    let exit_code = connector.run_container_step(&step).await?;
    info!("🏁 Step exit code: {}", exit_code);
    Ok(exit_code)
}
