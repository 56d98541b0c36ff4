//! lxdctl entry point.
//!
//! Connection settings come from the environment (see [`CliConfig`]); the
//! `--uri` flag overrides `LXD_URI`. Every command prints the server's
//! response envelope as JSON on stdout. Logs go to stderr.

mod cli;
mod config;

use clap::Parser;
use cli::{Args, Command};
use config::CliConfig;
use lxd_client::{
    extract_uuid, Envelope, ExecRequest, HypervisorApi, LxdClient, OperationRecord, OperationRef,
    OperationStatus, Query, StateChange,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Server-side wait used by `--wait`.
const WAIT_TIMEOUT_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("lxdctl={}", args.log_level).parse()?)
                .add_directive(format!("lxd_client={}", args.log_level).parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = CliConfig::from_env();
    if let Some(uri) = args.uri {
        config.uri = uri;
    }
    tracing::debug!(?config, "Configuration loaded");

    let client = LxdClient::new(config.api_config()?)?;
    tracing::info!(base_uri = %client.base_uri(), "Client configured");

    let envelope = run(&client, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if envelope.is_error() {
        anyhow::bail!(
            "server returned error {}: {}",
            envelope.error_code.unwrap_or_default(),
            envelope.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn run(client: &LxdClient, command: Command) -> anyhow::Result<Envelope> {
    let envelope = match command {
        Command::Apis => client.get_apis().await?,
        Command::Info => client.get_server_info().await?,
        Command::Containers => client.get_containers().await?,
        Command::Container { name } => client.get_container(&name, None).await?,
        Command::Images => client.get_images().await?,
        Command::Profiles => client.get_profiles().await?,
        Command::Networks => client.get_networks().await?,
        Command::Operations => client.get_operations(None).await?,
        Command::Operation { reference } => {
            client.get_operation(OperationRef::Id(&reference)).await?
        }
        Command::Wait { reference, timeout } => {
            let query = timeout.map(|t| Query::new().with("timeout", t));
            client
                .wait_operation(OperationRef::Id(&reference), query.as_ref())
                .await?
        }
        Command::State {
            name,
            action,
            timeout,
            force,
            wait,
        } => {
            let mut change = StateChange::new(action).force(force);
            change.timeout = timeout;
            let envelope = client
                .set_container_state(&name, serde_json::to_value(&change)?)
                .await?;
            finish(client, envelope, wait).await?
        }
        Command::Delete { name, wait } => {
            let envelope = client.delete_container(&name).await?;
            finish(client, envelope, wait).await?
        }
        Command::Exec {
            name,
            command,
            wait,
        } => {
            let request = ExecRequest::new(command);
            let envelope = client.exec(&name, serde_json::to_value(&request)?).await?;
            finish(client, envelope, wait).await?
        }
    };
    Ok(envelope)
}

/// Optionally wait on the operation an async response created.
async fn finish(client: &LxdClient, envelope: Envelope, wait: bool) -> anyhow::Result<Envelope> {
    if !wait || envelope.is_error() || !envelope.is_async() {
        return Ok(envelope);
    }

    let uuid = extract_uuid(&envelope)?;
    let query = Query::new().with("timeout", WAIT_TIMEOUT_SECS);
    let done = client
        .wait_operation(OperationRef::from(&envelope), Some(&query))
        .await?;
    let record = OperationRecord::from_envelope(uuid, &done);
    tracing::info!(uuid = %record.uuid, status = %record.status, "Operation wait returned");

    match record.status {
        OperationStatus::Failure | OperationStatus::Cancelled => {
            println!("{}", serde_json::to_string_pretty(&done)?);
            anyhow::bail!(
                "operation {} ended as {}: {}",
                record.uuid,
                record.status,
                record.error().unwrap_or("no error message")
            );
        }
        OperationStatus::Pending | OperationStatus::Running => {
            tracing::warn!(uuid = %record.uuid, "Operation still running after wait timeout");
        }
        OperationStatus::Success => {}
    }

    Ok(done)
}
