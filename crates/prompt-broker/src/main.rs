mod cli;
mod events;
mod logging;
mod server;
mod service;

use crate::cli::Args;
use crate::events::ServiceCommand;
use crate::logging::init_tracing;
use crate::server::spawn_accept_loop;
use crate::service::{service_loop, HostBridge};
use anyhow::Context;
use clap::Parser;
use prompt_engine::{ChannelScheduler, Collaborators, PromptManager, PrompterConfig};
use protocol::control::HostAction;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};

const ACTION_BUFFER: usize = 256;
const DEFERRED_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 128;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = PrompterConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let (_file_guard, log_filter) = init_tracing(&args.log_dir, args.log_to_stderr, config.debug)?;

    let (actions, _) = broadcast::channel::<HostAction>(ACTION_BUFFER);
    let (scheduler, deferred_rx) = ChannelScheduler::new(DEFERRED_BUFFER);
    let bridge = Arc::new(HostBridge::new(actions.clone()));
    let manager = PromptManager::new(config, Collaborators::from_host(bridge, Arc::new(scheduler)))
        .context("failed to start prompt manager")?;

    let listener = TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;
    tracing::info!(event = "host.listener.bound", addr = %args.listen_addr);

    let (cmd_tx, cmd_rx) = mpsc::channel::<ServiceCommand>(COMMAND_BUFFER);
    spawn_accept_loop(listener, cmd_tx.clone(), actions.clone());
    let service = tokio::spawn(service_loop(
        manager,
        cmd_rx,
        deferred_rx,
        actions,
        args.config.clone(),
        log_filter,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!(event = "broker.shutdown", "shutting down");
    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx.send(ServiceCommand::Shutdown(reply_tx)).await.is_ok() {
        if let Ok(dropped) = reply_rx.await {
            tracing::info!(event = "broker.sequences_dropped", dropped);
        }
    }
    service.await.context("service loop panicked")?;
    Ok(())
}
