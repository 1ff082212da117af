use crate::events::ServiceCommand;
use anyhow::Context;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use protocol::control::{HostAction, HostEvent};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use uuid::Uuid;

pub(crate) fn spawn_accept_loop(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServiceCommand>,
    actions: broadcast::Sender<HostAction>,
) {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let cmd_tx = cmd_tx.clone();
                    let action_rx = actions.subscribe();
                    tokio::spawn(async move {
                        let connection = Uuid::new_v4();
                        tracing::info!(event = "host.conn.accepted", peer = %peer, connection = %connection);
                        if let Err(err) =
                            handle_connection(stream, connection, peer, cmd_tx, action_rx).await
                        {
                            tracing::warn!(
                                event = "host.conn.error",
                                peer = %peer,
                                connection = %connection,
                                error = %err,
                                "host connection failed"
                            );
                        }
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        event = "host.listener.accept_failed",
                        error = %err,
                        "host listener accept failed"
                    );
                }
            }
        }
    });
}

pub(crate) async fn handle_connection<S>(
    stream: S,
    connection: Uuid,
    peer: SocketAddr,
    cmd_tx: mpsc::Sender<ServiceCommand>,
    mut action_rx: broadcast::Receiver<HostAction>,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(protocol::framing::MAX_FRAME_LENGTH)
        .new_codec();
    let mut framed = Framed::new(stream, codec);
    loop {
        tokio::select! {
            frame = framed.next() => {
                let Some(frame) = frame else {
                    break;
                };
                let bytes = frame.context("read frame")?;
                let event: HostEvent = match serde_json::from_slice(&bytes) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(
                            event = "host.event.invalid",
                            peer = %peer,
                            connection = %connection,
                            error = %err,
                            "invalid host event"
                        );
                        let action = HostAction::Error {
                            message: format!("invalid event: {err}"),
                        };
                        send_action(&mut framed, &action).await?;
                        continue;
                    }
                };
                if cmd_tx.send(ServiceCommand::Host { connection, event }).await.is_err() {
                    let action = HostAction::Error {
                        message: "service unavailable".to_string(),
                    };
                    send_action(&mut framed, &action).await?;
                    break;
                }
            }
            action = action_rx.recv() => match action {
                Ok(action) => send_action(&mut framed, &action).await?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        event = "host.conn.lagged",
                        connection = %connection,
                        skipped,
                        "host connection fell behind, closing it"
                    );
                    anyhow::bail!("host connection lagged, {skipped} actions dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    tracing::info!(event = "host.conn.closed", peer = %peer, connection = %connection);
    Ok(())
}

async fn send_action<S>(
    framed: &mut Framed<S, LengthDelimitedCodec>,
    action: &HostAction,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(action)?;
    framed.send(Bytes::from(payload)).await?;
    Ok(())
}
