use crate::events::ServiceCommand;
use crate::logging::LogFilter;
use prompt_engine::{
    Deferred, DispatchError, Dispatcher, ElevationProvider, Messenger, PromptManager, PromptUi,
    PrompterConfig,
};
use protocol::control::{HostAction, HostEvent};
use protocol::{PromptView, Requester};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, mpsc};

/// Implements every host capability by broadcasting [`HostAction`]s to connected hosts.
#[derive(Clone)]
pub(crate) struct HostBridge {
    actions: broadcast::Sender<HostAction>,
}

impl HostBridge {
    pub(crate) fn new(actions: broadcast::Sender<HostAction>) -> Self {
        Self { actions }
    }

    fn emit(&self, action: HostAction) -> bool {
        match self.actions.send(action) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(event = "host.no_listener", action = ?err.0, "no host connected");
                false
            }
        }
    }
}

impl PromptUi for HostBridge {
    fn render(&self, requester: &Requester, view: PromptView) {
        self.emit(HostAction::Render {
            requester: requester.clone(),
            prompt: view,
        });
    }
}

impl Messenger for HostBridge {
    fn send_message(&self, requester: &Requester, text: &str) {
        self.emit(HostAction::Message {
            requester: requester.clone(),
            text: text.to_string(),
        });
    }
}

impl Dispatcher for HostBridge {
    fn dispatch(&self, requester: &Requester, command: &str) -> Result<(), DispatchError> {
        let action = HostAction::Dispatch {
            requester: requester.clone(),
            command: command.to_string(),
        };
        if self.emit(action) {
            Ok(())
        } else {
            Err(DispatchError::Unavailable("no host connected".to_string()))
        }
    }

    fn dispatch_with_attachment(
        &self,
        requester: &Requester,
        command: &str,
        duration_ticks: u64,
        permissions: &[String],
    ) -> Result<(), DispatchError> {
        let action = HostAction::DispatchWithAttachment {
            requester: requester.clone(),
            command: command.to_string(),
            duration_ticks,
            permissions: permissions.to_vec(),
        };
        if self.emit(action) {
            Ok(())
        } else {
            Err(DispatchError::Unavailable("no host connected".to_string()))
        }
    }
}

impl ElevationProvider for HostBridge {
    fn set_elevated(&self, requester: &Requester, elevated: bool) {
        self.emit(HostAction::SetElevated {
            requester: requester.clone(),
            elevated,
        });
    }
}

/// Owns the manager; every engine transition happens on this task.
pub(crate) async fn service_loop(
    mut manager: PromptManager,
    mut cmd_rx: mpsc::Receiver<ServiceCommand>,
    mut deferred_rx: mpsc::Receiver<Deferred>,
    actions: broadcast::Sender<HostAction>,
    config_path: PathBuf,
    log_filter: LogFilter,
) {
    loop {
        tokio::select! {
            Some(command) = cmd_rx.recv() => {
                match command {
                    ServiceCommand::Host { connection, event } => {
                        tracing::debug!(connection = %connection, host_event = ?event, "host event received");
                        handle_host_event(&mut manager, event, &actions, &config_path, &log_filter);
                    }
                    ServiceCommand::Shutdown(reply) => {
                        let dropped = manager.clear();
                        let _ = reply.send(dropped);
                        break;
                    }
                }
            }
            Some(task) = deferred_rx.recv() => {
                tracing::trace!(requester = %task.requester(), task = ?task, "deferred task due");
                manager.handle_deferred(task);
            }
            else => break,
        }
    }
    tracing::info!(event = "service.stopped", "service loop stopped");
}

fn handle_host_event(
    manager: &mut PromptManager,
    event: HostEvent,
    actions: &broadcast::Sender<HostAction>,
    config_path: &Path,
    log_filter: &LogFilter,
) {
    let reply = match event {
        HostEvent::Attempt { id, event } => {
            let outcome = manager.handle_attempt(&event);
            tracing::info!(
                event = "attempt.handled",
                id = %id,
                requester = %event.requester,
                origin = ?event.origin,
                outcome = ?outcome,
            );
            HostAction::AttemptHandled { id, outcome }
        }
        HostEvent::Answer { event } => {
            let consumed = manager.handle_answer(&event);
            tracing::debug!(requester = %event.requester, consumed, "answer handled");
            return;
        }
        HostEvent::Cancel { requester } => {
            let cancelled = manager.cancel(&requester);
            HostAction::Ack {
                message: if cancelled {
                    format!("cancelled sequence for {requester}")
                } else {
                    format!("no active sequence for {requester}")
                },
            }
        }
        HostEvent::Reload { clean } => reload(manager, config_path, clean, log_filter),
    };
    let _ = actions.send(reply);
}

fn reload(
    manager: &mut PromptManager,
    config_path: &Path,
    clean: bool,
    log_filter: &LogFilter,
) -> HostAction {
    let result = PrompterConfig::load(config_path)
        .and_then(|config| manager.reconfigure(config, clean));
    match result {
        Ok(()) => {
            log_filter.set_debug(manager.config().debug);
            HostAction::Ack {
                message: format!("reloaded {}", config_path.display()),
            }
        }
        Err(err) => {
            tracing::warn!(
                event = "config.reload_failed",
                path = %config_path.display(),
                error = %err,
                "reload failed, keeping running config"
            );
            HostAction::Error {
                message: format!("reload failed: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_engine::{ChannelScheduler, Collaborators};
    use protocol::{AnswerEvent, AttemptEvent, AttemptOutcome};
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tokio::sync::oneshot;
    use uuid::Uuid;

    struct Harness {
        cmd_tx: mpsc::Sender<ServiceCommand>,
        action_rx: broadcast::Receiver<HostAction>,
    }

    impl Harness {
        fn start(config: PrompterConfig, config_path: PathBuf) -> Self {
            let (actions, action_rx) = broadcast::channel(64);
            let (scheduler, deferred_rx) = ChannelScheduler::new(64);
            let bridge = Arc::new(HostBridge::new(actions.clone()));
            let collaborators = Collaborators::from_host(bridge, Arc::new(scheduler));
            let manager = PromptManager::new(config, collaborators).expect("manager");
            let (cmd_tx, cmd_rx) = mpsc::channel(16);
            tokio::spawn(service_loop(
                manager,
                cmd_rx,
                deferred_rx,
                actions,
                config_path,
                LogFilter::detached(),
            ));
            Self { cmd_tx, action_rx }
        }

        async fn send(&self, event: HostEvent) {
            self.cmd_tx
                .send(ServiceCommand::Host {
                    connection: Uuid::new_v4(),
                    event,
                })
                .await
                .expect("service running");
        }

        async fn next(&mut self) -> HostAction {
            self.action_rx.recv().await.expect("action")
        }
    }

    fn temp_config(contents: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("prompter-config-{nanos}.toml"));
        std::fs::write(&path, contents).expect("write config");
        path
    }

    fn steve() -> Requester {
        Requester::new("Steve")
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_answers_and_dispatch_flow_through_actions() {
        let mut harness = Harness::start(PrompterConfig::default(), PathBuf::from("unused.toml"));
        harness
            .send(HostEvent::Attempt {
                id: "a-1".to_string(),
                event: AttemptEvent::typed(steve(), "give -a  -p  10", false),
            })
            .await;
        assert_eq!(
            harness.next().await,
            HostAction::AttemptHandled {
                id: "a-1".to_string(),
                outcome: AttemptOutcome::Intercepted,
            }
        );
        assert!(matches!(
            harness.next().await,
            HostAction::Render {
                prompt: PromptView::Modal { .. },
                ..
            }
        ));

        harness
            .send(HostEvent::Answer {
                event: AnswerEvent::new(steve(), "diamond"),
            })
            .await;
        assert!(matches!(
            harness.next().await,
            HostAction::Render {
                prompt: PromptView::Selection { .. },
                ..
            }
        ));

        harness
            .send(HostEvent::Answer {
                event: AnswerEvent::new(steve(), "Steve"),
            })
            .await;
        assert_eq!(
            harness.next().await,
            HostAction::Dispatch {
                requester: steve(),
                command: "give diamond Steve 10".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_times_out_without_answers() {
        let mut config = PrompterConfig::default();
        config.prompt_timeout_secs = 1;
        let mut harness = Harness::start(config, PathBuf::from("unused.toml"));
        harness
            .send(HostEvent::Attempt {
                id: "a-2".to_string(),
                event: AttemptEvent::typed(steve(), "kick <-p Who>", false),
            })
            .await;
        assert!(matches!(harness.next().await, HostAction::AttemptHandled { .. }));
        assert!(matches!(harness.next().await, HostAction::Render { .. }));
        assert_eq!(
            harness.next().await,
            HostAction::Message {
                requester: steve(),
                text: "[Prompter] Prompt cancelled.".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_reload_are_acknowledged() {
        let path = temp_config("prompt_timeout_secs = 30\nstructured_input = true\n");
        let mut harness = Harness::start(PrompterConfig::default(), path.clone());

        harness.send(HostEvent::Cancel { requester: steve() }).await;
        assert_eq!(
            harness.next().await,
            HostAction::Ack {
                message: "no active sequence for Steve".to_string(),
            }
        );

        harness.send(HostEvent::Reload { clean: true }).await;
        assert!(matches!(harness.next().await, HostAction::Ack { .. }));

        std::fs::write(&path, "prompt_timeout_secs = 0\n").expect("rewrite config");
        harness.send(HostEvent::Reload { clean: false }).await;
        assert!(matches!(harness.next().await, HostAction::Error { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn shutdown_reports_dropped_sequences() {
        let mut harness = Harness::start(PrompterConfig::default(), PathBuf::from("unused.toml"));
        harness
            .send(HostEvent::Attempt {
                id: "a-3".to_string(),
                event: AttemptEvent::typed(steve(), "kick <-p Who>", false),
            })
            .await;
        assert!(matches!(harness.next().await, HostAction::AttemptHandled { .. }));

        let (tx, rx) = oneshot::channel();
        harness
            .cmd_tx
            .send(ServiceCommand::Shutdown(tx))
            .await
            .expect("service running");
        assert_eq!(rx.await.expect("reply"), 1);
    }

    #[test]
    fn dispatch_without_hosts_is_unavailable() {
        let (actions, receiver) = broadcast::channel(4);
        drop(receiver);
        let bridge = HostBridge::new(actions);
        let err = bridge.dispatch(&steve(), "spawn").expect_err("no receivers");
        assert!(matches!(err, DispatchError::Unavailable(_)));
    }
}
