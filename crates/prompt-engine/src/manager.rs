//! Must be driven from a single task; timers come back as [`Deferred`] tasks checked
//! against the queue's [`SequenceToken`].

use std::collections::BTreeSet;

use protocol::{AnswerEvent, AttemptEvent, AttemptOutcome, Requester};

use crate::config::PrompterConfig;
use crate::error::ConfigError;
use crate::interceptor::{interceptor_for, CommandInterceptor};
use crate::parser::PromptParser;
use crate::ports::Collaborators;
use crate::prompt::PromptKinds;
use crate::queue::{PromptQueue, SequenceToken};
use crate::registry::PromptRegistry;
use crate::scheduler::Deferred;

pub struct PromptManager {
    config: PrompterConfig,
    parser: PromptParser,
    registry: PromptRegistry,
    interceptor: Box<dyn CommandInterceptor>,
    host: Collaborators,
    unknown_keys: BTreeSet<String>,
}

impl PromptManager {
    pub fn new(config: PrompterConfig, host: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let parser = build_parser(&config)?;
        let interceptor = interceptor_for(&config.interception);
        Ok(Self {
            config,
            parser,
            registry: PromptRegistry::new(),
            interceptor,
            host,
            unknown_keys: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &PrompterConfig {
        &self.config
    }

    pub fn parser(&self) -> &PromptParser {
        &self.parser
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn is_prompting(&self, requester: &Requester) -> bool {
        self.registry.contains(requester)
    }

    pub fn active_requesters(&self) -> Vec<Requester> {
        self.registry.requesters()
    }

    pub fn handle_attempt(&mut self, event: &AttemptEvent) -> AttemptOutcome {
        if !self.interceptor.intercepts(event) || !self.parser.is_promptable(&event.text) {
            return AttemptOutcome::PassThrough;
        }
        if self.registry.contains(&event.requester) {
            tracing::info!(
                event = "sequence.rejected",
                requester = %event.requester,
                "requester is already answering a prompt"
            );
            self.notify(&event.requester, &self.config.messages.already_prompting);
            return AttemptOutcome::Rejected;
        }
        self.arm(&event.requester, &event.text, event.is_op);
        AttemptOutcome::Intercepted
    }

    /// Starts a sequence for `requester`, replacing any queue it still had.
    pub fn arm(&mut self, requester: &Requester, template: &str, was_elevated: bool) -> SequenceToken {
        let queue = self.parser.parse(template, requester, was_elevated);
        if !queue.unknown_keys().is_empty() {
            tracing::debug!(
                requester = %requester,
                keys = ?queue.unknown_keys(),
                "template uses unregistered prompt keys"
            );
            self.unknown_keys.extend(queue.unknown_keys().iter().cloned());
        }
        let token = queue.token();
        let steps = queue.len();
        let elevation = queue.elevation_requested();
        let attachment = queue.use_attachment();

        if let Some(previous) = self.registry.register(requester.clone(), queue) {
            tracing::warn!(
                event = "sequence.replaced",
                requester = %requester,
                previous = %previous.token(),
                pending = previous.len(),
                "active sequence replaced"
            );
        }
        tracing::info!(
            event = "sequence.armed",
            requester = %requester,
            token = %token,
            steps,
            elevation,
            attachment,
            timeout = %humantime::format_duration(self.config.prompt_timeout()),
            "sequence armed"
        );

        let scheduler = &self.host.scheduler;
        scheduler.schedule(
            self.config.prompt_timeout(),
            Deferred::Timeout {
                requester: requester.clone(),
                token,
            },
        );
        scheduler.schedule(
            self.config.render_delay(),
            Deferred::Render {
                requester: requester.clone(),
                token,
            },
        );
        token
    }

    /// Feeds one answer to the front step. Returns whether the answer was consumed.
    pub fn handle_answer(&mut self, event: &AnswerEvent) -> bool {
        let requester = &event.requester;
        let Some(queue) = self.registry.get_mut(requester) else {
            tracing::debug!(requester = %requester, "answer without active sequence ignored");
            return false;
        };
        if event.text.trim().eq_ignore_ascii_case(&self.config.cancel_keyword) {
            self.cancel_with_reason(requester, "keyword");
            return true;
        }
        let token = queue.token();
        let Some(front) = queue.front() else {
            tracing::debug!(requester = %requester, token = %token, "answer for drained queue ignored");
            return false;
        };

        match front.accept(&event.text) {
            Ok(answer) => {
                queue.answer_front(answer);
            }
            Err(rejected) => {
                tracing::debug!(
                    event = "answer.rejected",
                    requester = %requester,
                    token = %token,
                    reason = %rejected,
                    "answer rejected"
                );
                self.notify(requester, &self.config.messages.invalid_answer);
                self.schedule_render(requester, token);
                return true;
            }
        }

        if queue.is_empty() {
            if let Some(queue) = self.registry.unregister(requester) {
                self.complete(requester, queue);
            }
        } else {
            self.schedule_render(requester, token);
        }
        true
    }

    /// Drops the active sequence of `requester`. A second call is a no-op.
    pub fn cancel(&mut self, requester: &Requester) -> bool {
        self.cancel_with_reason(requester, "explicit")
    }

    pub fn handle_deferred(&mut self, task: Deferred) {
        match task {
            Deferred::Render { requester, token } => self.render(&requester, token),
            Deferred::Timeout { requester, token } => {
                let current = self.registry.get(&requester).map(PromptQueue::token);
                if current == Some(token) {
                    self.cancel_with_reason(&requester, "timeout");
                } else {
                    tracing::debug!(
                        event = "sequence.stale_timeout",
                        requester = %requester,
                        token = %token,
                        "timeout for finished sequence ignored"
                    );
                }
            }
            Deferred::Revoke { requester } => {
                tracing::debug!(event = "elevation.revoke_retry", requester = %requester);
                self.host.elevation.set_elevated(&requester, false);
            }
        }
    }

    /// Applies a reloaded configuration. On error the running configuration stays.
    pub fn reconfigure(&mut self, config: PrompterConfig, clean: bool) -> Result<(), ConfigError> {
        config.validate()?;
        let parser = build_parser(&config)?;
        let interception_changed = config.interception.enable_unsafe
            != self.config.interception.enable_unsafe
            || config.interception.activation_delay_ms
                != self.config.interception.activation_delay_ms;
        if interception_changed {
            self.interceptor = interceptor_for(&config.interception);
        }
        self.parser = parser;
        self.config = config;

        let kinds = self.parser.kinds();
        self.unknown_keys.retain(|key| !kinds.contains(key));
        if !self.unknown_keys.is_empty() {
            tracing::warn!(
                event = "prompt.unknown_keys",
                keys = ?self.unknown_keys,
                "templates used prompt keys that are still unregistered"
            );
        }
        if clean {
            self.clear();
        }
        tracing::info!(
            event = "config.reloaded",
            clean,
            interceptor = self.interceptor.name(),
            active = self.registry.len(),
            "configuration applied"
        );
        Ok(())
    }

    /// Drops every sequence without notifying anyone.
    pub fn clear(&mut self) -> usize {
        let dropped = self.registry.clear();
        if dropped > 0 {
            tracing::info!(event = "registry.cleared", dropped, "active sequences dropped");
        }
        dropped
    }

    fn render(&self, requester: &Requester, token: SequenceToken) {
        let front = self
            .registry
            .get(requester)
            .filter(|queue| queue.token() == token)
            .and_then(PromptQueue::front);
        match front {
            Some(prompt) => {
                tracing::debug!(
                    requester = %requester,
                    token = %token,
                    kind = prompt.kind(),
                    slot = prompt.spec().slot,
                    "rendering prompt"
                );
                prompt.render(requester, self.host.ui.as_ref());
            }
            None => {
                tracing::debug!(requester = %requester, token = %token, "stale render skipped");
            }
        }
    }

    fn complete(&self, requester: &Requester, queue: PromptQueue) {
        let command = queue.complete_command();
        if self.config.show_completed {
            self.notify(requester, &self.config.messages.completed(&command));
        }

        let host = &self.host;
        let result = if queue.use_attachment() {
            host.dispatcher.dispatch_with_attachment(
                requester,
                &command,
                self.config.permission_attachment_ticks,
                &queue.attach_permissions(),
            )
        } else if queue.elevation_requested() && !queue.requester_was_elevated() {
            host.elevation.set_elevated(requester, true);
            let result = host.dispatcher.dispatch(requester, &command);
            host.elevation.set_elevated(requester, false);
            host.scheduler.schedule(
                self.config.revoke_retry(),
                Deferred::Revoke {
                    requester: requester.clone(),
                },
            );
            result
        } else {
            host.dispatcher.dispatch(requester, &command)
        };

        match result {
            Ok(()) => tracing::info!(
                event = "sequence.completed",
                requester = %requester,
                token = %queue.token(),
                command = %command,
                answers = queue.completed_answers().len(),
                "command dispatched"
            ),
            Err(err) => {
                tracing::warn!(
                    event = "dispatch.failed",
                    requester = %requester,
                    token = %queue.token(),
                    command = %command,
                    error = %err,
                    "dispatch failed"
                );
                self.notify(requester, &self.config.messages.dispatch_failed);
            }
        }
    }

    fn cancel_with_reason(&mut self, requester: &Requester, reason: &'static str) -> bool {
        let Some(queue) = self.registry.unregister(requester) else {
            return false;
        };
        tracing::info!(
            event = "sequence.cancelled",
            requester = %requester,
            token = %queue.token(),
            pending = queue.len(),
            reason,
            "sequence cancelled"
        );
        self.notify(requester, &self.config.messages.prompt_cancel);
        true
    }

    fn schedule_render(&self, requester: &Requester, token: SequenceToken) {
        self.host.scheduler.schedule(
            self.config.render_delay(),
            Deferred::Render {
                requester: requester.clone(),
                token,
            },
        );
    }

    fn notify(&self, requester: &Requester, message: &str) {
        self.host
            .messenger
            .send_message(requester, &self.config.prefixed(message));
    }
}

fn build_parser(config: &PrompterConfig) -> Result<PromptParser, ConfigError> {
    let kinds = PromptKinds::from_config(config);
    for (key, kind) in kinds.iter() {
        tracing::info!(event = "prompt.kind_registered", key, kind = kind.name);
    }
    if !config.structured_input {
        tracing::warn!(
            event = "prompt.kind_unavailable",
            key = %config.keys.structured,
            "structured input unavailable, its markers stay literal text"
        );
    }
    PromptParser::new(kinds, config)
}
