use std::fmt;
use std::time::Duration;

use protocol::{AttemptEvent, AttemptOrigin};
use tokio::time::Instant;

use crate::config::InterceptionConfig;

/// Decides which attempted commands reach the engine at all.
pub trait CommandInterceptor: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn intercepts(&self, event: &AttemptEvent) -> bool;
}

/// Only commands a player typed; console input and host-dispatched commands are left alone.
#[derive(Debug, Default)]
pub struct PassiveInterceptor;

impl CommandInterceptor for PassiveInterceptor {
    fn name(&self) -> &'static str {
        "passive"
    }

    fn intercepts(&self, event: &AttemptEvent) -> bool {
        event.origin == AttemptOrigin::Typed
    }
}

/// Every origin, once the activation delay has passed. Before that it acts like
/// [`PassiveInterceptor`].
#[derive(Debug)]
pub struct PreemptiveInterceptor {
    active_from: Instant,
}

impl PreemptiveInterceptor {
    pub fn new(activation_delay: Duration) -> Self {
        Self {
            active_from: Instant::now() + activation_delay,
        }
    }

    pub fn is_active(&self) -> bool {
        Instant::now() >= self.active_from
    }
}

impl CommandInterceptor for PreemptiveInterceptor {
    fn name(&self) -> &'static str {
        "preemptive"
    }

    fn intercepts(&self, event: &AttemptEvent) -> bool {
        self.is_active() || PassiveInterceptor.intercepts(event)
    }
}

pub fn interceptor_for(config: &InterceptionConfig) -> Box<dyn CommandInterceptor> {
    if config.enable_unsafe {
        let delay = Duration::from_millis(config.activation_delay_ms);
        tracing::warn!(
            event = "interceptor.preemptive",
            activation_delay = %humantime::format_duration(delay),
            "intercepting commands from every origin"
        );
        Box::new(PreemptiveInterceptor::new(delay))
    } else {
        Box::new(PassiveInterceptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Requester;

    fn attempt(origin: AttemptOrigin) -> AttemptEvent {
        AttemptEvent {
            requester: Requester::new("CONSOLE"),
            text: "give <-a Item>".to_string(),
            is_op: true,
            origin,
        }
    }

    #[test]
    fn passive_only_takes_typed_commands() {
        let interceptor = PassiveInterceptor;
        assert!(interceptor.intercepts(&attempt(AttemptOrigin::Typed)));
        assert!(!interceptor.intercepts(&attempt(AttemptOrigin::Console)));
        assert!(!interceptor.intercepts(&attempt(AttemptOrigin::Dispatched)));
    }

    #[tokio::test(start_paused = true)]
    async fn preemptive_widens_after_activation_delay() {
        let config = InterceptionConfig {
            enable_unsafe: true,
            activation_delay_ms: 2_000,
        };
        let interceptor = interceptor_for(&config);
        assert_eq!(interceptor.name(), "preemptive");
        assert!(interceptor.intercepts(&attempt(AttemptOrigin::Typed)));
        assert!(!interceptor.intercepts(&attempt(AttemptOrigin::Console)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(interceptor.intercepts(&attempt(AttemptOrigin::Console)));
        assert!(interceptor.intercepts(&attempt(AttemptOrigin::Dispatched)));
    }

    #[test]
    fn default_config_is_passive() {
        let interceptor = interceptor_for(&InterceptionConfig::default());
        assert_eq!(interceptor.name(), "passive");
    }
}
