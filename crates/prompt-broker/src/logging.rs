use std::io;
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Handle on the global level filter, so a config reload can toggle `debug`.
pub(crate) struct LogFilter {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    from_env: bool,
}

impl LogFilter {
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            handle: None,
            from_env: false,
        }
    }

    /// No-op when the filter came from `RUST_LOG`.
    pub(crate) fn set_debug(&self, debug: bool) {
        let Some(handle) = &self.handle else {
            return;
        };
        if self.from_env {
            return;
        }
        match handle.reload(EnvFilter::new(default_level(debug))) {
            Ok(()) => {
                let enabled = debug;
                tracing::info!(event = "logging.level_changed", debug = enabled)
            }
            Err(err) => tracing::warn!(
                event = "logging.reload_failed",
                error = %err,
                "failed to update log filter"
            ),
        }
    }
}

pub(crate) fn init_tracing(
    log_dir: &Path,
    log_to_stderr: bool,
    debug: bool,
) -> anyhow::Result<(tracing_appender::non_blocking::WorkerGuard, LogFilter)> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "prompter.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_target(false)
        .json();

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_level(debug)), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if log_to_stderr {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false);
        registry.with(stderr_layer).init();
    } else {
        registry.init();
    }

    let log_filter = LogFilter {
        handle: Some(handle),
        from_env,
    };
    Ok((file_guard, log_filter))
}

fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_debug_swaps_the_level_filter() {
        let (layer, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new("info"));
        let _subscriber = Registry::default().with(layer);
        let log_filter = LogFilter {
            handle: Some(handle.clone()),
            from_env: false,
        };

        log_filter.set_debug(true);
        let current = handle.with_current(|filter| filter.to_string()).expect("filter");
        assert_eq!(current, "debug");

        log_filter.set_debug(false);
        let current = handle.with_current(|filter| filter.to_string()).expect("filter");
        assert_eq!(current, "info");
    }

    #[test]
    fn env_filter_is_left_alone() {
        let (layer, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new("warn"));
        let _subscriber = Registry::default().with(layer);
        let log_filter = LogFilter {
            handle: Some(handle.clone()),
            from_env: true,
        };

        log_filter.set_debug(true);
        let current = handle.with_current(|filter| filter.to_string()).expect("filter");
        assert_eq!(current, "warn");
    }
}
