//! Prompt sequencing and dispatch for command templates.

pub mod config;
pub mod error;
pub mod interceptor;
pub mod manager;
pub mod parser;
pub mod ports;
pub mod prompt;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod template;

#[cfg(test)]
mod test_utils;

pub use config::PrompterConfig;
pub use error::{AnswerRejected, ConfigError, DispatchError};
pub use manager::PromptManager;
pub use ports::{Collaborators, Dispatcher, ElevationProvider, Messenger, PromptUi};
pub use scheduler::{ChannelScheduler, Deferred, Scheduler};
