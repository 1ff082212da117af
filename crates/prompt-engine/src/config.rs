use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct PrompterConfig {
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,
    #[serde(default = "default_cancel_keyword")]
    pub cancel_keyword: String,
    #[serde(default)]
    pub show_completed: bool,
    #[serde(default)]
    pub debug: bool,
    /// Set when the host provides the multi-line structured input UI.
    #[serde(default)]
    pub structured_input: bool,
    #[serde(default = "default_render_delay_ms")]
    pub render_delay_ms: u64,
    #[serde(default = "default_revoke_retry_ms")]
    pub revoke_retry_ms: u64,
    #[serde(default = "default_permission_attachment_ticks")]
    pub permission_attachment_ticks: u64,
    #[serde(default)]
    pub attachment_permissions: Vec<String>,
    #[serde(default)]
    pub attachment_sets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub interception: InterceptionConfig,
    #[serde(default)]
    pub messages: MessageConfig,
}

impl PrompterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompt_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "prompt_timeout_secs must be a positive integer".to_string(),
            ));
        }
        if self.permission_attachment_ticks == 0 {
            return Err(ConfigError::Invalid(
                "permission_attachment_ticks must be a positive integer".to_string(),
            ));
        }
        if self.cancel_keyword.trim().is_empty() {
            return Err(ConfigError::Invalid("cancel_keyword cannot be empty".to_string()));
        }
        self.keys.validate()?;
        for (name, permissions) in &self.attachment_sets {
            if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "attachment set name {name:?} must be a single word"
                )));
            }
            if permissions.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "attachment set {name} has no permissions"
                )));
            }
        }
        Ok(())
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    pub fn revoke_retry(&self) -> Duration {
        Duration::from_millis(self.revoke_retry_ms)
    }

    /// Prefixes a message the same way for every requester-facing notice.
    pub fn prefixed(&self, message: &str) -> String {
        format!("{}{}", self.prompt_prefix, message)
    }
}

impl Default for PrompterConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_secs: default_prompt_timeout_secs(),
            prompt_prefix: default_prompt_prefix(),
            cancel_keyword: default_cancel_keyword(),
            show_completed: false,
            debug: false,
            structured_input: false,
            render_delay_ms: default_render_delay_ms(),
            revoke_retry_ms: default_revoke_retry_ms(),
            permission_attachment_ticks: default_permission_attachment_ticks(),
            attachment_permissions: Vec::new(),
            attachment_sets: BTreeMap::new(),
            keys: KeyConfig::default(),
            interception: InterceptionConfig::default(),
            messages: MessageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    #[serde(default = "default_modal_key")]
    pub modal: String,
    #[serde(default = "default_selection_key")]
    pub selection: String,
    #[serde(default = "default_structured_key")]
    pub structured: String,
}

impl KeyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for key in [&self.modal, &self.selection, &self.structured] {
            if key.chars().count() != 1 || key.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "prompt key {key:?} must be a single non-space character"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate prompt key {key:?}")));
            }
        }
        Ok(())
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            modal: default_modal_key(),
            selection: default_selection_key(),
            structured: default_structured_key(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterceptionConfig {
    /// Intercept attempts from every origin instead of typed player input only.
    #[serde(default)]
    pub enable_unsafe: bool,
    #[serde(default)]
    pub activation_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_prompt_cancel")]
    pub prompt_cancel: String,
    #[serde(default = "default_already_prompting")]
    pub already_prompting: String,
    /// `{command}` is replaced with the completed command.
    #[serde(default = "default_completed_command")]
    pub completed_command: String,
    #[serde(default = "default_dispatch_failed")]
    pub dispatch_failed: String,
    #[serde(default = "default_invalid_answer")]
    pub invalid_answer: String,
}

impl MessageConfig {
    pub fn completed(&self, command: &str) -> String {
        self.completed_command.replace("{command}", command)
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            prompt_cancel: default_prompt_cancel(),
            already_prompting: default_already_prompting(),
            completed_command: default_completed_command(),
            dispatch_failed: default_dispatch_failed(),
            invalid_answer: default_invalid_answer(),
        }
    }
}

fn default_prompt_timeout_secs() -> u64 {
    60
}

fn default_prompt_prefix() -> String {
    "[Prompter] ".to_string()
}

fn default_cancel_keyword() -> String {
    "cancel".to_string()
}

fn default_render_delay_ms() -> u64 {
    100
}

fn default_revoke_retry_ms() -> u64 {
    100
}

fn default_permission_attachment_ticks() -> u64 {
    1
}

fn default_modal_key() -> String {
    "a".to_string()
}

fn default_selection_key() -> String {
    "p".to_string()
}

fn default_structured_key() -> String {
    "s".to_string()
}

fn default_prompt_cancel() -> String {
    "Prompt cancelled.".to_string()
}

fn default_already_prompting() -> String {
    "You are already answering a prompt. Type 'cancel' to stop it.".to_string()
}

fn default_completed_command() -> String {
    "Completed command: {command}".to_string()
}

fn default_dispatch_failed() -> String {
    "Something went wrong while running your command.".to_string()
}

fn default_invalid_answer() -> String {
    "That answer is not valid, try again.".to_string()
}
