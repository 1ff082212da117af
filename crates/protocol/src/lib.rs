use serde::{Deserialize, Serialize};
use std::fmt;

pub mod control;
pub mod framing;

/// Identity of whoever is being prompted: a player or an automated sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Requester(String);

impl Requester {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Requester {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOrigin {
    #[default]
    Typed,
    Console,
    Dispatched,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptEvent {
    pub requester: Requester,
    pub text: String,
    #[serde(default)]
    pub is_op: bool,
    #[serde(default)]
    pub origin: AttemptOrigin,
}

impl AttemptEvent {
    pub fn typed(requester: impl Into<Requester>, text: impl Into<String>, is_op: bool) -> Self {
        Self {
            requester: requester.into(),
            text: text.into(),
            is_op,
            origin: AttemptOrigin::Typed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEvent {
    pub requester: Requester,
    pub text: String,
}

impl AnswerEvent {
    pub fn new(requester: impl Into<Requester>, text: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            text: text.into(),
        }
    }
}

/// What the host should do with the command it reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    PassThrough,
    Intercepted,
    /// Requester is already answering prompts.
    Rejected,
}

impl AttemptOutcome {
    pub fn suppresses_execution(self) -> bool {
        !matches!(self, AttemptOutcome::PassThrough)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptView {
    Chat {
        text: String,
    },
    Modal {
        text: String,
        #[serde(default)]
        default: Option<String>,
    },
    Selection {
        text: String,
        #[serde(default)]
        options: Vec<String>,
    },
    Structured {
        text: String,
    },
}

impl PromptView {
    pub fn text(&self) -> &str {
        match self {
            PromptView::Chat { text }
            | PromptView::Modal { text, .. }
            | PromptView::Selection { text, .. }
            | PromptView::Structured { text } => text,
        }
    }
}
