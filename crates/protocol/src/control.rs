use crate::{AnswerEvent, AttemptEvent, AttemptOutcome, PromptView, Requester};
use serde::{Deserialize, Serialize};

/// Frames sent by a host adapter to the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Attempt {
        id: String,
        #[serde(flatten)]
        event: AttemptEvent,
    },
    Answer {
        #[serde(flatten)]
        event: AnswerEvent,
    },
    Cancel {
        requester: Requester,
    },
    Reload {
        #[serde(default)]
        clean: bool,
    },
}

/// Frames sent by the broker to every connected host adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAction {
    AttemptHandled {
        id: String,
        outcome: AttemptOutcome,
    },
    Render {
        requester: Requester,
        prompt: PromptView,
    },
    Message {
        requester: Requester,
        text: String,
    },
    Dispatch {
        requester: Requester,
        command: String,
    },
    DispatchWithAttachment {
        requester: Requester,
        command: String,
        duration_ticks: u64,
        permissions: Vec<String>,
    },
    SetElevated {
        requester: Requester,
        elevated: bool,
    },
    Ack {
        message: String,
    },
    Error {
        message: String,
    },
}
