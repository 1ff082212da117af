use std::time::Duration;

use protocol::Requester;
use tokio::sync::mpsc;

use crate::queue::SequenceToken;

/// Work the manager asks to run later on its own task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Show the front prompt of the sequence identified by `token`.
    Render {
        requester: Requester,
        token: SequenceToken,
    },
    /// Cancel the sequence identified by `token` if it is still the active one.
    Timeout {
        requester: Requester,
        token: SequenceToken,
    },
    /// Second elevation revoke after an elevated dispatch.
    Revoke { requester: Requester },
}

impl Deferred {
    pub fn requester(&self) -> &Requester {
        match self {
            Deferred::Render { requester, .. }
            | Deferred::Timeout { requester, .. }
            | Deferred::Revoke { requester } => requester,
        }
    }
}

pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Deferred);
}

/// Sleeps on the tokio timer and hands the task back through a channel, so the task
/// runs on whichever loop owns the receiver. Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct ChannelScheduler {
    tx: mpsc::Sender<Deferred>,
}

impl ChannelScheduler {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Deferred>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Scheduler for ChannelScheduler {
    fn schedule(&self, delay: Duration, task: Deferred) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(task).await.is_err() {
                tracing::debug!(event = "scheduler.closed", "deferred task dropped");
            }
        });
    }
}
