//! Capabilities the engine borrows from the host.
//!
//! Every call is fire-and-forget from the engine's side; only dispatch reports failure,
//! and that is surfaced to the requester, never retried.

use std::sync::Arc;

use protocol::{PromptView, Requester};

use crate::error::DispatchError;
use crate::scheduler::Scheduler;

pub trait PromptUi: Send + Sync {
    fn render(&self, requester: &Requester, view: PromptView);
}

pub trait Messenger: Send + Sync {
    fn send_message(&self, requester: &Requester, text: &str);
}

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, requester: &Requester, command: &str) -> Result<(), DispatchError>;

    /// Expiry of the attachment belongs to the host.
    fn dispatch_with_attachment(
        &self,
        requester: &Requester,
        command: &str,
        duration_ticks: u64,
        permissions: &[String],
    ) -> Result<(), DispatchError>;
}

pub trait ElevationProvider: Send + Sync {
    fn set_elevated(&self, requester: &Requester, elevated: bool);
}

#[derive(Clone)]
pub struct Collaborators {
    pub ui: Arc<dyn PromptUi>,
    pub messenger: Arc<dyn Messenger>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub elevation: Arc<dyn ElevationProvider>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl Collaborators {
    pub fn from_host<H>(host: Arc<H>, scheduler: Arc<dyn Scheduler>) -> Self
    where
        H: PromptUi + Messenger + Dispatcher + ElevationProvider + 'static,
    {
        Self {
            ui: host.clone(),
            messenger: host.clone(),
            dispatcher: host.clone(),
            elevation: host,
            scheduler,
        }
    }
}
