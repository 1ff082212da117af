use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use protocol::{PromptView, Requester};

use crate::error::DispatchError;
use crate::ports::{Collaborators, Dispatcher, ElevationProvider, Messenger, PromptUi};
use crate::scheduler::{Deferred, Scheduler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
    Render(Requester, PromptView),
    Message(Requester, String),
    Dispatch {
        requester: Requester,
        command: String,
        elevated: bool,
    },
    DispatchWithAttachment {
        requester: Requester,
        command: String,
        duration_ticks: u64,
        permissions: Vec<String>,
    },
    SetElevated(Requester, bool),
}

/// Records every host call; tracks elevation so dispatch can report what it saw.
#[derive(Default)]
pub(crate) struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    elevated: Mutex<HashMap<Requester, bool>>,
    fail_dispatch: Mutex<bool>,
}

impl RecordingHost {
    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn dispatches(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    HostCall::Dispatch { .. } | HostCall::DispatchWithAttachment { .. }
                )
            })
            .collect()
    }

    pub(crate) fn messages(&self, requester: &Requester) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Message(to, text) if &to == requester => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn renders(&self, requester: &Requester) -> Vec<PromptView> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Render(to, view) if &to == requester => Some(view),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn elevation_calls(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, HostCall::SetElevated(..)))
            .collect()
    }

    pub(crate) fn set_initially_elevated(&self, requester: &Requester) {
        self.elevated
            .lock()
            .expect("elevated lock")
            .insert(requester.clone(), true);
    }

    pub(crate) fn is_elevated(&self, requester: &Requester) -> bool {
        self.elevated
            .lock()
            .expect("elevated lock")
            .get(requester)
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn fail_dispatches(&self) {
        *self.fail_dispatch.lock().expect("fail lock") = true;
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn dispatch_result(&self) -> Result<(), DispatchError> {
        if *self.fail_dispatch.lock().expect("fail lock") {
            Err(DispatchError::Rejected("unknown command".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PromptUi for RecordingHost {
    fn render(&self, requester: &Requester, view: PromptView) {
        self.record(HostCall::Render(requester.clone(), view));
    }
}

impl Messenger for RecordingHost {
    fn send_message(&self, requester: &Requester, text: &str) {
        self.record(HostCall::Message(requester.clone(), text.to_string()));
    }
}

impl Dispatcher for RecordingHost {
    fn dispatch(&self, requester: &Requester, command: &str) -> Result<(), DispatchError> {
        self.record(HostCall::Dispatch {
            requester: requester.clone(),
            command: command.to_string(),
            elevated: self.is_elevated(requester),
        });
        self.dispatch_result()
    }

    fn dispatch_with_attachment(
        &self,
        requester: &Requester,
        command: &str,
        duration_ticks: u64,
        permissions: &[String],
    ) -> Result<(), DispatchError> {
        self.record(HostCall::DispatchWithAttachment {
            requester: requester.clone(),
            command: command.to_string(),
            duration_ticks,
            permissions: permissions.to_vec(),
        });
        self.dispatch_result()
    }
}

impl ElevationProvider for RecordingHost {
    fn set_elevated(&self, requester: &Requester, elevated: bool) {
        self.elevated
            .lock()
            .expect("elevated lock")
            .insert(requester.clone(), elevated);
        self.record(HostCall::SetElevated(requester.clone(), elevated));
    }
}

/// Keeps scheduled tasks until the test fires them.
#[derive(Default)]
pub(crate) struct ManualScheduler {
    pending: Mutex<Vec<(Duration, Deferred)>>,
}

impl ManualScheduler {
    pub(crate) fn take(&self) -> Vec<(Duration, Deferred)> {
        std::mem::take(&mut *self.pending.lock().expect("scheduler lock"))
    }

    pub(crate) fn take_matching(&self, keep: impl Fn(&Deferred) -> bool) -> Vec<Deferred> {
        let mut pending = self.pending.lock().expect("scheduler lock");
        let (taken, rest): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|(_, task)| keep(task));
        *pending = rest;
        taken.into_iter().map(|(_, task)| task).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Deferred) {
        self.pending
            .lock()
            .expect("scheduler lock")
            .push((delay, task));
    }
}

pub(crate) fn collaborators() -> (Collaborators, Arc<RecordingHost>, Arc<ManualScheduler>) {
    let host = Arc::new(RecordingHost::default());
    let scheduler = Arc::new(ManualScheduler::default());
    let collaborators = Collaborators::from_host(Arc::clone(&host), scheduler.clone());
    (collaborators, host, scheduler)
}
