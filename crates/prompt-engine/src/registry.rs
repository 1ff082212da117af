use std::collections::HashMap;

use protocol::Requester;

use crate::queue::PromptQueue;

/// Active queue per requester. Holds no policy of its own: overlapping sequences are
/// prevented by the manager, which also does any logging.
#[derive(Debug, Default)]
pub struct PromptRegistry {
    queues: HashMap<Requester, PromptQueue>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `queue` for `requester` and returns the queue it replaced, if any.
    pub fn register(&mut self, requester: Requester, queue: PromptQueue) -> Option<PromptQueue> {
        self.queues.insert(requester, queue)
    }

    pub fn unregister(&mut self, requester: &Requester) -> Option<PromptQueue> {
        self.queues.remove(requester)
    }

    pub fn get(&self, requester: &Requester) -> Option<&PromptQueue> {
        self.queues.get(requester)
    }

    pub fn get_mut(&mut self, requester: &Requester) -> Option<&mut PromptQueue> {
        self.queues.get_mut(requester)
    }

    pub fn contains(&self, requester: &Requester) -> bool {
        self.queues.contains_key(requester)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn requesters(&self) -> Vec<Requester> {
        let mut requesters: Vec<Requester> = self.queues.keys().cloned().collect();
        requesters.sort();
        requesters
    }

    /// Drops every queue and returns how many were active.
    pub fn clear(&mut self) -> usize {
        let count = self.queues.len();
        self.queues.clear();
        count
    }
}
