use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::parser::ParsedTemplate;
use crate::prompt::Prompt;
use crate::template::Template;

/// Generation number telling one queue apart from any later queue for the same requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceToken(u64);

impl SequenceToken {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq-{}", self.0)
    }
}

/// Pending prompts of one requester plus the answers collected so far.
#[derive(Debug)]
pub struct PromptQueue {
    template: Template,
    steps: VecDeque<Box<dyn Prompt>>,
    completed_answers: Vec<String>,
    elevation_requested: bool,
    use_attachment: bool,
    attach_permissions: BTreeSet<String>,
    requester_was_elevated: bool,
    unknown_keys: BTreeSet<String>,
    token: SequenceToken,
}

impl PromptQueue {
    pub fn new(parsed: ParsedTemplate, requester_was_elevated: bool) -> Self {
        Self {
            template: parsed.template,
            steps: parsed.steps.into(),
            completed_answers: Vec::new(),
            elevation_requested: parsed.elevation_requested,
            use_attachment: parsed.attachment.is_some(),
            attach_permissions: parsed.attachment.unwrap_or_default(),
            requester_was_elevated,
            unknown_keys: parsed.unknown_keys,
            token: SequenceToken::next(),
        }
    }

    pub fn token(&self) -> SequenceToken {
        self.token
    }

    pub fn front(&self) -> Option<&dyn Prompt> {
        self.steps.front().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consumes the front step and records its answer.
    pub fn answer_front(&mut self, answer: String) -> Option<Box<dyn Prompt>> {
        let step = self.steps.pop_front()?;
        self.completed_answers.push(answer);
        Some(step)
    }

    pub fn completed_answers(&self) -> &[String] {
        &self.completed_answers
    }

    pub fn complete_command(&self) -> String {
        self.template.fill(&self.completed_answers).trim().to_string()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn elevation_requested(&self) -> bool {
        self.elevation_requested
    }

    pub fn use_attachment(&self) -> bool {
        self.use_attachment
    }

    pub fn attach_permissions(&self) -> Vec<String> {
        self.attach_permissions.iter().cloned().collect()
    }

    pub fn requester_was_elevated(&self) -> bool {
        self.requester_was_elevated
    }

    /// Keys of `<-x ...>` placeholders that no registered kind answered to.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }
}
