use std::collections::BTreeMap;
use std::fmt;

use protocol::{PromptView, Requester};

use crate::config::PrompterConfig;
use crate::error::AnswerRejected;
use crate::ports::PromptUi;

const METADATA_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    /// Empty for the default chat kind.
    pub key: String,
    /// Raw placeholder text, metadata included.
    pub text: String,
    pub slot: usize,
}

impl PromptSpec {
    pub fn new(key: impl Into<String>, text: impl Into<String>, slot: usize) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            slot,
        }
    }

    fn title_and_metadata(&self) -> (String, Vec<String>) {
        let mut parts = self.text.split(METADATA_SEPARATOR).map(str::trim);
        let title = parts.next().unwrap_or_default().to_string();
        let metadata = parts
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        (title, metadata)
    }
}

pub trait Prompt: fmt::Debug + Send {
    fn spec(&self) -> &PromptSpec;

    fn kind(&self) -> &'static str;

    fn view(&self) -> PromptView;

    fn render(&self, requester: &Requester, ui: &dyn PromptUi) {
        ui.render(requester, self.view());
    }

    fn accept(&self, raw: &str) -> Result<String, AnswerRejected>;
}

pub type PromptFactory = fn(PromptSpec) -> Box<dyn Prompt>;

#[derive(Debug)]
pub struct ChatPrompt {
    spec: PromptSpec,
}

impl ChatPrompt {
    pub fn build(spec: PromptSpec) -> Box<dyn Prompt> {
        Box::new(Self { spec })
    }
}

impl Prompt for ChatPrompt {
    fn spec(&self) -> &PromptSpec {
        &self.spec
    }

    fn kind(&self) -> &'static str {
        "chat"
    }

    fn view(&self) -> PromptView {
        PromptView::Chat {
            text: self.spec.text.trim().to_string(),
        }
    }

    fn accept(&self, raw: &str) -> Result<String, AnswerRejected> {
        Ok(raw.to_string())
    }
}

#[derive(Debug)]
pub struct ModalTextPrompt {
    spec: PromptSpec,
    title: String,
    default: Option<String>,
}

impl ModalTextPrompt {
    pub fn build(spec: PromptSpec) -> Box<dyn Prompt> {
        let (title, metadata) = spec.title_and_metadata();
        Box::new(Self {
            spec,
            title,
            default: metadata.into_iter().next(),
        })
    }
}

impl Prompt for ModalTextPrompt {
    fn spec(&self) -> &PromptSpec {
        &self.spec
    }

    fn kind(&self) -> &'static str {
        "modal"
    }

    fn view(&self) -> PromptView {
        PromptView::Modal {
            text: self.title.clone(),
            default: self.default.clone(),
        }
    }

    fn accept(&self, raw: &str) -> Result<String, AnswerRejected> {
        let answer = raw.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        self.default
            .clone()
            .ok_or_else(|| AnswerRejected::new("answer cannot be empty"))
    }
}

/// Pick one entry. Options come from the placeholder (`title|a|b`) or, when none are
/// listed, from the host UI (online players and the like).
#[derive(Debug)]
pub struct SelectionPrompt {
    spec: PromptSpec,
    title: String,
    options: Vec<String>,
}

impl SelectionPrompt {
    pub fn build(spec: PromptSpec) -> Box<dyn Prompt> {
        let (title, options) = spec.title_and_metadata();
        Box::new(Self {
            spec,
            title,
            options,
        })
    }
}

impl Prompt for SelectionPrompt {
    fn spec(&self) -> &PromptSpec {
        &self.spec
    }

    fn kind(&self) -> &'static str {
        "selection"
    }

    fn view(&self) -> PromptView {
        PromptView::Selection {
            text: self.title.clone(),
            options: self.options.clone(),
        }
    }

    fn accept(&self, raw: &str) -> Result<String, AnswerRejected> {
        let answer = raw.trim();
        if answer.is_empty() {
            return Err(AnswerRejected::new("nothing was selected"));
        }
        if self.options.is_empty() {
            return Ok(answer.to_string());
        }
        self.options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(answer))
            .cloned()
            .ok_or_else(|| AnswerRejected::new(format!("{answer} is not one of the options")))
    }
}

#[derive(Debug)]
pub struct StructuredPrompt {
    spec: PromptSpec,
}

impl StructuredPrompt {
    pub fn build(spec: PromptSpec) -> Box<dyn Prompt> {
        Box::new(Self { spec })
    }
}

impl Prompt for StructuredPrompt {
    fn spec(&self) -> &PromptSpec {
        &self.spec
    }

    fn kind(&self) -> &'static str {
        "structured"
    }

    fn view(&self) -> PromptView {
        PromptView::Structured {
            text: self.spec.text.trim().to_string(),
        }
    }

    fn accept(&self, raw: &str) -> Result<String, AnswerRejected> {
        let joined = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            return Err(AnswerRejected::new("answer cannot be empty"));
        }
        Ok(joined)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptKind {
    pub name: &'static str,
    pub factory: PromptFactory,
}

/// The empty key is the chat kind and is always present.
#[derive(Debug, Clone)]
pub struct PromptKinds {
    kinds: BTreeMap<String, PromptKind>,
}

impl PromptKinds {
    pub fn new() -> Self {
        let mut kinds = BTreeMap::new();
        kinds.insert(
            String::new(),
            PromptKind {
                name: "chat",
                factory: ChatPrompt::build,
            },
        );
        Self { kinds }
    }

    pub fn from_config(config: &PrompterConfig) -> Self {
        let mut kinds = Self::new();
        kinds.register(&config.keys.modal, "modal", ModalTextPrompt::build);
        kinds.register(&config.keys.selection, "selection", SelectionPrompt::build);
        if config.structured_input {
            kinds.register(&config.keys.structured, "structured", StructuredPrompt::build);
        }
        kinds
    }

    pub fn register(
        &mut self,
        key: &str,
        name: &'static str,
        factory: PromptFactory,
    ) -> Option<PromptKind> {
        self.kinds.insert(key.to_string(), PromptKind { name, factory })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    pub fn marker_keys(&self) -> impl Iterator<Item = &str> {
        self.kinds
            .keys()
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PromptKind)> {
        self.kinds.iter().map(|(key, kind)| (key.as_str(), kind))
    }

    /// Unknown keys fall back to chat.
    pub fn build(&self, spec: PromptSpec) -> Box<dyn Prompt> {
        match self.kinds.get(&spec.key) {
            Some(kind) => (kind.factory)(spec),
            None => ChatPrompt::build(PromptSpec {
                key: String::new(),
                ..spec
            }),
        }
    }
}

impl Default for PromptKinds {
    fn default() -> Self {
        Self::new()
    }
}
