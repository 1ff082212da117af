//! Template syntax: `<inner>` placeholders (`inner` may start with `-<key> `), bare
//! `-<key> ` markers, and the `-op ` / `-pa[:set] ` flags. Anything else, unregistered
//! keys included, stays literal text.

use std::collections::{BTreeMap, BTreeSet};

use protocol::Requester;
use regex::{Captures, Regex};

use crate::config::PrompterConfig;
use crate::error::ConfigError;
use crate::prompt::{Prompt, PromptKinds, PromptSpec};
use crate::queue::PromptQueue;
use crate::template::Template;

const ELEVATION_FLAG: &str = "-op";
const ATTACHMENT_FLAG: &str = "-pa";

#[derive(Debug)]
pub struct ParsedTemplate {
    pub template: Template,
    pub steps: Vec<Box<dyn Prompt>>,
    pub elevation_requested: bool,
    pub attachment: Option<BTreeSet<String>>,
    pub unknown_keys: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct PromptParser {
    kinds: PromptKinds,
    pattern: Regex,
    inner_marker: Option<Regex>,
    any_inner_marker: Regex,
    default_attachment: BTreeSet<String>,
    attachment_sets: BTreeMap<String, BTreeSet<String>>,
}

impl PromptParser {
    pub fn new(kinds: PromptKinds, config: &PrompterConfig) -> Result<Self, ConfigError> {
        let alternation = kinds
            .marker_keys()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let bare = if alternation.is_empty() {
            String::new()
        } else {
            format!(r"|(?P<bare>-(?P<key>{alternation})(?: |$))")
        };
        let source = format!(
            r"<(?P<inner>[^<>]*)>|(?P<flag>{ELEVATION_FLAG}(?: |$)|{ATTACHMENT_FLAG}(?::(?P<set>[^\s<>]+))?(?: |$)){bare}"
        );
        tracing::debug!(pattern = %source, "prompt pattern compiled");
        let pattern = compile(&source)?;
        let inner_marker = if alternation.is_empty() {
            None
        } else {
            Some(compile(&format!(
                r"(?s)^-(?P<key>{alternation})(?: (?P<text>.*)|$)"
            ))?)
        };

        Ok(Self {
            kinds,
            pattern,
            inner_marker,
            any_inner_marker: compile(r"^-(?P<key>\S)(?: |$)")?,
            default_attachment: config.attachment_permissions.iter().cloned().collect(),
            attachment_sets: config
                .attachment_sets
                .iter()
                .map(|(name, permissions)| (name.clone(), permissions.iter().cloned().collect()))
                .collect(),
        })
    }

    pub fn kinds(&self) -> &PromptKinds {
        &self.kinds
    }

    pub fn is_promptable(&self, template: &str) -> bool {
        self.pattern.captures_iter(template).any(|caps| {
            let whole = caps.get(0).map(|m| m.start()).unwrap_or_default();
            caps.name("inner").is_some()
                || (caps.name("bare").is_some() && at_word_boundary(template, whole))
        })
    }

    pub fn parse(&self, template: &str, requester: &Requester, was_elevated: bool) -> PromptQueue {
        let parsed = self.parse_template(template);
        tracing::debug!(
            requester = %requester,
            template = %parsed.template,
            steps = parsed.steps.len(),
            "template parsed"
        );
        PromptQueue::new(parsed, was_elevated)
    }

    pub fn parse_template(&self, raw: &str) -> ParsedTemplate {
        let mut template = Template::new();
        let mut specs = Vec::new();
        let mut elevation_requested = false;
        let mut attachment = None;
        let mut unknown_keys = BTreeSet::new();
        let mut cursor = 0;

        for caps in self.pattern.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            template.push_literal(&raw[cursor..whole.start()]);
            cursor = whole.end();

            if let Some(inner) = caps.name("inner") {
                let spec = self.placeholder_spec(inner.as_str(), template.push_slot());
                if spec.key.is_empty() {
                    if let Some(key) = self.unregistered_inner_key(inner.as_str()) {
                        unknown_keys.insert(key);
                    }
                }
                specs.push(spec);
                continue;
            }

            if !at_word_boundary(raw, whole.start()) {
                template.push_literal(whole.as_str());
                continue;
            }

            if caps.name("flag").is_some() {
                match self.apply_flag(&caps) {
                    Some(Flag::Elevation) => elevation_requested = true,
                    Some(Flag::Attachment(permissions)) => attachment = Some(permissions),
                    None => template.push_literal(whole.as_str()),
                }
                continue;
            }

            if let Some(key) = caps.name("key") {
                let slot = template.push_slot();
                specs.push(PromptSpec::new(key.as_str(), String::new(), slot));
            }
        }
        template.push_literal(&raw[cursor..]);

        if specs.is_empty() {
            let text = template.fill(&[]).trim().to_string();
            if !text.is_empty() && !template.ends_with_whitespace() {
                template.push_literal(" ");
            }
            let slot = template.push_slot();
            specs.push(PromptSpec::new("", text, slot));
        }

        ParsedTemplate {
            template,
            steps: specs.into_iter().map(|spec| self.kinds.build(spec)).collect(),
            elevation_requested,
            attachment,
            unknown_keys,
        }
    }

    fn placeholder_spec(&self, inner: &str, slot: usize) -> PromptSpec {
        let marked = self
            .inner_marker
            .as_ref()
            .and_then(|marker| marker.captures(inner));
        match marked {
            Some(caps) => {
                let key = caps.name("key").map(|m| m.as_str()).unwrap_or_default();
                let text = caps.name("text").map(|m| m.as_str()).unwrap_or_default();
                PromptSpec::new(key, text.trim(), slot)
            }
            None => PromptSpec::new("", inner.trim(), slot),
        }
    }

    fn unregistered_inner_key(&self, inner: &str) -> Option<String> {
        let caps = self.any_inner_marker.captures(inner.trim_start())?;
        let key = caps.name("key")?.as_str();
        (!self.kinds.contains(key)).then(|| key.to_string())
    }

    fn apply_flag(&self, caps: &Captures<'_>) -> Option<Flag> {
        let flag = caps.name("flag")?.as_str().trim_end();
        if flag == ELEVATION_FLAG {
            return Some(Flag::Elevation);
        }
        match caps.name("set") {
            None => Some(Flag::Attachment(self.default_attachment.clone())),
            Some(set) => match self.attachment_sets.get(set.as_str()) {
                Some(permissions) => Some(Flag::Attachment(permissions.clone())),
                None => {
                    tracing::warn!(
                        event = "parser.unknown_attachment_set",
                        set = %set.as_str(),
                        "unknown attachment set left as command text"
                    );
                    None
                }
            },
        }
    }
}

enum Flag {
    Elevation,
    Attachment(BTreeSet<String>),
}

fn at_word_boundary(text: &str, index: usize) -> bool {
    index == 0
        || text[..index]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace)
}

fn compile(source: &str) -> Result<Regex, ConfigError> {
    Regex::new(source)
        .map_err(|err| ConfigError::Invalid(format!("invalid prompt pattern {source}: {err}")))
}
