//! Model-driven speaker selection

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use agentchat_core::message::ChatEvent;

use crate::agent::ChatAgent;
use crate::error::Result;
use crate::model::{ChatCompletionClient, Completion, LlmMessage};

pub const DEFAULT_SELECTOR_PROMPT: &str = "You are in a role play game. The following roles are available:
{roles}.
Read the following conversation. Then select the next role from {participants} to play. Only return the role.

{history}

Read the above conversation. Then select the next role from {participants} to play. Only return the role.
";

pub const DEFAULT_MAX_SELECTOR_ATTEMPTS: usize = 3;

/// Settings for a selector team
#[derive(Clone)]
pub struct SelectorConfig {
    pub model_client: Arc<dyn ChatCompletionClient>,
    pub selector_prompt: String,
    pub allow_repeated_speaker: bool,
    pub max_selector_attempts: usize,
}

impl SelectorConfig {
    pub fn new(model_client: Arc<dyn ChatCompletionClient>) -> Self {
        Self {
            model_client,
            selector_prompt: DEFAULT_SELECTOR_PROMPT.to_string(),
            allow_repeated_speaker: false,
            max_selector_attempts: DEFAULT_MAX_SELECTOR_ATTEMPTS,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.selector_prompt = prompt.into();
        self
    }

    pub fn with_allow_repeated_speaker(mut self, allow: bool) -> Self {
        self.allow_repeated_speaker = allow;
        self
    }
}

/// Python-style list rendering: `['A', 'B']`
fn format_names(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("[{}]", quoted.join(", "))
}

pub(crate) fn render_prompt(
    template: &str,
    candidates: &[&Arc<dyn ChatAgent>],
    thread: &[ChatEvent],
) -> String {
    let roles = candidates
        .iter()
        .map(|a| format!("{}: {}", a.name(), a.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let names: Vec<&str> = candidates.iter().map(|a| a.name()).collect();
    let history = thread
        .iter()
        .filter(|m| m.is_chat_message())
        .map(|m| format!("{}: {}", m.source(), m.to_text()))
        .collect::<Vec<_>>()
        .join("\n");

    template
        .replace("{roles}", &roles)
        .replace("{participants}", &format_names(&names))
        .replace("{history}", &history)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Count whole-word occurrences of `needle` in `text`
fn count_word(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.match_indices(needle)
        .filter(|(start, _)| {
            let before = text[..*start].chars().next_back();
            let after = text[start + needle.len()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .count()
}

/// Names mentioned in `text`, with mention counts
pub(crate) fn mentioned_agents(text: &str, names: &[&str]) -> BTreeMap<String, usize> {
    let mut mentions = BTreeMap::new();
    for name in names {
        let mut count = count_word(text, name);
        if name.contains('_') {
            count += count_word(text, &name.replace('_', " "));
            count += count_word(text, &name.replace('_', "\\_"));
        }
        if count > 0 {
            mentions.insert(name.to_string(), count);
        }
    }
    mentions
}

/// Ask the selector model for the next speaker; returns a participant index
pub(crate) async fn select_speaker(
    config: &SelectorConfig,
    participants: &[Arc<dyn ChatAgent>],
    thread: &[ChatEvent],
    previous_speaker: Option<&str>,
) -> Result<usize> {
    let previous_index =
        previous_speaker.and_then(|p| participants.iter().position(|a| a.name() == p));

    let candidates: Vec<usize> = (0..participants.len())
        .filter(|i| {
            config.allow_repeated_speaker
                || participants.len() == 1
                || Some(*i) != previous_index
        })
        .collect();

    if candidates.len() == 1 {
        return Ok(candidates[0]);
    }

    let candidate_agents: Vec<&Arc<dyn ChatAgent>> =
        candidates.iter().map(|i| &participants[*i]).collect();
    let names: Vec<&str> = candidate_agents.iter().map(|a| a.name()).collect();
    let prompt = render_prompt(&config.selector_prompt, &candidate_agents, thread);

    let mut messages = vec![LlmMessage::System(prompt)];
    for attempt in 0..config.max_selector_attempts.max(1) {
        let result = config.model_client.create(&messages, &[]).await?;
        let reply = match result.content {
            Completion::Text(text) => text,
            Completion::ToolCalls(_) => String::new(),
        };

        let mentions = mentioned_agents(&reply, &names);
        if mentions.len() == 1 {
            if let Some(name) = mentions.keys().next() {
                if let Some(index) = participants.iter().position(|a| a.name() == name.as_str()) {
                    debug!("Selector picked {} on attempt {}", name, attempt + 1);
                    return Ok(index);
                }
            }
        }

        let feedback = if mentions.is_empty() {
            format!(
                "No valid name was mentioned. Please select from: {}.",
                format_names(&names)
            )
        } else {
            format!(
                "Expected exactly one name to be mentioned. Please select only one from: {}.",
                format_names(&names)
            )
        };
        debug!("Selector reply {:?} rejected: {}", reply, feedback);
        messages.push(LlmMessage::Assistant {
            content: Completion::Text(reply),
            source: "selector".to_string(),
        });
        messages.push(LlmMessage::User {
            content: feedback,
            source: "user".to_string(),
        });
    }

    let fallback = previous_index.unwrap_or(0);
    warn!(
        "Selector could not pick a speaker, falling back to {}",
        participants[fallback].name()
    );
    Ok(fallback)
}
