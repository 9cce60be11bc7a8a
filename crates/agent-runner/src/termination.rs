//! Termination conditions
//!
//! Conditions are checked against each batch of new messages and keep
//! their own counters until reset. Combine them with `|`.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use agentchat_core::message::ChatEvent;

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopMessage {
    pub source: String,
    pub content: String,
}

/// Serializable description of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "config")]
pub enum TerminationConfig {
    TextMentionTermination { text: String },
    MaxMessageTermination { max_messages: usize },
    HandoffTermination { target: String },
    OrTerminationCondition { conditions: Vec<TerminationConfig> },
}

pub trait TerminationCondition: Send + Sync {
    /// Inspect `delta`; `Some` means the run must stop
    fn check(&mut self, delta: &[ChatEvent]) -> Option<StopMessage>;

    fn terminated(&self) -> bool;

    fn reset(&mut self);

    fn dump_config(&self) -> TerminationConfig;
}

/// Stops when a chat message contains `text`
pub struct TextMentionTermination {
    text: String,
    terminated: bool,
}

impl TextMentionTermination {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminated: false,
        }
    }
}

impl TerminationCondition for TextMentionTermination {
    fn check(&mut self, delta: &[ChatEvent]) -> Option<StopMessage> {
        if self.terminated {
            return None;
        }
        let hit = delta
            .iter()
            .filter(|m| m.is_chat_message())
            .any(|m| m.to_text().contains(&self.text));
        if !hit {
            return None;
        }
        self.terminated = true;
        Some(StopMessage {
            source: "TextMentionTermination".to_string(),
            content: format!("Text '{}' mentioned", self.text),
        })
    }

    fn terminated(&self) -> bool {
        self.terminated
    }

    fn reset(&mut self) {
        self.terminated = false;
    }

    fn dump_config(&self) -> TerminationConfig {
        TerminationConfig::TextMentionTermination {
            text: self.text.clone(),
        }
    }
}

/// Stops once `max_messages` chat messages have been seen
pub struct MaxMessageTermination {
    max_messages: usize,
    count: usize,
    terminated: bool,
}

impl MaxMessageTermination {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            count: 0,
            terminated: false,
        }
    }
}

impl TerminationCondition for MaxMessageTermination {
    fn check(&mut self, delta: &[ChatEvent]) -> Option<StopMessage> {
        if self.terminated {
            return None;
        }
        self.count += delta.iter().filter(|m| m.is_chat_message()).count();
        if self.count < self.max_messages {
            return None;
        }
        self.terminated = true;
        Some(StopMessage {
            source: "MaxMessageTermination".to_string(),
            content: format!(
                "Maximum number of messages {} reached, current message count: {}",
                self.max_messages, self.count
            ),
        })
    }

    fn terminated(&self) -> bool {
        self.terminated
    }

    fn reset(&mut self) {
        self.count = 0;
        self.terminated = false;
    }

    fn dump_config(&self) -> TerminationConfig {
        TerminationConfig::MaxMessageTermination {
            max_messages: self.max_messages,
        }
    }
}

/// Stops when someone hands off to `target`
pub struct HandoffTermination {
    target: String,
    terminated: bool,
}

impl HandoffTermination {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            terminated: false,
        }
    }
}

impl TerminationCondition for HandoffTermination {
    fn check(&mut self, delta: &[ChatEvent]) -> Option<StopMessage> {
        if self.terminated {
            return None;
        }
        let handoff = delta.iter().find_map(|m| match m {
            ChatEvent::HandoffMessage(h) if h.target == self.target => Some(h),
            _ => None,
        })?;
        self.terminated = true;
        Some(StopMessage {
            source: "HandoffTermination".to_string(),
            content: format!(
                "Handoff to {} from {} detected.",
                self.target, handoff.source
            ),
        })
    }

    fn terminated(&self) -> bool {
        self.terminated
    }

    fn reset(&mut self) {
        self.terminated = false;
    }

    fn dump_config(&self) -> TerminationConfig {
        TerminationConfig::HandoffTermination {
            target: self.target.clone(),
        }
    }
}

/// Stops when any member condition stops
pub struct OrTermination {
    conditions: Vec<Box<dyn TerminationCondition>>,
}

impl OrTermination {
    pub fn new(conditions: Vec<Box<dyn TerminationCondition>>) -> Self {
        Self { conditions }
    }
}

impl TerminationCondition for OrTermination {
    fn check(&mut self, delta: &[ChatEvent]) -> Option<StopMessage> {
        if self.terminated() {
            return None;
        }
        // Every member sees the delta so counters stay accurate.
        let stops: Vec<StopMessage> = self
            .conditions
            .iter_mut()
            .filter_map(|c| c.check(delta))
            .collect();
        if stops.is_empty() {
            return None;
        }
        Some(StopMessage {
            source: stops
                .iter()
                .map(|s| s.source.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            content: stops
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        })
    }

    fn terminated(&self) -> bool {
        self.conditions.iter().any(|c| c.terminated())
    }

    fn reset(&mut self) {
        for condition in &mut self.conditions {
            condition.reset();
        }
    }

    fn dump_config(&self) -> TerminationConfig {
        TerminationConfig::OrTerminationCondition {
            conditions: self.conditions.iter().map(|c| c.dump_config()).collect(),
        }
    }
}

macro_rules! impl_bitor {
    ($($ty:ty),*) => {
        $(
            impl<R: TerminationCondition + 'static> BitOr<R> for $ty {
                type Output = OrTermination;

                fn bitor(self, rhs: R) -> OrTermination {
                    OrTermination::new(vec![Box::new(self), Box::new(rhs)])
                }
            }
        )*
    };
}

impl_bitor!(TextMentionTermination, MaxMessageTermination, HandoffTermination);

impl<R: TerminationCondition + 'static> BitOr<R> for OrTermination {
    type Output = OrTermination;

    fn bitor(mut self, rhs: R) -> OrTermination {
        self.conditions.push(Box::new(rhs));
        self
    }
}
