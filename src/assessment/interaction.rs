use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Carries the stable interaction identifier of an actionable element.
pub const ATTR_INTERACTION_ID: &str = "data-interaction-id";
/// Optional explicit classification of the interaction.
pub const ATTR_INTERACTION_KIND: &str = "data-interaction-kind";
/// Points at the `id` of an input whose value is read at click time.
pub const ATTR_INPUT_REF: &str = "data-input-ref";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    OptionSelect,
    Submit,
    Navigation,
    Restart,
    NavigateAway,
    Other(String),
}

impl InteractionKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "option-select" | "option" | "answer" => InteractionKind::OptionSelect,
            "submit" => InteractionKind::Submit,
            "navigation" | "navigate" => InteractionKind::Navigation,
            "restart" => InteractionKind::Restart,
            "navigate-away" | "exit" => InteractionKind::NavigateAway,
            other => InteractionKind::Other(other.to_string()),
        }
    }

    /// Classification used when the markup carries no explicit kind.
    pub fn infer(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        if id.starts_with("opt-") || id.starts_with("answer-") {
            InteractionKind::OptionSelect
        } else if id.starts_with("submit") {
            InteractionKind::Submit
        } else if id.starts_with("restart") {
            InteractionKind::Restart
        } else if id == "navigate-away" || id.starts_with("exit") || id.starts_with("back-to-") {
            InteractionKind::NavigateAway
        } else {
            InteractionKind::Navigation
        }
    }

    pub fn resolve(explicit: Option<&str>, id: &str) -> Self {
        match explicit.filter(|k| !k.trim().is_empty()) {
            Some(kind) => Self::parse(kind),
            None => Self::infer(id),
        }
    }

    /// Answer selections go through the debouncer.
    pub fn is_answer(&self) -> bool {
        matches!(self, InteractionKind::OptionSelect | InteractionKind::Submit)
    }

    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::OptionSelect => "option-select",
            InteractionKind::Submit => "submit",
            InteractionKind::Navigation => "navigation",
            InteractionKind::Restart => "restart",
            InteractionKind::NavigateAway => "navigate-away",
            InteractionKind::Other(kind) => kind,
        }
    }
}

/// One user-originated event aimed at a piece of content. Never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub value: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub sequence_index: Option<u32>,
}

impl Interaction {
    pub fn new(id: &str, kind: InteractionKind, value: Option<String>, sequence_index: Option<u32>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            value: value.filter(|v| !v.trim().is_empty()),
            timestamp: Utc::now(),
            sequence_index,
        }
    }
}
