use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::interaction::{Interaction, InteractionKind, ATTR_INPUT_REF, ATTR_INTERACTION_ID, ATTR_INTERACTION_KIND};
use crate::dom::{Dom, ElementData};

/// A raw click reported by a client: the element that was hit plus the
/// current values of inputs on the surface, keyed by their `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    pub target: u64,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

impl UiEvent {
    pub fn click(target: u64) -> Self {
        Self { target, inputs: HashMap::new() }
    }

    pub fn with_input(mut self, input_id: &str, value: &str) -> Self {
        self.inputs.insert(input_id.to_string(), value.to_string());
        self
    }
}

/// Walks from the event target up to the root and builds the interaction
/// for the nearest element carrying an interaction id. `None` means the event
/// should be ignored.
pub fn resolve(dom: &Dom, event: &UiEvent, sequence_index: u32) -> Option<Interaction> {
    let tagged = dom
        .ancestors(event.target)
        .into_iter()
        .find(|el| el.attr(ATTR_INTERACTION_ID).is_some_and(|id| !id.trim().is_empty()))?;

    let id = tagged.attr(ATTR_INTERACTION_ID)?.trim();
    let kind = InteractionKind::resolve(tagged.attr(ATTR_INTERACTION_KIND), id);
    let value = resolve_value(dom, tagged, event);
    Some(Interaction::new(id, kind, value, Some(sequence_index)))
}

fn resolve_value(dom: &Dom, tagged: &ElementData, event: &UiEvent) -> Option<String> {
    match tagged.attr(ATTR_INPUT_REF) {
        Some(input_id) => event.inputs.get(input_id).cloned().or_else(|| {
            dom.find_by_html_id(input_id).and_then(|input| match input.attr("value") {
                Some(value) => Some(value.to_string()),
                None if input.tag_name == "textarea" => Some(input.text_content()),
                None => None,
            })
        }),
        None => Some(tagged.text_content()),
    }
}

/// What the session does with an accepted interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer selection: coalesced by the debouncer before one generation call
    Debounced,
    Restart,
    NavigateAway,
    /// Generation call with the current context, no debounce
    Immediate,
}

impl Route {
    pub fn for_kind(kind: &InteractionKind) -> Self {
        match kind {
            k if k.is_answer() => Route::Debounced,
            InteractionKind::Restart => Route::Restart,
            InteractionKind::NavigateAway => Route::NavigateAway,
            _ => Route::Immediate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    InFlight(String),
    ProcessingAnswer,
    Duplicate(String),
    /// Answer arrived after the final step
    Finished,
    /// A non-answer interaction arrived while an answer waits in the debouncer
    AnswerPending,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::InFlight(trigger) => write!(f, "generation for '{}' is still in flight", trigger),
            Rejection::ProcessingAnswer => write!(f, "an answer is being processed"),
            Rejection::Duplicate(id) => write!(f, "'{}' was the last dispatched interaction", id),
            Rejection::Finished => write!(f, "the assessment is already finished"),
            Rejection::AnswerPending => write!(f, "an answer is waiting to be applied"),
        }
    }
}

/// In-flight and duplicate markers of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchGuard {
    in_flight: Option<String>,
    processing_answer: bool,
    last_dispatched: Option<String>,
}

impl DispatchGuard {
    /// Accepts or rejects `id`. On acceptance the id becomes the last
    /// dispatched one immediately, before any asynchronous work starts.
    pub fn admit(&mut self, id: &str) -> Result<(), Rejection> {
        if let Some(trigger) = &self.in_flight {
            return Err(Rejection::InFlight(trigger.clone()));
        }
        if self.processing_answer {
            return Err(Rejection::ProcessingAnswer);
        }
        if self.last_dispatched.as_deref() == Some(id) {
            return Err(Rejection::Duplicate(id.to_string()));
        }
        self.last_dispatched = Some(id.to_string());
        Ok(())
    }

    pub fn begin_answer(&mut self) {
        self.processing_answer = true;
    }

    pub fn begin_call(&mut self, trigger: &str) {
        self.in_flight = Some(trigger.to_string());
    }

    /// Clears every marker. Runs after each generation call regardless of
    /// its outcome.
    pub fn complete(&mut self) {
        self.in_flight = None;
        self.processing_answer = false;
        self.last_dispatched = None;
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.processing_answer
    }

    pub fn last_dispatched(&self) -> Option<&str> {
        self.last_dispatched.as_deref()
    }
}
