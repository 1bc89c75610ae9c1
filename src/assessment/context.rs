use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use super::interaction::Interaction;
use crate::config::ProfileConfig;

/// Ambient learner fields used by the prompt and fallback builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub display_name: String,
    pub role: String,
    pub focus_skill: String,
}

impl From<&ProfileConfig> for UserProfile {
    fn from(config: &ProfileConfig) -> Self {
        Self {
            display_name: config.display_name.clone(),
            role: config.role.clone(),
            focus_skill: config.focus_skill.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentResult {
    pub answered: u32,
    pub step_count: u32,
    pub completion_percent: u32,
    /// Mean answer score scaled to 0..=100, where every `opt-a` scores 0 and
    /// every `opt-d` scores 100.
    pub proficiency_percent: u32,
    pub level: String,
}

/// Answer score in tenths of a point. Options run from least (`opt-a`) to
/// most (`opt-d`) proficient; free-text answers sit in the middle.
fn answer_score(answer_id: &str) -> u32 {
    match answer_id {
        "opt-a" => 10,
        "opt-b" => 20,
        "opt-c" => 30,
        "opt-d" => 40,
        _ => 25,
    }
}

impl AssessmentResult {
    pub fn compute(answers: &BTreeMap<String, String>, step_count: u32) -> Self {
        let scores: Vec<u32> = (1..=step_count)
            .filter_map(|step| answers.get(&step_key(step)))
            .map(|id| answer_score(id))
            .collect();
        let answered = scores.len() as u32;
        let completion_percent = if step_count == 0 { 0 } else { answered * 100 / step_count };
        let proficiency_percent = if answered == 0 {
            0
        } else {
            let total: u32 = scores.iter().sum();
            (total - 10 * answered) * 100 / (30 * answered)
        };
        let level = match proficiency_percent {
            80.. => "advanced",
            50..=79 => "intermediate",
            _ => "foundational",
        };
        Self {
            answered,
            step_count,
            completion_percent,
            proficiency_percent,
            level: level.to_string(),
        }
    }
}

pub fn step_key(step: u32) -> String {
    format!("step-{}", step)
}

/// The pending change an answer selection makes to the context. Either the
/// whole mutation is applied or none of it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerMutation {
    pub step_key: String,
    pub interaction: Interaction,
}

/// Accumulated state handed to the generator for one session.
///
/// `step_index` only moves forward (until [`GenerationContext::reset`]) and
/// `result` is set exactly when `step_index > step_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    step_index: u32,
    step_count: u32,
    history: VecDeque<Interaction>,
    answers: BTreeMap<String, String>,
    result: Option<AssessmentResult>,
    #[serde(skip)]
    history_limit: usize,
}

impl GenerationContext {
    pub fn new(step_count: u32, history_limit: usize) -> Self {
        Self {
            step_index: 1,
            step_count: step_count.max(1),
            history: VecDeque::new(),
            answers: BTreeMap::new(),
            result: None,
            history_limit: history_limit.max(1),
        }
    }

    pub fn step_index(&self) -> u32 {
        self.step_index
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn history(&self) -> &VecDeque<Interaction> {
        &self.history
    }

    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.step_index > self.step_count
    }

    pub fn current_step_key(&self) -> String {
        step_key(self.step_index)
    }

    /// Appends to the bounded history, evicting the oldest entries.
    pub fn record(&mut self, interaction: Interaction) {
        self.history.push_back(interaction);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    pub fn answer_mutation(&self, interaction: Interaction) -> AnswerMutation {
        AnswerMutation {
            step_key: self.current_step_key(),
            interaction,
        }
    }

    /// Records the answer, advances one step and computes the result once the
    /// step count is exceeded. Returns false (and changes nothing) when the
    /// session is already terminal.
    pub fn apply(&mut self, mutation: AnswerMutation) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.answers.insert(mutation.step_key, mutation.interaction.id.clone());
        self.record(mutation.interaction);
        self.step_index += 1;
        if self.is_terminal() {
            self.result = Some(AssessmentResult::compute(&self.answers, self.step_count));
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.step_count, self.history_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::interaction::InteractionKind;

    fn answer(id: &str) -> Interaction {
        Interaction::new(id, InteractionKind::OptionSelect, None, None)
    }

    #[test]
    fn test_new_context() {
        let ctx = GenerationContext::new(5, 10);
        assert_eq!(ctx.step_index(), 1);
        assert_eq!(ctx.step_count(), 5);
        assert!(ctx.result().is_none());
        assert!(!ctx.is_terminal());
    }

    #[test]
    fn test_apply_advances_and_records() {
        let mut ctx = GenerationContext::new(5, 10);
        let mutation = ctx.answer_mutation(answer("opt-b"));
        assert!(ctx.apply(mutation));
        assert_eq!(ctx.step_index(), 2);
        assert_eq!(ctx.answers().get("step-1").map(String::as_str), Some("opt-b"));
        assert_eq!(ctx.history().back().unwrap().id, "opt-b");
        assert!(ctx.result().is_none());
    }

    #[test]
    fn test_terminal_transition_sets_result() {
        let mut ctx = GenerationContext::new(2, 10);
        ctx.apply(ctx.answer_mutation(answer("opt-a")));
        assert!(!ctx.is_terminal());
        assert!(ctx.result().is_none());
        ctx.apply(ctx.answer_mutation(answer("opt-c")));
        assert_eq!(ctx.step_index(), 3);
        assert!(ctx.is_terminal());
        let result = ctx.result().unwrap();
        assert_eq!(result.answered, 2);
        assert_eq!(result.completion_percent, 100);
        assert_eq!(result.proficiency_percent, 33);
        assert_eq!(result.level, "foundational");
    }

    #[test]
    fn test_apply_after_terminal_is_noop() {
        let mut ctx = GenerationContext::new(1, 10);
        ctx.apply(ctx.answer_mutation(answer("opt-a")));
        let before = ctx.clone();
        assert!(!ctx.apply(ctx.answer_mutation(answer("opt-b"))));
        assert_eq!(ctx, before);
        assert_eq!(ctx.step_index(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ctx = GenerationContext::new(5, 3);
        for id in ["a", "b", "c", "d", "e"] {
            ctx.record(answer(id));
        }
        let ids: Vec<&str> = ctx.history().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "e"]);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut ctx = GenerationContext::new(2, 4);
        ctx.apply(ctx.answer_mutation(answer("opt-a")));
        ctx.apply(ctx.answer_mutation(answer("opt-b")));
        ctx.reset();
        assert_eq!(ctx, GenerationContext::new(2, 4));
    }

    #[test]
    fn test_result_levels() {
        let mut answers = BTreeMap::new();
        let empty = AssessmentResult::compute(&answers, 4);
        assert_eq!(empty.proficiency_percent, 0);
        assert_eq!(empty.level, "foundational");
        answers.insert(step_key(1), "opt-d".to_string());
        answers.insert(step_key(2), "opt-c".to_string());
        let result = AssessmentResult::compute(&answers, 4);
        assert_eq!(result.completion_percent, 50);
        assert_eq!(result.proficiency_percent, 83);
        assert_eq!(result.level, "advanced");
        // Keys outside the step range don't count.
        answers.insert(step_key(9), "opt-a".to_string());
        assert_eq!(AssessmentResult::compute(&answers, 4).answered, 2);
    }

    fn run_through(ctx: &mut GenerationContext, id: &str) -> AssessmentResult {
        while !ctx.is_terminal() {
            ctx.apply(ctx.answer_mutation(answer(id)));
        }
        ctx.result().cloned().unwrap()
    }

    #[test]
    fn test_level_follows_chosen_options() {
        let weakest = run_through(&mut GenerationContext::new(5, 10), "opt-a");
        let strongest = run_through(&mut GenerationContext::new(5, 10), "opt-d");
        assert_eq!(weakest.completion_percent, 100);
        assert_eq!(strongest.completion_percent, 100);
        assert_eq!(weakest.proficiency_percent, 0);
        assert_eq!(strongest.proficiency_percent, 100);
        assert_eq!(weakest.level, "foundational");
        assert_eq!(strongest.level, "advanced");
        assert_ne!(weakest, strongest);
    }

    #[test]
    fn test_free_text_answers_score_in_the_middle() {
        let mut ctx = GenerationContext::new(3, 10);
        let typed = Interaction::new("submit-answer", InteractionKind::Submit, Some("joins".into()), Some(1));
        while !ctx.is_terminal() {
            ctx.apply(ctx.answer_mutation(typed.clone()));
        }
        let result = ctx.result().unwrap();
        assert_eq!(result.proficiency_percent, 50);
        assert_eq!(result.level, "intermediate");
    }
}
