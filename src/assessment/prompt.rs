use std::fmt::Write;

use super::context::{GenerationContext, UserProfile};
use crate::config::GeneratorConfig;

/// Structural rules every generated fragment must follow so that the
/// sanitizer keeps it intact and the dispatcher can resolve clicks on it.
pub const STYLE_CONTRACT: &str = "\
You produce one HTML fragment for an interactive skill assessment.
Rules:
- Output only the fragment. No <html>, <head> or <body>, no markdown fences.
- Use only these tags: section, header, h2, h3, p, ul, ol, li, dl, dt, dd, div, span, strong, em, code, pre, label, input, textarea, button, progress.
- Never include <script>, <style>, <iframe>, inline event handlers or style attributes.
- Every actionable element carries data-interaction-id with a stable id.
- Answer options are buttons with data-interaction-id=\"opt-a\" to \"opt-d\" and data-interaction-kind=\"option-select\".
- A free-text answer uses <input id=\"free-answer-N\"> plus a button with data-interaction-id=\"submit-answer\", data-interaction-kind=\"submit\" and data-input-ref=\"free-answer-N\".
- A results view offers buttons with data-interaction-id=\"restart\" and data-interaction-id=\"navigate-away\".
- Wrap the whole fragment in <section data-step=\"N\"> where N is the current step.";

/// Payload for one remote generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub instruction: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

pub fn build_request(context: &GenerationContext, profile: &UserProfile, settings: &GeneratorConfig) -> GenerationRequest {
    GenerationRequest {
        system: STYLE_CONTRACT.to_string(),
        instruction: build_instruction(context, profile),
        temperature: settings.temperature,
        max_output_tokens: settings.max_output_tokens,
    }
}

pub fn build_instruction(context: &GenerationContext, profile: &UserProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Learner: {} ({}), focus skill: {}.",
        profile.display_name, profile.role, profile.focus_skill
    );

    match context.result() {
        Some(result) if context.is_terminal() => {
            let _ = writeln!(
                out,
                "The assessment is complete. Render a results summary, not a question. \
                 Answered {} of {} steps ({}%), proficiency {}%, suggested level: {}.",
                result.answered,
                result.step_count,
                result.completion_percent,
                result.proficiency_percent,
                result.level
            );
        }
        _ => {
            let _ = writeln!(
                out,
                "Render question {} of {} about {}, adapted to the answers so far.",
                context.step_index(),
                context.step_count(),
                profile.focus_skill
            );
        }
    }

    if !context.answers().is_empty() {
        out.push_str("Answers:\n");
        for (step, choice) in context.answers() {
            let _ = writeln!(out, "- {}: {}", step, choice);
        }
    }

    if !context.history().is_empty() {
        out.push_str("Recent interactions (oldest first):\n");
        for interaction in context.history() {
            let _ = write!(out, "- {} {}", interaction.kind.as_str(), interaction.id);
            if let Some(value) = &interaction.value {
                let _ = write!(out, " \"{}\"", value);
            }
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::interaction::{Interaction, InteractionKind};

    fn profile() -> UserProfile {
        UserProfile {
            display_name: "Ada".to_string(),
            role: "Data Analyst".to_string(),
            focus_skill: "SQL".to_string(),
        }
    }

    #[test]
    fn test_first_step_instruction() {
        let ctx = GenerationContext::new(5, 10);
        let text = build_instruction(&ctx, &profile());
        assert!(text.contains("Learner: Ada (Data Analyst), focus skill: SQL."));
        assert!(text.contains("question 1 of 5"));
        assert!(!text.contains("Answers:"));
        assert!(!text.contains("Recent interactions"));
    }

    #[test]
    fn test_history_and_answers_are_listed() {
        let mut ctx = GenerationContext::new(5, 10);
        let chosen = Interaction::new("opt-b", InteractionKind::OptionSelect, Some("Joins".into()), Some(1));
        ctx.apply(ctx.answer_mutation(chosen));
        let text = build_instruction(&ctx, &profile());
        assert!(text.contains("question 2 of 5"));
        assert!(text.contains("- step-1: opt-b"));
        assert!(text.contains("- option-select opt-b \"Joins\""));
    }

    #[test]
    fn test_terminal_instruction_requests_summary() {
        let mut ctx = GenerationContext::new(1, 10);
        ctx.apply(ctx.answer_mutation(Interaction::new("opt-a", InteractionKind::OptionSelect, None, None)));
        let text = build_instruction(&ctx, &profile());
        assert!(text.contains("results summary, not a question"));
        assert!(text.contains("proficiency 0%, suggested level: foundational"));
        assert!(!text.contains("Render question"));
    }

    #[test]
    fn test_request_uses_settings() {
        let settings = GeneratorConfig {
            temperature: 0.2,
            max_output_tokens: 512,
            ..GeneratorConfig::default()
        };
        let request = build_request(&GenerationContext::new(5, 10), &profile(), &settings);
        assert_eq!(request.system, STYLE_CONTRACT);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_output_tokens, 512);
    }
}
