use serde::Serialize;

use super::context::{GenerationContext, UserProfile};
use crate::templates;

struct Question {
    prompt: &'static str,
    options: [&'static str; 4],
}

/// `{skill}` is replaced with the learner's focus skill.
const QUESTION_BANK: &[Question] = &[
    Question {
        prompt: "How confident are you applying {skill} to a task you have not seen before?",
        options: [
            "I would need step-by-step guidance",
            "I could start but would get stuck",
            "I could finish it with some research",
            "I could finish it and explain my choices",
        ],
    },
    Question {
        prompt: "A teammate asks you to review work that relies on {skill}. What do you do first?",
        options: [
            "Ask someone more experienced to review it",
            "Check that it runs and looks reasonable",
            "Compare it against the requirements line by line",
            "Review it and suggest a simpler alternative",
        ],
    },
    Question {
        prompt: "Which best describes how you learn new aspects of {skill}?",
        options: [
            "Following a course from start to finish",
            "Copying working examples and adapting them",
            "Reading reference material when I need it",
            "Building something and reading the source",
        ],
    },
    Question {
        prompt: "When something goes wrong while using {skill}, how do you usually find the cause?",
        options: [
            "I ask for help right away",
            "I try changes until it works",
            "I narrow it down with small experiments",
            "I form a hypothesis and test it directly",
        ],
    },
    Question {
        prompt: "How often do you use {skill} in your day-to-day work?",
        options: ["Rarely", "A few times a month", "Every week", "Every day"],
    },
];

const OPTION_IDS: [&str; 4] = ["opt-a", "opt-b", "opt-c", "opt-d"];

#[derive(Serialize)]
struct OptionView {
    id: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct StepView<'a> {
    step_index: u32,
    step_count: u32,
    question: String,
    options: Vec<OptionView>,
    input_id: String,
    role: &'a str,
    focus_skill: &'a str,
}

#[derive(Serialize)]
struct SummaryView<'a> {
    step_index: u32,
    display_name: &'a str,
    role: &'a str,
    focus_skill: &'a str,
    result: &'a super::context::AssessmentResult,
}

/// Builds local content for the current context. The output depends only on
/// the step position, the recorded answers and the profile, and follows the
/// same markup contract as generated content.
pub fn build_fallback(context: &GenerationContext, profile: &UserProfile) -> String {
    match context.result() {
        Some(result) if context.is_terminal() => templates::render(
            templates::SUMMARY,
            SummaryView {
                step_index: context.step_index(),
                display_name: &profile.display_name,
                role: &profile.role,
                focus_skill: &profile.focus_skill,
                result,
            },
        ),
        _ => build_step(context, profile),
    }
}

fn build_step(context: &GenerationContext, profile: &UserProfile) -> String {
    let step = context.step_index().min(context.step_count());
    let question = &QUESTION_BANK[(step as usize - 1) % QUESTION_BANK.len()];
    let options = OPTION_IDS
        .iter()
        .zip(question.options.iter())
        .map(|(id, label)| OptionView { id: *id, label: *label })
        .collect();

    templates::render(
        templates::STEP,
        StepView {
            step_index: step,
            step_count: context.step_count(),
            question: question.prompt.replace("{skill}", &profile.focus_skill),
            options,
            input_id: format!("free-answer-{}", step),
            role: &profile.role,
            focus_skill: &profile.focus_skill,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::interaction::{Interaction, InteractionKind};
    use crate::dom::parser::parse_fragment;
    use crate::sanitize::sanitize_html;

    fn profile() -> UserProfile {
        UserProfile {
            display_name: "Ada".to_string(),
            role: "Data Analyst".to_string(),
            focus_skill: "SQL".to_string(),
        }
    }

    fn advance(ctx: &mut GenerationContext, times: u32) {
        for _ in 0..times {
            let mutation = ctx.answer_mutation(Interaction::new("opt-b", InteractionKind::OptionSelect, None, None));
            ctx.apply(mutation);
        }
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let mut ctx = GenerationContext::new(5, 10);
        advance(&mut ctx, 2);
        assert_eq!(build_fallback(&ctx, &profile()), build_fallback(&ctx, &profile()));
    }

    #[test]
    fn test_step_view_carries_position_and_profile() {
        let mut ctx = GenerationContext::new(5, 10);
        advance(&mut ctx, 1);
        let html = build_fallback(&ctx, &profile());
        assert!(html.contains("Question 2 of 5"));
        assert!(html.contains("SQL"));
        assert!(html.contains(r#"data-interaction-id="opt-d""#));
        assert!(html.contains(r#"data-input-ref="free-answer-2""#));
        assert!(!html.contains("assessment-summary"));
    }

    #[test]
    fn test_terminal_context_renders_summary() {
        let mut ctx = GenerationContext::new(5, 10);
        advance(&mut ctx, 5);
        assert_eq!(ctx.step_index(), 6);
        let html = build_fallback(&ctx, &profile());
        assert!(html.contains("assessment-summary"));
        assert!(html.contains("Assessment complete, Ada"));
        assert!(html.contains("5 of 5"));
        assert!(html.contains(r#"data-interaction-id="restart""#));
        assert!(!html.contains("Question 6 of 5"));
    }

    #[test]
    fn test_fallback_survives_sanitizer() {
        let ctx = GenerationContext::new(5, 10);
        let html = build_fallback(&ctx, &profile());
        let clean = sanitize_html(&html);
        let dom = parse_fragment(&clean);
        let ids: Vec<_> = dom
            .elements()
            .into_iter()
            .filter_map(|el| el.attr("data-interaction-id"))
            .map(str::to_string)
            .collect();
        assert_eq!(ids, vec!["opt-a", "opt-b", "opt-c", "opt-d", "submit-answer"]);
        assert!(dom.find_by_html_id("free-answer-1").is_some());
    }

    #[test]
    fn test_profile_text_is_escaped() {
        let ctx = GenerationContext::new(5, 10);
        let mut p = profile();
        p.focus_skill = "<script>x</script>".to_string();
        let html = build_fallback(&ctx, &p);
        assert!(!html.contains("<script>"));
    }
}
