use minijinja::Environment;
use once_cell::sync::Lazy;
use serde::Serialize;

static STEP_TEMPLATE: &str = include_str!("step.html");
static SUMMARY_TEMPLATE: &str = include_str!("summary.html");

pub const STEP: &str = "step.html";
pub const SUMMARY: &str = "summary.html";

static JINJA_ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template(STEP, STEP_TEMPLATE)
        .expect("embedded step template is valid");
    env.add_template(SUMMARY, SUMMARY_TEMPLATE)
        .expect("embedded summary template is valid");
    env
});

/// Renders one of the embedded templates. Both templates are compiled into
/// the binary, so a failure here is a programming error.
pub fn render<S: Serialize>(name: &str, context: S) -> String {
    let tmpl = JINJA_ENV
        .get_template(name)
        .unwrap_or_else(|e| panic!("embedded template {} is missing: {}", name, e));
    tmpl.render(context)
        .unwrap_or_else(|e| panic!("embedded template {} failed to render: {}", name, e))
}
