use crate::assessment::dispatcher::{self, UiEvent};
use crate::assessment::interaction::{Interaction, InteractionKind, ATTR_INTERACTION_ID, ATTR_INTERACTION_KIND};
use crate::dom::{parser, render, Dom};
use crate::errors::GenerationError;
use crate::sanitize;

/// The rendered content region of one session.
///
/// Content is always replaced wholesale. Events only resolve while a listener
/// is attached, and at most one listener exists at a time.
#[derive(Debug)]
pub struct ContentSurface {
    dom: Dom,
    listener: Option<String>,
}

impl Default for ContentSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSurface {
    pub fn new() -> Self {
        Self {
            dom: Dom::empty(),
            listener: None,
        }
    }

    /// Attaches the click listener. Returns false if one was already attached.
    pub fn attach(&mut self, listener: &str) -> bool {
        if self.listener.is_some() {
            log::warn!("Content surface already has a listener, ignoring {}", listener);
            return false;
        }
        self.listener = Some(listener.to_string());
        true
    }

    pub fn detach(&mut self) -> bool {
        self.listener.take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// Installs generated content. The previous content stays in place when
    /// nothing actionable survives sanitizing, or when a summary was due and
    /// the content offers no way to restart or leave.
    pub fn replace_generated(&mut self, raw: &str, summary_due: bool) -> Result<(), GenerationError> {
        let clean = sanitize::sanitize_dom(&parser::parse_fragment(raw));
        if clean.is_blank() {
            return Err(GenerationError::InvalidResponse("content was empty after sanitizing".to_string()));
        }
        if !has_interactions(&clean) {
            return Err(GenerationError::InvalidResponse("content has no actionable elements".to_string()));
        }
        if summary_due && !offers_exit(&clean) {
            return Err(GenerationError::InvalidResponse("summary has no restart or exit action".to_string()));
        }
        self.dom = clean;
        Ok(())
    }

    /// Installs locally built content. It still goes through the sanitizer so
    /// every source obeys the same markup rules.
    pub fn replace_trusted(&mut self, html: &str) {
        self.dom = sanitize::sanitize_dom(&parser::parse_fragment(html));
    }

    /// Current content with node ids stamped for click reporting.
    pub fn render(&self) -> String {
        render::to_html(&self.dom, true)
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn resolve(&self, event: &UiEvent, sequence_index: u32) -> Option<Interaction> {
        if !self.is_attached() {
            log::trace!("Surface detached, dropping event on node {}", event.target);
            return None;
        }
        dispatcher::resolve(&self.dom, event, sequence_index)
    }
}

fn has_interactions(dom: &Dom) -> bool {
    dom.elements().iter().any(|el| el.attr(ATTR_INTERACTION_ID).is_some())
}

fn offers_exit(dom: &Dom) -> bool {
    dom.elements().iter().any(|el| match el.attr(ATTR_INTERACTION_ID) {
        Some(id) => matches!(
            InteractionKind::resolve(el.attr(ATTR_INTERACTION_KIND), id),
            InteractionKind::Restart | InteractionKind::NavigateAway
        ),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"<section><p><span>Pick</span></p><button data-interaction-id="opt-a">A</button></section>"#;

    fn node_with_tag(surface: &ContentSurface, tag: &str) -> u64 {
        surface
            .dom()
            .elements()
            .into_iter()
            .find(|el| el.tag_name == tag)
            .map(|el| el.id)
            .unwrap()
    }

    #[test]
    fn test_single_listener() {
        let mut surface = ContentSurface::new();
        assert!(surface.attach("session-1"));
        assert!(!surface.attach("session-2"));
        assert!(surface.detach());
        assert!(!surface.detach());
        assert!(surface.attach("session-2"));
    }

    #[test]
    fn test_detached_surface_ignores_events() {
        let mut surface = ContentSurface::new();
        surface.replace_trusted(CONTENT);
        let button = node_with_tag(&surface, "button");
        assert!(surface.resolve(&UiEvent::click(button), 1).is_none());
        surface.attach("s");
        assert_eq!(surface.resolve(&UiEvent::click(button), 1).unwrap().id, "opt-a");
    }

    #[test]
    fn test_generated_content_is_sanitized() {
        let mut surface = ContentSurface::new();
        surface
            .replace_generated(r#"<section><script>alert(1)</script><button onclick="x()" data-interaction-id="go">Go</button></section>"#, false)
            .unwrap();
        let html = surface.render();
        assert!(!html.contains("script"));
        assert!(!html.contains("onclick"));
        assert!(html.contains(r#"data-interaction-id="go""#));
        assert!(html.contains("data-node-id="));
    }

    #[test]
    fn test_unusable_content_keeps_previous() {
        let mut surface = ContentSurface::new();
        surface.replace_trusted(CONTENT);
        let before = surface.render();
        assert!(matches!(
            surface.replace_generated("<script>only()</script>", false),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            surface.replace_generated("<p>No buttons here</p>", false),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert_eq!(surface.render(), before);
    }

    #[test]
    fn test_summary_requires_exit_action() {
        let mut surface = ContentSurface::new();
        assert!(matches!(
            surface.replace_generated(r#"<button data-interaction-id="opt-a">A</button>"#, true),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(surface.replace_generated(r#"<p>Done</p><button data-interaction-id="restart">Again</button>"#, true).is_ok());
        assert!(surface
            .replace_generated(r#"<button data-interaction-id="home" data-interaction-kind="navigate-away">Home</button>"#, true)
            .is_ok());
    }

    #[test]
    fn test_untagged_target_resolves_to_nothing() {
        let mut surface = ContentSurface::new();
        surface.replace_trusted(CONTENT);
        surface.attach("s");
        let span = node_with_tag(&surface, "span");
        assert!(surface.resolve(&UiEvent::click(span), 1).is_none());
    }
}
