use actix::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::actors::health::{HealthActor, ReportFallback, ReportGenerationLatency};
use crate::assessment::context::{AnswerMutation, AssessmentResult, GenerationContext, UserProfile};
use crate::assessment::debounce::{Debounce, Debouncer};
use crate::assessment::dispatcher::{DispatchGuard, Rejection, Route, UiEvent};
use crate::assessment::fallback::build_fallback;
use crate::assessment::interaction::Interaction;
use crate::assessment::prompt::build_request;
use crate::config::{Config, GeneratorConfig};
use crate::errors::{GenerationError, Notification};
use crate::generator::ContentGenerator;
use crate::surface::ContentSurface;

const START_TRIGGER: &str = "session-start";

// --- Messages ---

/// Attaches the surface and requests the first step.
#[derive(Message)]
#[rtype(result = "()")]
pub struct StartSession;

#[derive(Message)]
#[rtype(result = "()")]
pub struct Dispatch(pub UiEvent);

#[derive(Message)]
#[rtype(result = "SessionSnapshot")]
pub struct GetSnapshot;

/// Detaches the surface, drops any pending answer and stops the session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Teardown;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Generated,
    Fallback,
    Local,
}

/// Everything a session reports to its client.
#[derive(Message, Serialize, Clone, Debug, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    ContentReplaced {
        html: String,
        source: ContentSource,
        step_index: u32,
        step_count: u32,
        terminal: bool,
    },
    Notice(Notification),
    Navigate { destination: String },
}

#[derive(Serialize, Clone, Debug)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub step_index: u32,
    pub step_count: u32,
    pub terminal: bool,
    pub answers: BTreeMap<String, String>,
    pub history: Vec<Interaction>,
    pub result: Option<AssessmentResult>,
    pub in_flight: Option<String>,
    pub last_dispatched: Option<String>,
    pub answer_pending: bool,
    pub html: String,
}

// --- Actor ---

/// One learner's assessment. The actor mailbox serializes every event, timer
/// and generation result, so the context is only ever touched from here.
pub struct AssessmentSession {
    id: String,
    generator: Arc<dyn ContentGenerator>,
    generator_settings: GeneratorConfig,
    exit_destination: String,
    profile: UserProfile,
    context: GenerationContext,
    guard: DispatchGuard,
    debouncer: Debouncer<AnswerMutation>,
    surface: ContentSurface,
    listener: Recipient<SessionEvent>,
    health: Option<Addr<HealthActor>>,
}

impl AssessmentSession {
    pub fn new(config: &Config, generator: Arc<dyn ContentGenerator>, listener: Recipient<SessionEvent>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            generator,
            generator_settings: config.generator.clone(),
            exit_destination: config.session.exit_destination.clone(),
            profile: UserProfile::from(&config.profile),
            context: GenerationContext::new(config.session.step_count, config.session.history_limit),
            guard: DispatchGuard::default(),
            debouncer: Debouncer::new(config.session.debounce()),
            surface: ContentSurface::new(),
            listener,
            health: None,
        }
    }

    pub fn with_health(mut self, health: Addr<HealthActor>) -> Self {
        self.health = Some(health);
        self
    }

    fn emit(&self, event: SessionEvent) {
        self.listener.do_send(event);
    }

    fn emit_content(&self, source: ContentSource) {
        self.emit(SessionEvent::ContentReplaced {
            html: self.surface.render(),
            source,
            step_index: self.context.step_index(),
            step_count: self.context.step_count(),
            terminal: self.context.is_terminal(),
        });
    }

    fn admit(&mut self, interaction: &Interaction) -> Result<Route, Rejection> {
        let route = Route::for_kind(&interaction.kind);
        match route {
            Route::Debounced if self.context.is_terminal() => return Err(Rejection::Finished),
            Route::Immediate if self.debouncer.is_pending() => return Err(Rejection::AnswerPending),
            _ => {}
        }
        self.guard.admit(&interaction.id)?;
        Ok(route)
    }

    fn handle_interaction(&mut self, interaction: Interaction, ctx: &mut Context<Self>) {
        let route = match self.admit(&interaction) {
            Ok(route) => route,
            Err(rejection) => {
                log::debug!("[{}] Ignored '{}': {}", self.id, interaction.id, rejection);
                return;
            }
        };
        log::debug!("[{}] Accepted '{}' ({:?})", self.id, interaction.id, route);

        match route {
            Route::Debounced => {
                let mutation = self.context.answer_mutation(interaction);
                self.debouncer.schedule(mutation, ctx);
            }
            Route::Restart => self.restart(ctx),
            Route::NavigateAway => self.navigate_away(ctx),
            Route::Immediate => {
                let trigger = interaction.id.clone();
                self.context.record(interaction);
                self.request_generation(&trigger, ctx);
            }
        }
    }

    fn restart(&mut self, ctx: &mut Context<Self>) {
        self.debouncer.cancel(ctx);
        self.context.reset();
        self.surface.replace_trusted(&build_fallback(&self.context, &self.profile));
        log::info!("[{}] Assessment restarted", self.id);
        self.emit_content(ContentSource::Local);
    }

    fn navigate_away(&mut self, ctx: &mut Context<Self>) {
        self.debouncer.cancel(ctx);
        self.emit(SessionEvent::Navigate {
            destination: self.exit_destination.clone(),
        });
    }

    fn request_generation(&mut self, trigger: &str, ctx: &mut Context<Self>) {
        self.guard.begin_call(trigger);
        let request = build_request(&self.context, &self.profile, &self.generator_settings);
        let generator = self.generator.clone();
        let started = Instant::now();
        log::info!(
            "[{}] Generating step {} of {} (trigger '{}')",
            self.id,
            self.context.step_index(),
            self.context.step_count(),
            trigger
        );

        let call = async move { generator.generate(request).await };
        ctx.spawn(
            call.into_actor(self)
                .map(move |result, act, _ctx| act.finish_generation(result, started)),
        );
    }

    /// Ends a generation cycle. The surface always ends up with content and
    /// the guard is always cleared.
    fn finish_generation(&mut self, result: Result<String, GenerationError>, started: Instant) {
        let summary_due = self.context.is_terminal();
        let outcome = result.and_then(|raw| self.surface.replace_generated(&raw, summary_due));

        match outcome {
            Ok(()) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                log::info!("[{}] Generated content in {:.0}ms", self.id, elapsed_ms);
                if let Some(health) = &self.health {
                    health.do_send(ReportGenerationLatency(elapsed_ms));
                }
                self.emit_content(ContentSource::Generated);
            }
            Err(error) => self.show_fallback(error),
        }

        self.guard.complete();
    }

    fn show_fallback(&mut self, error: GenerationError) {
        if error.is_rate_limited() {
            log::warn!("[{}] Generator quota exhausted, using fallback: {}", self.id, error);
        } else {
            log::error!("[{}] Generation failed, using fallback: {}", self.id, error);
        }
        let notice = error.notification();
        self.surface.replace_trusted(&build_fallback(&self.context, &self.profile));
        if let Some(health) = &self.health {
            health.do_send(ReportFallback(notice.kind));
        }
        self.emit_content(ContentSource::Fallback);
        self.emit(SessionEvent::Notice(notice));
    }
}

impl Actor for AssessmentSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        log::debug!("[{}] Session actor started", self.id);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::info!("[{}] Session closed at step {}", self.id, self.context.step_index());
    }
}

impl Debounce<AnswerMutation> for AssessmentSession {
    fn debouncer(&mut self) -> &mut Debouncer<AnswerMutation> {
        &mut self.debouncer
    }

    /// Applies the last answer of the burst and issues its call in the same
    /// turn of the mailbox.
    fn quiet_period_elapsed(&mut self, mutation: AnswerMutation, ctx: &mut Context<Self>) {
        self.guard.begin_answer();
        let trigger = mutation.interaction.id.clone();
        if !self.context.apply(mutation) {
            log::debug!("[{}] Dropped answer '{}' after the final step", self.id, trigger);
            self.guard.complete();
            return;
        }
        self.request_generation(&trigger, ctx);
    }
}

// --- Handlers ---

impl Handler<StartSession> for AssessmentSession {
    type Result = ();

    fn handle(&mut self, _msg: StartSession, ctx: &mut Context<Self>) {
        if !self.surface.attach(&self.id) {
            log::debug!("[{}] Session already started", self.id);
            return;
        }
        log::info!("[{}] Session started for {}", self.id, self.profile.display_name);
        self.request_generation(START_TRIGGER, ctx);
    }
}

impl Handler<Dispatch> for AssessmentSession {
    type Result = ();

    fn handle(&mut self, msg: Dispatch, ctx: &mut Context<Self>) {
        match self.surface.resolve(&msg.0, self.context.step_index()) {
            Some(interaction) => self.handle_interaction(interaction, ctx),
            None => log::trace!("[{}] No interaction at node {}", self.id, msg.0.target),
        }
    }
}

impl Handler<GetSnapshot> for AssessmentSession {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(SessionSnapshot {
            session_id: self.id.clone(),
            step_index: self.context.step_index(),
            step_count: self.context.step_count(),
            terminal: self.context.is_terminal(),
            answers: self.context.answers().clone(),
            history: self.context.history().iter().cloned().collect(),
            result: self.context.result().cloned(),
            in_flight: self.guard.in_flight().map(str::to_string),
            last_dispatched: self.guard.last_dispatched().map(str::to_string),
            answer_pending: self.debouncer.is_pending(),
            html: self.surface.render(),
        })
    }
}

impl Handler<Teardown> for AssessmentSession {
    type Result = ();

    fn handle(&mut self, _msg: Teardown, ctx: &mut Context<Self>) {
        if self.debouncer.cancel(ctx) {
            log::debug!("[{}] Pending answer discarded on teardown", self.id);
        }
        self.surface.detach();
        ctx.stop();
    }
}
