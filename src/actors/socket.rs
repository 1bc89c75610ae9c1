use actix::dev::Request;
use actix::prelude::*;
use actix_web_actors::ws;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::actors::health::HealthActor;
use crate::actors::session::{AssessmentSession, Dispatch, GetSnapshot, SessionEvent, SessionSnapshot, StartSession, Teardown};
use crate::assessment::dispatcher::UiEvent;
use crate::config::Config;
use crate::generator::ContentGenerator;

/// What a client may send over `/session` or stdin.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Start,
    Click {
        target: u64,
        #[serde(default)]
        inputs: HashMap<String, String>,
    },
    Snapshot,
}

impl ClientMessage {
    /// Forwards the message to a session. Snapshots are answered through the
    /// returned request, everything else is fire and forget.
    pub fn forward(self, session: &Addr<AssessmentSession>) -> Option<Request<AssessmentSession, GetSnapshot>> {
        match self {
            ClientMessage::Start => {
                session.do_send(StartSession);
                None
            }
            ClientMessage::Click { target, inputs } => {
                session.do_send(Dispatch(UiEvent { target, inputs }));
                None
            }
            ClientMessage::Snapshot => Some(session.send(GetSnapshot)),
        }
    }
}

pub fn snapshot_json(snapshot: &SessionSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(&serde_json::json!({ "type": "snapshot", "snapshot": snapshot }))
}

pub fn error_json(message: &str) -> String {
    serde_json::json!({ "type": "error", "message": message }).to_string()
}

/// One WebSocket client. Owns exactly one assessment session for the
/// lifetime of the connection.
pub struct SessionSocket {
    config: Config,
    generator: Arc<dyn ContentGenerator>,
    health: Addr<HealthActor>,
    session: Option<Addr<AssessmentSession>>,
}

impl SessionSocket {
    pub fn new(config: Config, generator: Arc<dyn ContentGenerator>, health: Addr<HealthActor>) -> Self {
        Self {
            config,
            generator,
            health,
            session: None,
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(session) = &self.session else {
            return;
        };
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Ignoring malformed client message: {}", e);
                ctx.text(error_json(&format!("malformed message: {}", e)));
                return;
            }
        };

        if let Some(request) = message.forward(session) {
            ctx.spawn(request.into_actor(self).map(|result, _act, ctx| match result {
                Ok(snapshot) => match snapshot_json(&snapshot) {
                    Ok(json) => ctx.text(json),
                    Err(e) => log::error!("Could not serialize session snapshot: {}", e),
                },
                Err(e) => log::error!("Session did not answer the snapshot request: {}", e),
            }));
        }
    }
}

impl Actor for SessionSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let session = AssessmentSession::new(&self.config, self.generator.clone(), ctx.address().recipient())
            .with_health(self.health.clone())
            .start();
        self.session = Some(session);
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        if let Some(session) = self.session.take() {
            session.do_send(Teardown);
        }
        Running::Stop
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SessionSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => self.handle_text(&text, ctx),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                log::error!("The session connection failed: {:?}. Closing it.", e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<SessionEvent> for SessionSocket {
    type Result = ();

    fn handle(&mut self, msg: SessionEvent, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(json) => ctx.text(json),
            Err(e) => log::error!("Could not serialize session event: {}", e),
        }
    }
}
