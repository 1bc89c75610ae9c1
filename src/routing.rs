use crate::actors::health::{GetSystemHealth, HealthActor};
use crate::actors::socket::SessionSocket;
use crate::config::Config;
use crate::generator::ContentGenerator;
use actix::Addr;
use actix_web::{web, Error, HttpRequest, HttpResponse, Responder};
use actix_web_actors::ws;
use std::sync::Arc;

/// Everything a new session needs, shared by all workers.
pub struct SessionSettings {
    pub config: Config,
    pub generator: Arc<dyn ContentGenerator>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/session", web::get().to(session_socket));
}

pub async fn health_check(health_actor: web::Data<Addr<HealthActor>>) -> impl Responder {
    match health_actor.send(GetSystemHealth).await {
        Ok(health) => HttpResponse::Ok().json(health),
        Err(e) => {
            log::error!("Could not retrieve system health: {}. The health check actor might be experiencing issues.", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn session_socket(
    req: HttpRequest,
    stream: web::Payload,
    settings: web::Data<SessionSettings>,
    health_actor: web::Data<Addr<HealthActor>>,
) -> Result<HttpResponse, Error> {
    let socket = SessionSocket::new(
        settings.config.clone(),
        settings.generator.clone(),
        health_actor.get_ref().clone(),
    );
    ws::start(socket, &req, stream)
}
