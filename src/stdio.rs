use actix::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::actors::health::HealthActor;
use crate::actors::session::{AssessmentSession, GetSnapshot, SessionEvent, Teardown};
use crate::actors::socket::{error_json, snapshot_json, ClientMessage};
use crate::config::Config;
use crate::generator::ContentGenerator;

/// Prints every session event as one JSON line on stdout.
struct StdoutSink;

impl Actor for StdoutSink {
    type Context = Context<Self>;
}

impl Handler<SessionEvent> for StdoutSink {
    type Result = ();

    fn handle(&mut self, msg: SessionEvent, _ctx: &mut Context<Self>) {
        match serde_json::to_string(&msg) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Could not serialize session event: {}", e),
        }
    }
}

/// Answered once every event queued before it has been printed.
#[derive(Message)]
#[rtype(result = "()")]
struct Flush;

impl Handler<Flush> for StdoutSink {
    type Result = ();

    fn handle(&mut self, _msg: Flush, _ctx: &mut Context<Self>) {
        if let Err(e) = std::io::stdout().flush() {
            log::error!("Could not flush stdout: {}", e);
        }
    }
}

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Runs a single session driven by newline-delimited JSON on stdin until the
/// input closes. Logs go to stderr, so stdout carries only protocol lines.
pub async fn run_stdio_session(
    config: Config,
    generator: Arc<dyn ContentGenerator>,
    health: Addr<HealthActor>,
) -> std::io::Result<()> {
    let drain_limit = config.generator.timeout() + config.session.debounce() + Duration::from_secs(1);
    let sink = StdoutSink.start();
    let session = AssessmentSession::new(&config, generator, sink.clone().recipient())
        .with_health(health)
        .start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(reply) = handle_line(&line, &session).await {
            println!("{}", reply);
        }
    }

    log::debug!("stdin closed, waiting for the session to settle");
    drain_and_teardown(&session, drain_limit).await;
    if sink.send(Flush).await.is_err() {
        log::error!("Output sink stopped before flushing");
    }
    Ok(())
}

/// Waits until no answer is pending and no call is in flight (or `limit`
/// passes), then tears the session down.
async fn drain_and_teardown(session: &Addr<AssessmentSession>, limit: Duration) {
    let deadline = Instant::now() + limit;
    loop {
        match session.send(GetSnapshot).await {
            Ok(snap) if snap.in_flight.is_none() && !snap.answer_pending => break,
            Ok(_) if Instant::now() < deadline => tokio::time::sleep(DRAIN_POLL).await,
            Ok(snap) => {
                log::warn!(
                    "Session still busy after {:?} (in flight: {:?}), tearing it down",
                    limit,
                    snap.in_flight
                );
                break;
            }
            Err(e) => {
                log::debug!("Session already gone: {}", e);
                return;
            }
        }
    }
    if let Err(e) = session.send(Teardown).await {
        log::debug!("Session stopped before teardown: {}", e);
    }
}

/// Forwards one input line to the session. Returns the line to print
/// directly, if the message has a direct reply.
async fn handle_line(line: &str, session: &Addr<AssessmentSession>) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<ClientMessage>(line) {
        Ok(message) => message,
        Err(e) => return Some(error_json(&format!("Parse error: {}", e))),
    };

    match message.forward(session)?.await {
        Ok(snapshot) => match snapshot_json(&snapshot) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("Could not serialize session snapshot: {}", e);
                None
            }
        },
        Err(e) => {
            log::error!("Session did not answer the snapshot request: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::session::{ContentSource, StartSession};
    use crate::assessment::prompt::GenerationRequest;
    use crate::errors::GenerationError;
    use crate::generator::UnconfiguredGenerator;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct SlowGenerator(Duration);

    #[async_trait]
    impl ContentGenerator for SlowGenerator {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok(r#"<p>Question one</p><button data-interaction-id="opt-a">A</button>"#.to_string())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<SessionEvent> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: SessionEvent, _ctx: &mut Context<Self>) {
            self.events.lock().unwrap().push(msg);
        }
    }

    fn session() -> Addr<AssessmentSession> {
        AssessmentSession::new(&Config::default(), Arc::new(UnconfiguredGenerator), StdoutSink.start().recipient()).start()
    }

    #[actix_rt::test]
    async fn test_blank_and_start_lines_have_no_reply() {
        let session = session();
        assert!(handle_line("   ", &session).await.is_none());
        assert!(handle_line(r#"{"type":"start"}"#, &session).await.is_none());
    }

    #[actix_rt::test]
    async fn test_snapshot_line_is_answered() {
        let session = session();
        let reply = handle_line(r#"{"type":"snapshot"}"#, &session).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["snapshot"]["step_index"], 1);
        assert_eq!(value["snapshot"]["step_count"], 5);
    }

    #[actix_rt::test]
    async fn test_malformed_line_reports_error() {
        let session = session();
        let reply = handle_line("{not json", &session).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "error");
        assert!(value["message"].as_str().unwrap().starts_with("Parse error"));
    }

    #[actix_rt::test]
    async fn test_shutdown_waits_for_call_in_flight() {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let generator = Arc::new(SlowGenerator(Duration::from_millis(100)));
        let session = AssessmentSession::new(&Config::default(), generator, recorder.start().recipient()).start();

        session.send(StartSession).await.unwrap();
        drain_and_teardown(&session, Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let replaced = events.lock().unwrap().iter().any(|event| {
            matches!(
                event,
                SessionEvent::ContentReplaced {
                    source: ContentSource::Generated,
                    ..
                }
            )
        });
        assert!(replaced);
        assert!(!session.connected());
    }

    #[actix_rt::test]
    async fn test_shutdown_gives_up_after_limit() {
        let generator = Arc::new(SlowGenerator(Duration::from_secs(5)));
        let session = AssessmentSession::new(&Config::default(), generator, Recorder::default().start().recipient()).start();

        session.send(StartSession).await.unwrap();
        let started = Instant::now();
        drain_and_teardown(&session, Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!session.connected());
    }
}
