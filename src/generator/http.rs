use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{normalize, ContentGenerator};
use crate::assessment::prompt::GenerationRequest;
use crate::config::GeneratorConfig;
use crate::errors::GenerationError;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(settings: &GeneratorConfig, api_key: String) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key,
        })
    }
}

fn request_body<'a>(model: &'a str, request: &'a GenerationRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage { role: "system", content: &request.system },
            ChatMessage { role: "user", content: &request.instruction },
        ],
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
    }
}

fn extract_content(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(format!("malformed JSON: {}", e)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::InvalidResponse("response has no message content".to_string()))?;
    normalize(&content)
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        log::debug!("Requesting content from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, &request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::from_status(status.as_u16(), body));
        }
        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::ServerHandle;
    use actix_web::http::StatusCode;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    /// Serves one canned reply on a local port and returns a generator
    /// pointed at it. Requests without the expected bearer token get 401.
    async fn canned(status: u16, body: &'static str) -> (HttpGenerator, ServerHandle) {
        let server = HttpServer::new(move || {
            App::new().route(
                "/v1/chat/completions",
                web::post().to(move |req: HttpRequest, payload: web::Json<serde_json::Value>| async move {
                    let authorized = req
                        .headers()
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        == Some("Bearer test-key");
                    if !authorized || payload["model"] != "test-model" {
                        return HttpResponse::Unauthorized().body("bad credentials");
                    }
                    HttpResponse::build(StatusCode::from_u16(status).unwrap())
                        .content_type("application/json")
                        .body(body)
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        let settings = GeneratorConfig {
            endpoint: format!("http://{}/v1/chat/completions", addr),
            model: "test-model".to_string(),
            timeout_secs: 5,
            ..GeneratorConfig::default()
        };
        (HttpGenerator::new(&settings, "test-key".to_string()).unwrap(), handle)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "rules".to_string(),
            instruction: "question 1 of 5".to_string(),
            temperature: 0.5,
            max_output_tokens: 300,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let req = request();
        let json = serde_json::to_value(request_body("m1", &req)).unwrap();
        assert_eq!(json["model"], "m1");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "rules");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "question 1 of 5");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"```html\n<p>Q</p>\n```"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "<p>Q</p>");
    }

    #[test]
    fn test_extract_content_without_choices() {
        assert!(matches!(extract_content(r#"{"choices":[]}"#), Err(GenerationError::InvalidResponse(_))));
        assert!(matches!(extract_content("not json"), Err(GenerationError::InvalidResponse(_))));
    }

    #[test]
    fn test_new_builds_client() {
        let generator = HttpGenerator::new(&GeneratorConfig::default(), "key".to_string()).unwrap();
        assert_eq!(generator.model, "gpt-4o-mini");
    }

    #[actix_rt::test]
    async fn test_generate_returns_normalized_content() {
        let (generator, server) =
            canned(200, r#"{"choices":[{"message":{"role":"assistant","content":"```html\n<p>Q</p>\n```"}}]}"#).await;
        assert_eq!(generator.generate(request()).await.unwrap(), "<p>Q</p>");
        server.stop(true).await;
    }

    #[actix_rt::test]
    async fn test_generate_maps_429_to_rate_limited() {
        let (generator, server) = canned(429, r#"{"error":{"message":"Too many requests"}}"#).await;
        let err = generator.generate(request()).await.unwrap_err();
        assert!(err.is_rate_limited(), "got {:?}", err);
        server.stop(true).await;
    }

    #[actix_rt::test]
    async fn test_generate_maps_server_error_to_api() {
        let (generator, server) = canned(500, r#"{"error":{"message":"boom"}}"#).await;
        match generator.generate(request()).await {
            Err(GenerationError::Api { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected {:?}", other),
        }
        server.stop(true).await;
    }

    #[actix_rt::test]
    async fn test_generate_rejects_empty_completion() {
        let (generator, server) = canned(200, r#"{"choices":[]}"#).await;
        assert!(matches!(
            generator.generate(request()).await,
            Err(GenerationError::InvalidResponse(_))
        ));
        server.stop(true).await;
    }
}
