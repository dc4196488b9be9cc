//! Code explanation via an OpenAI-compatible chat-completion endpoint.
//!
//! Each question is a two-message conversation: a fixed system prompt and a
//! user message holding the question followed by the code. Only the first
//! returned choice is used.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CompletionError;
use crate::AiFuture;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a developer.";

pub const LANGUAGE_QUESTION: &str = "Can you explain to me in what language this code is written?";
pub const EXPLANATION_QUESTION: &str =
    "Can you explain to me what this code base does in a few words?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Seam for the remote completion service.
pub trait CompletionPort: Send + Sync {
    fn create_chat_completion(
        &self,
        request: ChatRequest,
    ) -> AiFuture<Result<ChatCompletion, CompletionError>>;
}

/// OpenAI chat-completions client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

impl CompletionPort for OpenAiClient {
    fn create_chat_completion(
        &self,
        request: ChatRequest,
    ) -> AiFuture<Result<ChatCompletion, CompletionError>> {
        let client = self.client.clone();
        let url = format!("{}/chat/completions", self.base_url);
        let api_key = self.api_key.clone();

        Box::pin(async move {
            debug!("POST {url} (model={}, {} messages)", request.model, request.messages.len());
            let resp = client
                .post(&url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(CompletionError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = resp.bytes().await?;
            serde_json::from_slice(&bytes).map_err(|e| CompletionError::Decode(e.to_string()))
        })
    }
}

/// Text of the first choice.
pub fn retrieve_ai_answer(completion: &ChatCompletion) -> Result<String, CompletionError> {
    completion
        .choices
        .first()
        .map(|choice| choice.message.content.clone().unwrap_or_default())
        .ok_or(CompletionError::EmptyChoices)
}

/// Ask `question` about `code` and return the model's answer.
pub async fn get_code_info(
    port: &dyn CompletionPort,
    model: &str,
    question: &str,
    code: &str,
) -> Result<String, CompletionError> {
    let t_start = Instant::now();

    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("{question}\n\n{code}")),
        ],
    };
    let completion = port.create_chat_completion(request).await?;
    let answer = retrieve_ai_answer(&completion)?;

    let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
    info!("Completion answered in {latency_ms:.0}ms ({} chars)", answer.len());
    Ok(answer)
}

pub async fn retrieve_code_language(
    port: &dyn CompletionPort,
    model: &str,
    code: &str,
) -> Result<String, CompletionError> {
    get_code_info(port, model, LANGUAGE_QUESTION, code).await
}

pub async fn retrieve_code_explanation(
    port: &dyn CompletionPort,
    model: &str,
    code: &str,
) -> Result<String, CompletionError> {
    get_code_info(port, model, EXPLANATION_QUESTION, code).await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    #[derive(Default)]
    struct RecordingPort {
        requests: Mutex<Vec<ChatRequest>>,
        answer: Option<String>,
    }

    impl CompletionPort for RecordingPort {
        fn create_chat_completion(
            &self,
            request: ChatRequest,
        ) -> AiFuture<Result<ChatCompletion, CompletionError>> {
            self.requests.lock().unwrap().push(request);
            let completion = match &self.answer {
                Some(answer) => ChatCompletion {
                    choices: vec![Choice {
                        message: ChoiceMessage {
                            content: Some(answer.clone()),
                        },
                    }],
                },
                None => ChatCompletion { choices: vec![] },
            };
            Box::pin(async move { Ok(completion) })
        }
    }

    #[tokio::test]
    async fn builds_system_and_user_messages() {
        let port = RecordingPort {
            answer: Some("Python".into()),
            ..Default::default()
        };

        let answer = retrieve_code_language(&port, "test-model", "print('hi')")
            .await
            .unwrap();
        assert_eq!(answer, "Python");

        let requests = port.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert_eq!(
            requests[0].messages,
            vec![
                ChatMessage::system("You are a developer."),
                ChatMessage::user(format!("{LANGUAGE_QUESTION}\n\nprint('hi')")),
            ]
        );
    }

    #[tokio::test]
    async fn explanation_uses_its_own_question() {
        let port = RecordingPort {
            answer: Some("Prints a greeting".into()),
            ..Default::default()
        };

        retrieve_code_explanation(&port, DEFAULT_MODEL, "x").await.unwrap();

        let requests = port.requests.lock().unwrap();
        assert!(requests[0].messages[1]
            .content
            .starts_with(EXPLANATION_QUESTION));
    }

    #[tokio::test]
    async fn no_choices_is_an_error() {
        let port = RecordingPort::default();
        let err = get_code_info(&port, DEFAULT_MODEL, "q", "c").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyChoices));
    }

    #[test]
    fn first_choice_wins() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(retrieve_ai_answer(&completion).unwrap(), "first");
    }

    async fn spawn_mock(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn openai_client_posts_chat_request() {
        let seen: Arc<Mutex<Option<(String, serde_json::Value)>>> = Arc::default();
        let captured = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() = Some((auth, body));
                    Json(serde_json::json!({
                        "id": "chatcmpl-1",
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Rust"}}]
                    }))
                }
            }),
        );
        let base_url = spawn_mock(app).await;

        let client = OpenAiClient::new(&base_url, "sk-test").unwrap();
        let answer = retrieve_code_language(&client, "gpt-test", "fn main() {}")
            .await
            .unwrap();
        assert_eq!(answer, "Rust");

        let (auth, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(auth, "Bearer sk-test");
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn openai_client_reports_error_status() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base_url = spawn_mock(app).await;

        let client = OpenAiClient::new(&base_url, "sk-wrong").unwrap();
        let err = get_code_info(&client, DEFAULT_MODEL, "q", "c").await.unwrap_err();
        match err {
            CompletionError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
