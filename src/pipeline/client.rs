//! Model endpoint client: POST a [`ChatRequest`], classify the outcome.
//!
//! Three outcomes are kept apart because callers react to them differently:
//!
//! * **HTTP 200** → the answer is `choices[0].message.content`.
//! * **Any other status** → [`ChatResponse::HttpFailure`] with the raw body,
//!   which is not parsed (error bodies are not guaranteed to be JSON).
//! * **No HTTP response at all** (refused, DNS, TLS, timeout) →
//!   [`PdfAskError::Transport`]. No JSON parsing is attempted.
//!
//! Only transport failures are retried, and only when
//! `max_transport_retries > 0`. The wait doubles per attempt starting from
//! `retry_backoff_ms`, capped at [`MAX_RETRY_BACKOFF_MS`].

use crate::cancel::CancelToken;
use crate::config::AskConfig;
use crate::credential::ApiKey;
use crate::error::{error_chain, PdfAskError};
use crate::pipeline::request::ChatRequest;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Longest wait between two transport attempts.
pub const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

/// Token counts reported in the response `usage` object, zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// A successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAnswer {
    pub content: String,
    pub usage: TokenUsage,
}

/// Parsed endpoint reply: an answer or a non-200 status with its raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatResponse {
    Answer(ChatAnswer),
    HttpFailure { status: u16, body: String },
}

impl ChatResponse {
    /// Treat an HTTP failure as [`PdfAskError::Http`].
    pub fn into_result(self) -> Result<ChatAnswer, PdfAskError> {
        match self {
            ChatResponse::Answer(answer) => Ok(answer),
            ChatResponse::HttpFailure { status, body } => Err(PdfAskError::Http { status, body }),
        }
    }
}

// ── Response body ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CompletionBody {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn parse_completion(body: &[u8]) -> Result<ChatAnswer, PdfAskError> {
    let parsed: CompletionBody =
        serde_json::from_slice(body).map_err(|e| PdfAskError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PdfAskError::MalformedResponse {
            detail: "response has no choices".into(),
        })?
        .message
        .content
        .ok_or_else(|| PdfAskError::MalformedResponse {
            detail: "choices[0].message.content is null".into(),
        })?;

    Ok(ChatAnswer {
        content,
        usage: parsed.usage.unwrap_or_default(),
    })
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client bound to one endpoint and one credential.
///
/// Cheap to clone; share one instance across submissions.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    max_transport_retries: u32,
    retry_backoff_ms: u64,
}

impl ApiClient {
    /// Build a client with the timeouts and retry policy from `config`.
    pub fn new(api_key: ApiKey, config: &AskConfig) -> Result<Self, PdfAskError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| PdfAskError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            max_transport_retries: config.max_transport_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Send `request`, retrying transport failures per the configured policy.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, PdfAskError> {
        let mut last_err: Option<PdfAskError> = None;

        for attempt in 0..=self.max_transport_retries {
            if attempt > 0 {
                let backoff = retry_backoff(self.retry_backoff_ms, attempt);
                warn!(
                    "Transport retry {}/{} after {}ms",
                    attempt, self.max_transport_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.send_once(request).await {
                Err(e @ PdfAskError::Transport { .. }) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e);
                }
                other => return other,
            }
        }

        Err(last_err.unwrap_or_else(|| PdfAskError::Internal("no attempt was made".into())))
    }

    /// [`send`](Self::send), abandoned as soon as `cancel` fires.
    pub async fn send_cancellable(
        &self,
        request: &ChatRequest,
        cancel: &CancelToken,
    ) -> Result<ChatResponse, PdfAskError> {
        if cancel.is_cancelled() {
            return Err(PdfAskError::Cancelled);
        }
        tokio::select! {
            result = self.send(request) => result,
            _ = cancel.cancelled() => Err(PdfAskError::Cancelled),
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, PdfAskError> {
        debug!(
            "POST {} ({} images, max_tokens={})",
            self.endpoint,
            request.image_count(),
            request.max_tokens
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.api_key.bearer())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!("Endpoint answered HTTP {} ({} bytes)", status.as_u16(), body.len());

        if status != StatusCode::OK {
            return Ok(ChatResponse::HttpFailure {
                status: status.as_u16(),
                body: raw_body_text(&body),
            });
        }

        parse_completion(&body).map(ChatResponse::Answer)
    }
}

/// Wait before transport attempt `attempt` (1-based): `base * 2^(attempt-1)`.
fn retry_backoff(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS)
}

/// Error bodies are passed on byte for byte when they are UTF-8, with no
/// charset sniffing. Anything else falls back to lossy decoding.
fn raw_body_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_owned(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

fn transport_error(e: reqwest::Error) -> PdfAskError {
    PdfAskError::Transport {
        timed_out: e.is_timeout(),
        cause: error_chain(&e),
    }
}

// ── Submission state machine ─────────────────────────────────────────────

/// Lifecycle of one model request.
///
/// `Idle → Submitting → Succeeded | FailedHttp | FailedTransport |
/// FailedResponse | Cancelled`. Terminal states never change again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded {
        answer: String,
    },
    FailedHttp {
        status: u16,
        body: String,
    },
    FailedTransport {
        cause: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        timed_out: bool,
    },
    /// HTTP 200 whose body lacked `choices[0].message.content`.
    FailedResponse {
        detail: String,
    },
    Cancelled,
}

impl SubmissionState {
    /// `Idle → Submitting`.
    pub fn begin(&mut self) -> Result<(), PdfAskError> {
        match self {
            SubmissionState::Idle => {
                *self = SubmissionState::Submitting;
                Ok(())
            }
            other => Err(PdfAskError::Internal(format!(
                "cannot begin a submission in state {:?}",
                other
            ))),
        }
    }

    /// `Submitting → terminal`, returning the token usage of a success.
    pub fn finish(
        &mut self,
        outcome: Result<ChatResponse, PdfAskError>,
    ) -> Result<TokenUsage, PdfAskError> {
        if *self != SubmissionState::Submitting {
            return Err(PdfAskError::Internal(format!(
                "cannot finish a submission in state {:?}",
                self
            )));
        }

        let (next, usage) = match outcome {
            Ok(ChatResponse::Answer(answer)) => (
                SubmissionState::Succeeded {
                    answer: answer.content,
                },
                answer.usage,
            ),
            Ok(ChatResponse::HttpFailure { status, body }) => {
                (SubmissionState::FailedHttp { status, body }, TokenUsage::default())
            }
            Err(PdfAskError::Transport { cause, timed_out }) => (
                SubmissionState::FailedTransport { cause, timed_out },
                TokenUsage::default(),
            ),
            Err(PdfAskError::Cancelled) => (SubmissionState::Cancelled, TokenUsage::default()),
            Err(PdfAskError::MalformedResponse { detail }) => {
                (SubmissionState::FailedResponse { detail }, TokenUsage::default())
            }
            Err(other) => (
                SubmissionState::FailedResponse {
                    detail: other.to_string(),
                },
                TokenUsage::default(),
            ),
        };

        *self = next;
        Ok(usage)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Idle | SubmissionState::Submitting)
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            SubmissionState::Succeeded { answer } => Some(answer),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionState::Succeeded { .. })
    }

    /// The failure this state records, `None` unless it is a failed terminal state.
    pub fn failure(&self) -> Option<PdfAskError> {
        match self {
            SubmissionState::FailedHttp { status, body } => Some(PdfAskError::Http {
                status: *status,
                body: body.clone(),
            }),
            SubmissionState::FailedTransport { cause, timed_out } => Some(PdfAskError::Transport {
                cause: cause.clone(),
                timed_out: *timed_out,
            }),
            SubmissionState::FailedResponse { detail } => Some(PdfAskError::MalformedResponse {
                detail: detail.clone(),
            }),
            SubmissionState::Cancelled => Some(PdfAskError::Cancelled),
            SubmissionState::Idle | SubmissionState::Submitting | SubmissionState::Succeeded { .. } => {
                None
            }
        }
    }
}
