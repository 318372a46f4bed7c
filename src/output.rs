//! Result types returned by [`crate::ask()`].

use crate::config::SubmissionPattern;
use crate::error::{PageError, PdfAskError};
use crate::pipeline::client::{SubmissionState, TokenUsage};
use serde::Serialize;

/// Everything one submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutput {
    /// Pattern the submission ran with.
    pub pattern: SubmissionPattern,
    /// One entry per request, in page order. Batched runs have exactly one.
    pub answers: Vec<PageAnswer>,
    pub stats: AskStats,
}

/// Outcome of one request.
#[derive(Debug, Clone, Serialize)]
pub struct PageAnswer {
    /// 0-based request index; equals the image index in per-page runs.
    pub seq: usize,
    /// 1-based source pages whose images were attached, ascending.
    pub pages: Vec<usize>,
    /// Terminal state of the request.
    #[serde(flatten)]
    pub state: SubmissionState,
    #[serde(skip_serializing_if = "is_zero_usage")]
    pub usage: TokenUsage,
}

fn is_zero_usage(usage: &TokenUsage) -> bool {
    *usage == TokenUsage::default()
}

impl PageAnswer {
    pub fn answer(&self) -> Option<&str> {
        self.state.answer()
    }

    /// The failure as a [`PageError`], `None` on success.
    pub fn error(&self) -> Option<PageError> {
        let page = self.pages.first().copied().unwrap_or(0);
        match &self.state {
            SubmissionState::FailedHttp { status, body } => Some(PageError::Http {
                page,
                status: *status,
                body: body.clone(),
            }),
            SubmissionState::FailedTransport { cause, .. } => Some(PageError::Transport {
                page,
                cause: cause.clone(),
            }),
            SubmissionState::FailedResponse { detail } => Some(PageError::Response {
                page,
                detail: detail.clone(),
            }),
            SubmissionState::Cancelled => Some(PageError::Cancelled { page }),
            SubmissionState::Idle | SubmissionState::Submitting | SubmissionState::Succeeded { .. } => {
                None
            }
        }
    }
}

/// Counters and timings for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AskStats {
    /// Pages in the source document.
    pub page_count: usize,
    /// Images attached across all requests.
    pub image_count: usize,
    pub request_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of `usage.prompt_tokens` over successful requests.
    pub prompt_tokens: u64,
    /// Sum of `usage.completion_tokens` over successful requests.
    pub completion_tokens: u64,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl AskOutput {
    /// The first successful answer. For batched runs this is the answer.
    pub fn answer(&self) -> Option<&str> {
        self.answers.iter().find_map(|a| a.answer())
    }

    /// True when every request succeeded.
    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(|a| a.state.is_success())
    }

    /// All-or-nothing view: the first failed request, in page order, becomes the error.
    pub fn into_result(self) -> Result<Self, PdfAskError> {
        let failure = self.answers.iter().find_map(|a| a.state.failure());
        match failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
