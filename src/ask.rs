//! Submission entry points: one PDF and one question in, answers out.
//!
//! A submission runs the stages in a fixed order and stops at the first
//! fatal error:
//!
//! 1. resolve the text part (an empty question is rejected here, before any
//!    pdfium work)
//! 2. rasterise the document
//! 3. encode every image
//! 4. assemble and send the request(s) for the configured
//!    [`SubmissionPattern`]
//!
//! Batched submissions are all-or-nothing: a failed request comes back as
//! `Err`. Per-page submissions record each request's terminal state in
//! [`PageAnswer`] and return `Ok` so callers can show partial results; use
//! [`AskOutput::into_result`] for all-or-nothing semantics.

use crate::cancel::CancelToken;
use crate::config::{AskConfig, SubmissionPattern};
use crate::error::PdfAskError;
use crate::output::{AskOutput, AskStats, PageAnswer};
use crate::pipeline::client::{ApiClient, SubmissionState};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::request::{self, ChatRequest};
use crate::pipeline::{encode, render};
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ask `question` about `document`.
///
/// # Example
/// ```rust,no_run
/// use pdfask::{ask, ApiClient, ApiKey, AskConfig, SourceDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AskConfig::default();
/// let client = ApiClient::new(ApiKey::from_env()?, &config)?;
/// let bytes = std::fs::read("invoice.pdf")?;
/// let document = SourceDocument::from_bytes(bytes, config.max_document_bytes)?;
///
/// let output = ask(document, "What is the total amount?", &client, &config).await?;
/// println!("{}", output.answer().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
pub async fn ask(
    document: SourceDocument,
    question: &str,
    client: &ApiClient,
    config: &AskConfig,
) -> Result<AskOutput, PdfAskError> {
    ask_with_cancel(document, question, client, config, &CancelToken::new()).await
}

/// [`ask`] with a cancellation token checked before rasterising and raced
/// against every request.
pub async fn ask_with_cancel(
    document: SourceDocument,
    question: &str,
    client: &ApiClient,
    config: &AskConfig,
    cancel: &CancelToken,
) -> Result<AskOutput, PdfAskError> {
    let prompt = prompts::resolve_prompt(question, config.prompt_source)?;
    run(document, prompt, client, config, cancel).await
}

/// Validate raw upload bytes, then [`ask_with_cancel`].
///
/// The question is checked before the bytes, so an empty question wins over
/// a bad upload.
pub async fn ask_bytes(
    bytes: Vec<u8>,
    question: &str,
    client: &ApiClient,
    config: &AskConfig,
    cancel: &CancelToken,
) -> Result<AskOutput, PdfAskError> {
    let prompt = prompts::resolve_prompt(question, config.prompt_source)?;
    let document = SourceDocument::from_bytes(bytes, config.max_document_bytes)?;
    run(document, prompt, client, config, cancel).await
}

async fn run(
    document: SourceDocument,
    prompt: String,
    client: &ApiClient,
    config: &AskConfig,
    cancel: &CancelToken,
) -> Result<AskOutput, PdfAskError> {
    let total_start = Instant::now();
    info!(
        "Starting submission: {} bytes, {:?} pattern, model {}",
        document.len(),
        config.pattern,
        config.model
    );

    if cancel.is_cancelled() {
        return Err(PdfAskError::Cancelled);
    }

    // ── Step 1: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let rasterized = render::rasterize(document, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let page_count = rasterized.page_count;
    info!(
        "Rasterised {} images from {} pages in {}ms",
        rasterized.images.len(),
        page_count,
        render_duration_ms
    );

    if cancel.is_cancelled() {
        return Err(PdfAskError::Cancelled);
    }

    // ── Step 2: Encode ───────────────────────────────────────────────────
    let encoded = encode::encode_all(
        &rasterized.images,
        config.image_format,
        config.jpeg_quality,
        config.detail,
    )?;
    drop(rasterized);

    if encoded.is_empty() {
        return Err(PdfAskError::NoImages);
    }

    // ── Step 3: Assemble and send ────────────────────────────────────────
    let llm_start = Instant::now();
    let answers = match config.pattern {
        SubmissionPattern::Batched => {
            let request = request::build_batched(&prompt, &encoded, config)?;
            let mut pages: Vec<usize> = encoded.iter().map(|e| e.page_num).collect();
            pages.dedup();

            notify_start(config, 1);
            vec![submit_one(client, &request, 0, 1, pages, config, cancel).await?]
        }
        SubmissionPattern::PerPage => {
            let requests = request::build_per_page(&prompt, &encoded, config)?;
            notify_start(config, requests.len());
            submit_per_page(client, &requests, &encoded_pages(&encoded), config, cancel).await?
        }
    };
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let succeeded = answers.iter().filter(|a| a.state.is_success()).count();
    let stats = AskStats {
        page_count,
        image_count: encoded.len(),
        request_count: answers.len(),
        succeeded,
        failed: answers.len() - succeeded,
        prompt_tokens: answers.iter().map(|a| a.usage.prompt_tokens as u64).sum(),
        completion_tokens: answers.iter().map(|a| a.usage.completion_tokens as u64).sum(),
        render_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Submission complete: {}/{} requests succeeded, {}ms total",
        stats.succeeded, stats.request_count, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_submission_complete(stats.request_count, stats.succeeded);
    }

    let output = AskOutput {
        pattern: config.pattern,
        answers,
        stats,
    };

    match config.pattern {
        SubmissionPattern::Batched => output.into_result(),
        SubmissionPattern::PerPage => Ok(output),
    }
}

fn encoded_pages(encoded: &[encode::EncodedImage]) -> Vec<usize> {
    encoded.iter().map(|e| e.page_num).collect()
}

fn notify_start(config: &AskConfig, total_requests: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_submission_start(total_requests);
    }
}

/// One request per image, at most `config.concurrency` in flight, returned in page order.
async fn submit_per_page(
    client: &ApiClient,
    requests: &[ChatRequest],
    pages: &[usize],
    config: &AskConfig,
    cancel: &CancelToken,
) -> Result<Vec<PageAnswer>, PdfAskError> {
    let total = requests.len();
    let submissions: Vec<_> = requests
        .iter()
        .zip(pages)
        .enumerate()
        .map(|(seq, (request, &page_num))| {
            submit_one(client, request, seq, total, vec![page_num], config, cancel)
        })
        .collect();
    let mut answers: Vec<PageAnswer> = stream::iter(submissions)
    .buffer_unordered(config.concurrency)
    .collect::<Vec<_>>()
    .await
    .into_iter()
    .collect::<Result<_, _>>()?;

    answers.sort_by_key(|a| a.seq);
    Ok(answers)
}

/// Drive one request through its [`SubmissionState`] lifecycle.
async fn submit_one(
    client: &ApiClient,
    request: &ChatRequest,
    seq: usize,
    total: usize,
    pages: Vec<usize>,
    config: &AskConfig,
    cancel: &CancelToken,
) -> Result<PageAnswer, PdfAskError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(seq + 1, total);
    }

    let mut state = SubmissionState::default();
    state.begin()?;
    let outcome = client.send_cancellable(request, cancel).await;
    let usage = state.finish(outcome)?;

    let answer = PageAnswer {
        seq,
        pages,
        state,
        usage,
    };

    match answer.answer() {
        Some(text) => {
            debug!(
                "Request {}/{} answered: {} chars, {} prompt / {} completion tokens",
                seq + 1,
                total,
                text.len(),
                usage.prompt_tokens,
                usage.completion_tokens
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_request_complete(seq + 1, total, text.len());
            }
        }
        None => {
            let message = failure_message(&answer);
            warn!("Request {}/{} failed: {}", seq + 1, total, message);
            if let Some(ref cb) = config.progress_callback {
                cb.on_request_error(seq + 1, total, &message);
            }
        }
    }

    Ok(answer)
}

/// Single-page requests are reported per page; a batched request spans
/// several pages, so its failure is reported as a whole.
fn failure_message(answer: &PageAnswer) -> String {
    let message = match answer.pages.as_slice() {
        [_] => answer.error().map(|e| e.to_string()),
        _ => answer.state.failure().map(|e| e.to_string()),
    };
    message.unwrap_or_else(|| format!("{:?}", answer.state))
}
