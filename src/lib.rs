//! # pdfask
//!
//! Ask a multimodal language model a question about a PDF.
//!
//! ## Why images?
//!
//! Text extraction loses everything a reader sees but a parser does not:
//! layout, charts, stamps, handwriting, scanned pages. This crate rasterises
//! the pages (or pulls out the raster images embedded in them) and sends the
//! bitmaps with the question to an OpenAI-compatible chat-completions
//! endpoint, so the model answers from what the page actually looks like.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes + question
//!  │
//!  ├─ 1. Input    %PDF magic and size check
//!  ├─ 2. Render   full pages at 2× or embedded images (pdfium, spawn_blocking)
//!  ├─ 3. Encode   JPEG/PNG → base64 data URL
//!  ├─ 4. Request  one batched request, or one request per image
//!  ├─ 5. Client   POST with bearer token; 200 / HTTP failure / transport failure
//!  └─ 6. Output   answers in page order + token and timing stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfask::{ask, ApiClient, ApiKey, AskConfig, SourceDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from OPENAI_API_KEY
//!     let config = AskConfig::default();
//!     let client = ApiClient::new(ApiKey::from_env()?, &config)?;
//!
//!     let bytes = std::fs::read("scan.pdf")?;
//!     let document = SourceDocument::from_bytes(bytes, config.max_document_bytes)?;
//!     let output = ask(document, "What color is the background?", &client, &config).await?;
//!
//!     println!("{}", output.answer().unwrap_or_default());
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.prompt_tokens,
//!         output.stats.completion_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The `pdfask` upload server binary and [`server`] module (axum + clap + anyhow + tracing-subscriber) |
//!
//! Disable `server` when using only the library:
//! ```toml
//! pdfask = { version = "0.1", default-features = false }
//! ```
//!
//! ## Submission Patterns
//!
//! | Pattern | Requests | Failure handling |
//! |---------|----------|------------------|
//! | `Batched` (default) | 1, carrying every image | any failure is `Err` |
//! | `PerPage` | 1 per image, same text each | recorded per image, siblings continue |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ask;
pub mod cancel;
pub mod config;
pub mod credential;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ask::{ask, ask_bytes, ask_with_cancel};
pub use cancel::CancelToken;
pub use config::{
    AskConfig, AskConfigBuilder, DetailLevel, ImageFormat, PromptSource, RasterPolicy,
    SubmissionPattern,
};
pub use credential::ApiKey;
pub use error::{PageError, PdfAskError};
pub use output::{AskOutput, AskStats, PageAnswer};
pub use pipeline::client::{ApiClient, ChatAnswer, ChatResponse, SubmissionState, TokenUsage};
pub use pipeline::input::SourceDocument;
pub use progress::{NoopProgressCallback, ProgressCallback, SubmissionProgressCallback};
