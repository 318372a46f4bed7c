//! Upload server binary for pdfask.
//!
//! A thin shim over the library crate that maps CLI flags to `AskConfig`,
//! loads the API key once and serves the upload router until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use pdfask::server::{serve, AppState};
use pdfask::{
    ApiClient, ApiKey, AskConfig, DetailLevel, ImageFormat, PromptSource, RasterPolicy,
    SubmissionPattern, SubmissionProgressCallback,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── Progress callback writing to the log ─────────────────────────────────────

/// Reports per-request progress through `tracing`, one line per event.
struct LogProgressCallback;

impl SubmissionProgressCallback for LogProgressCallback {
    fn on_submission_start(&self, total_requests: usize) {
        info!("Sending {} request(s) to the model", total_requests);
    }

    fn on_request_complete(&self, seq: usize, total_requests: usize, answer_len: usize) {
        info!("Request {}/{} answered ({} chars)", seq, total_requests, answer_len);
    }

    fn on_request_error(&self, seq: usize, total_requests: usize, error: &str) {
        warn!("Request {}/{} failed: {}", seq, total_requests, error);
    }

    fn on_submission_complete(&self, total_requests: usize, success_count: usize) {
        info!("{}/{} requests succeeded", success_count, total_requests);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address
  OPENAI_API_KEY=sk-... pdfask

  # Ask from the command line once it is running
  curl -F file=@scan.pdf -F "question=What color is the background?" \
       http://127.0.0.1:8080/api/ask

  # One request per page, four in flight, PNG images
  pdfask --pattern per-page --concurrency 4 --image-format png

  # Describe embedded photos instead of whole pages
  pdfask --raster-policy embedded-images

  # Classify every upload, ignoring the question field
  pdfask --prompt classification

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY    API key sent as the bearer token (required)
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  RUST_LOG          Log filter, overrides -v / -q
  PDFASK_*          Fallback for every flag, e.g. PDFASK_MODEL=gpt-4o
"#;

/// Upload a PDF, ask a vision model about it.
#[derive(Parser, Debug)]
#[command(
    name = "pdfask",
    version,
    about = "Serve an upload form that asks a vision language model questions about PDFs",
    long_about = "Serve an HTTP upload surface: POST a PDF and a question to /api/ask and get the \
model's answer as JSON. Pages are rasterised with pdfium and sent as images to any \
OpenAI-compatible chat-completions endpoint.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PDFASK_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// API key for the model endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Chat-completions URL.
    #[arg(long, env = "PDFASK_ENDPOINT", default_value = pdfask::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Vision model ID.
    #[arg(long, env = "PDFASK_MODEL", default_value = pdfask::config::DEFAULT_MODEL)]
    model: String,

    /// Max generated tokens per request.
    #[arg(long, env = "PDFASK_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// One request with every page, or one request per page.
    #[arg(long, env = "PDFASK_PATTERN", value_enum, default_value = "batched")]
    pattern: PatternArg,

    /// Render whole pages or extract embedded images.
    #[arg(long, env = "PDFASK_RASTER_POLICY", value_enum, default_value = "full-page")]
    raster_policy: RasterPolicyArg,

    /// Render scale relative to native page size (0.5–4.0).
    #[arg(long, env = "PDFASK_RENDER_SCALE", default_value_t = 2.0)]
    render_scale: f32,

    /// Longest rendered edge in pixels.
    #[arg(long, env = "PDFASK_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Image encoding sent to the model.
    #[arg(long, env = "PDFASK_IMAGE_FORMAT", value_enum, default_value = "jpeg")]
    image_format: ImageFormatArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDFASK_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Detail hint attached to each image.
    #[arg(long, env = "PDFASK_DETAIL", value_enum, default_value = "high")]
    detail: DetailArg,

    /// Text part source: the uploaded question or the fixed classification prompt.
    #[arg(long, env = "PDFASK_PROMPT", value_enum, default_value = "question")]
    prompt: PromptArg,

    /// Per-page requests in flight at once.
    #[arg(short, long, env = "PDFASK_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "PDFASK_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Connect timeout in seconds.
    #[arg(long, env = "PDFASK_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,

    /// Retries on transport failures (never on HTTP errors).
    #[arg(long, env = "PDFASK_TRANSPORT_RETRIES", default_value_t = 0)]
    transport_retries: u32,

    /// Largest accepted upload in megabytes.
    #[arg(long, env = "PDFASK_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFASK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFASK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFASK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    Batched,
    PerPage,
}

impl From<PatternArg> for SubmissionPattern {
    fn from(v: PatternArg) -> Self {
        match v {
            PatternArg::Batched => SubmissionPattern::Batched,
            PatternArg::PerPage => SubmissionPattern::PerPage,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterPolicyArg {
    FullPage,
    EmbeddedImages,
}

impl From<RasterPolicyArg> for RasterPolicy {
    fn from(v: RasterPolicyArg) -> Self {
        match v {
            RasterPolicyArg::FullPage => RasterPolicy::FullPage,
            RasterPolicyArg::EmbeddedImages => RasterPolicy::EmbeddedImages,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageFormatArg {
    Jpeg,
    Png,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Jpeg => ImageFormat::Jpeg,
            ImageFormatArg::Png => ImageFormat::Png,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DetailArg {
    High,
    Low,
    Auto,
}

impl From<DetailArg> for DetailLevel {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::High => DetailLevel::High,
            DetailArg::Low => DetailLevel::Low,
            DetailArg::Auto => DetailLevel::Auto,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PromptArg {
    Question,
    Classification,
}

impl From<PromptArg> for PromptSource {
    fn from(v: PromptArg) -> Self {
        match v {
            PromptArg::Question => PromptSource::Question,
            PromptArg::Classification => PromptSource::Classification,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    info!("Configuration: {:?}", config);

    let api_key = ApiKey::new(&cli.api_key).context("Invalid API key")?;
    let client = ApiClient::new(api_key, &config).context("Failed to build HTTP client")?;

    // Report a missing pdfium at startup instead of on the first upload.
    if let Err(e) = pdfask::pipeline::render::bind_pdfium() {
        warn!("{}", e);
    }

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;

    serve(listener, AppState::new(config, client), shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<AskConfig> {
    let mut builder = AskConfig::builder()
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .pattern(cli.pattern.into())
        .raster_policy(cli.raster_policy.into())
        .render_scale(cli.render_scale)
        .max_rendered_pixels(cli.max_pixels)
        .image_format(cli.image_format.into())
        .jpeg_quality(cli.jpeg_quality)
        .detail(cli.detail.into())
        .prompt_source(cli.prompt.into())
        .concurrency(cli.concurrency)
        .api_timeout_secs(cli.api_timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .max_transport_retries(cli.transport_retries)
        .max_document_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .progress_callback(Arc::new(LogProgressCallback));

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, finishing in-flight requests"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
