//! Configuration types for a PDF question submission.
//!
//! All pipeline behaviour is controlled through [`AskConfig`], built via its
//! [`AskConfigBuilder`]. One struct holds every knob so a server can build it
//! once at startup and share it read-only across concurrent submissions.
//!
//! The API credential is not part of this struct. It is injected into
//! [`crate::pipeline::client::ApiClient`] at construction, so configs can be
//! logged with `{:?}`.

use crate::error::PdfAskError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OpenAI chat-completions endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Vision model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// Configuration for one question-about-a-PDF submission.
///
/// Built via [`AskConfig::builder()`] or using [`AskConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfask::{AskConfig, SubmissionPattern};
///
/// let config = AskConfig::builder()
///     .model("gpt-4o")
///     .pattern(SubmissionPattern::PerPage)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AskConfig {
    /// Model identifier sent in the request body. Default: `gpt-4-turbo`.
    pub model: String,

    /// Chat-completions URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Upper bound on generated tokens per request. Default: 4000.
    pub max_tokens: usize,

    /// How the PDF is turned into images. Default: [`RasterPolicy::FullPage`].
    pub raster_policy: RasterPolicy,

    /// Upscaling factor for full-page rendering. Range: 0.5–4.0. Default: 2.0.
    ///
    /// Rendering at twice the native page size keeps small print legible to
    /// the vision model.
    pub render_scale: f32,

    /// Longest rendered edge in pixels, applied after `render_scale`. Default: 4000.
    ///
    /// Caps memory on oversized pages (posters, drawings) where 2× native
    /// size would produce tens of thousands of pixels per edge.
    pub max_rendered_pixels: u32,

    /// Serialisation format for attached images. Default: [`ImageFormat::Jpeg`].
    pub image_format: ImageFormat,

    /// JPEG quality, 1–100. Ignored for PNG. Default: 85.
    pub jpeg_quality: u8,

    /// Detail hint attached to every image part. Default: [`DetailLevel::High`].
    pub detail: DetailLevel,

    /// Batched (one request) or per-page (one request per image). Default: batched.
    pub pattern: SubmissionPattern,

    /// Where the text part comes from. Default: the user's question.
    pub prompt_source: PromptSource,

    /// Per-page requests in flight at once. Default: 1 (sequential).
    ///
    /// Requests are independent, so raising this is safe; answers are
    /// always returned in page order regardless of completion order.
    pub concurrency: usize,

    /// Whole-request timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// TCP/TLS connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Retries on transport failures only. HTTP failures are never retried. Default: 0.
    pub max_transport_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_document_bytes: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional observer for per-request progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_tokens: 4000,
            raster_policy: RasterPolicy::default(),
            render_scale: 2.0,
            max_rendered_pixels: 4000,
            image_format: ImageFormat::default(),
            jpeg_quality: 85,
            detail: DetailLevel::default(),
            pattern: SubmissionPattern::default(),
            prompt_source: PromptSource::default(),
            concurrency: 1,
            api_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_transport_retries: 0,
            retry_backoff_ms: 500,
            max_document_bytes: 50 * 1024 * 1024,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AskConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("max_tokens", &self.max_tokens)
            .field("raster_policy", &self.raster_policy)
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("image_format", &self.image_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("detail", &self.detail)
            .field("pattern", &self.pattern)
            .field("prompt_source", &self.prompt_source)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_transport_retries", &self.max_transport_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SubmissionProgressCallback>"),
            )
            .finish()
    }
}

impl AskConfig {
    /// Create a new builder for `AskConfig`.
    pub fn builder() -> AskConfigBuilder {
        AskConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AskConfig`].
#[derive(Debug)]
pub struct AskConfigBuilder {
    config: AskConfig,
}

impl AskConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn raster_policy(mut self, policy: RasterPolicy) -> Self {
        self.config.raster_policy = policy;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    /// Clamped to `100..=i32::MAX`, the range pdfium accepts.
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn detail(mut self, detail: DetailLevel) -> Self {
        self.config.detail = detail;
        self
    }

    pub fn pattern(mut self, pattern: SubmissionPattern) -> Self {
        self.config.pattern = pattern;
        self
    }

    pub fn prompt_source(mut self, source: PromptSource) -> Self {
        self.config.prompt_source = source;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn max_transport_retries(mut self, n: u32) -> Self {
        self.config.max_transport_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AskConfig, PdfAskError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(PdfAskError::InvalidConfig("Model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(PdfAskError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.max_tokens == 0 {
            return Err(PdfAskError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(PdfAskError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_document_bytes == 0 {
            return Err(PdfAskError::InvalidConfig(
                "max_document_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a PDF is turned into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterPolicy {
    /// Render every page to a bitmap at `render_scale`. (default)
    #[default]
    FullPage,
    /// Decode raster images embedded in each page; pages without any are skipped.
    EmbeddedImages,
}

/// Compressed format used for image parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// Lossy, small payloads. (default)
    #[default]
    Jpeg,
    /// Lossless, larger payloads.
    Png,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Vision detail hint sent with each image part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Full tile budget; fine print stays readable. (default)
    #[default]
    High,
    /// Single low-resolution overview tile.
    Low,
    /// Let the model decide.
    Auto,
}

/// How images are grouped into requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPattern {
    /// One request carrying every image, so the model can reason across pages. (default)
    #[default]
    Batched,
    /// One request per image, each with the same text part.
    PerPage,
}

/// Source of the text part of every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// The question typed by the user. (default)
    #[default]
    Question,
    /// The fixed document-classification prompt; the question is ignored.
    Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = AskConfig::default();
        assert_eq!(c.model, "gpt-4-turbo");
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.max_tokens, 4000);
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.detail, DetailLevel::High);
        assert_eq!(c.pattern, SubmissionPattern::Batched);
        assert_eq!(c.raster_policy, RasterPolicy::FullPage);
        assert_eq!(c.image_format, ImageFormat::Jpeg);
        assert_eq!(c.max_transport_retries, 0);
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = AskConfig::builder()
            .render_scale(10.0)
            .jpeg_quality(0)
            .concurrency(0)
            .max_rendered_pixels(3)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, 4.0);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_rendered_pixels, 100);

        let huge = AskConfig::builder()
            .max_rendered_pixels(3_000_000_000)
            .build()
            .unwrap();
        assert_eq!(huge.max_rendered_pixels, i32::MAX as u32);
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        let err = AskConfig::builder().endpoint("ftp://x").build().unwrap_err();
        assert!(matches!(err, PdfAskError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_max_tokens() {
        assert!(AskConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = AskConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn debug_lists_timeouts_and_retry_policy() {
        let c = AskConfig::builder()
            .connect_timeout_secs(7)
            .max_transport_retries(2)
            .retry_backoff_ms(250)
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("connect_timeout_secs: 7"));
        assert!(dbg.contains("max_transport_retries: 2"));
        assert!(dbg.contains("retry_backoff_ms: 250"));
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(serde_json::to_string(&DetailLevel::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&SubmissionPattern::PerPage).unwrap(),
            "\"per_page\""
        );
    }
}
