//! Error types for the pdfask library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`PdfAskError`]: **Fatal**: the submission cannot produce an answer
//!   (bad upload, unreadable PDF, unencodable image, endpoint unreachable).
//!   Returned as `Err(PdfAskError)` from [`crate::ask()`] and friends.
//!
//! * [`PageError`]: **Per request**: in the per-page submission pattern one
//!   page's request failed while its siblings may have succeeded. Stored in
//!   [`crate::output::PageAnswer`] so the caller can show every page's
//!   outcome in page order.

use thiserror::Error;

/// All fatal errors returned by the pdfask library.
#[derive(Debug, Error)]
pub enum PdfAskError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The question was empty or whitespace-only.
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// The uploaded buffer does not start with the `%PDF` magic bytes.
    #[error("Upload is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The uploaded buffer exceeds the configured size limit.
    #[error("PDF is {size} bytes, larger than the {limit} byte limit")]
    DocumentTooLarge { size: usize, limit: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was configured.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was configured but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// pdfium failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Rasterisation produced nothing to attach to the request.
    #[error("Document produced no images to submit")]
    NoImages,

    // ── Encoding errors ───────────────────────────────────────────────────
    /// A bitmap could not be serialised to the configured image format.
    #[error("Image encoding failed for page {page}: {detail}")]
    Encoding { page: usize, detail: String },

    // ── API errors ────────────────────────────────────────────────────────
    /// The endpoint could not be reached (refused, DNS, TLS, timeout).
    #[error("Request to the model endpoint failed: {cause}")]
    Transport { cause: String, timed_out: bool },

    /// The endpoint answered with a non-200 status.
    #[error("Model endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP 200, but the body did not carry `choices[0].message.content`.
    #[error("Model endpoint returned an unreadable response: {detail}")]
    MalformedResponse { detail: String },

    /// The submission was cancelled before it completed.
    #[error("Submission cancelled")]
    Cancelled,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfAskError {
    /// True for the document family: the upload itself is unusable.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            PdfAskError::NotAPdf { .. }
                | PdfAskError::DocumentTooLarge { .. }
                | PdfAskError::CorruptPdf { .. }
                | PdfAskError::PasswordRequired
                | PdfAskError::WrongPassword
                | PdfAskError::RasterisationFailed { .. }
                | PdfAskError::NoImages
        )
    }
}

/// A failure of one request in the per-page submission pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Endpoint answered with a non-200 status.
    #[error("Page {page}: HTTP {status}: {body}")]
    Http { page: usize, status: u16, body: String },

    /// Endpoint could not be reached.
    #[error("Page {page}: transport failure: {cause}")]
    Transport { page: usize, cause: String },

    /// HTTP 200 with a body that could not be read.
    #[error("Page {page}: unreadable response: {detail}")]
    Response { page: usize, detail: String },

    /// Cancelled before the request completed.
    #[error("Page {page}: cancelled")]
    Cancelled { page: usize },
}

/// Join an error and its `source()` chain into one line.
///
/// reqwest's top-level message ("error sending request") hides the useful
/// part (connection refused, dns error, certificate) in the source chain.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}
