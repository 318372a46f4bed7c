//! Pipeline stages for asking a model about a PDF.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ request ──▶ client
//! (bytes)   (pdfium)   (base64)   (JSON body)  (HTTPS)
//! ```
//!
//! 1. [`input`]: validate the upload (`%PDF` magic, size limit)
//! 2. [`render`]: full-page rasterisation or embedded-image extraction;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: JPEG/PNG-encode and base64-wrap each `DynamicImage`
//! 4. [`request`]: assemble chat-completions bodies (batched or per-page)
//! 5. [`client`]: POST to the endpoint; the only stage with network I/O

pub mod client;
pub mod encode;
pub mod input;
pub mod render;
pub mod request;
