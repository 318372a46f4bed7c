//! Upload validation: wrap raw bytes as a [`SourceDocument`].
//!
//! The `%PDF` magic bytes and size limit are checked here, before pdfium is
//! ever loaded, so an obviously wrong upload fails fast with a meaningful
//! error instead of a pdfium parse failure.

use crate::error::PdfAskError;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";

/// An uploaded PDF, immutable once accepted.
///
/// Moved by value into [`crate::pipeline::render::rasterize`], which drops it
/// once the page images exist.
pub struct SourceDocument {
    bytes: Vec<u8>,
}

impl SourceDocument {
    /// Accept `bytes` if they look like a PDF and fit within `max_bytes`.
    pub fn from_bytes(bytes: Vec<u8>, max_bytes: usize) -> Result<Self, PdfAskError> {
        if bytes.len() > max_bytes {
            return Err(PdfAskError::DocumentTooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        if !bytes.starts_with(PDF_MAGIC) {
            let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
            return Err(PdfAskError::NotAPdf { magic });
        }
        debug!("Accepted PDF upload: {} bytes", bytes.len());
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_magic() {
        let doc = SourceDocument::from_bytes(b"%PDF-1.7\n...".to_vec(), 1024).unwrap();
        assert_eq!(doc.len(), 12);
    }

    #[test]
    fn rejects_non_pdf() {
        let err = SourceDocument::from_bytes(b"GIF89a....".to_vec(), 1024).unwrap_err();
        match err {
            PdfAskError::NotAPdf { magic } => assert_eq!(magic, b"GIF8".to_vec()),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_upload() {
        let err = SourceDocument::from_bytes(Vec::new(), 1024).unwrap_err();
        assert!(matches!(err, PdfAskError::NotAPdf { magic } if magic.is_empty()));
    }

    #[test]
    fn rejects_oversized_upload() {
        let err = SourceDocument::from_bytes(b"%PDF-1.7 padding".to_vec(), 8).unwrap_err();
        assert!(matches!(
            err,
            PdfAskError::DocumentTooLarge { size: 16, limit: 8 }
        ));
    }
}
