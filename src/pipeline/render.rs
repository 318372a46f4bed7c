//! PDF rasterisation: turn an uploaded document into ordered page images.
//!
//! Two policies, chosen by [`RasterPolicy`]:
//!
//! * **Full page** renders every page at `render_scale` × its native size,
//!   capped at `max_rendered_pixels` on the longest edge.
//! * **Embedded images** walks each page's object list and decodes every
//!   image object it finds, in discovery order. Pages with no images add
//!   nothing; a document with none yields an empty sequence.
//!
//! pdfium is blocking C code with global state, so all of this runs inside
//! `tokio::task::spawn_blocking`. The whole sequence is materialised before
//! the caller sees any of it; any failure discards the partial result.

use crate::config::{AskConfig, RasterPolicy};
use crate::error::PdfAskError;
use crate::pipeline::input::SourceDocument;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable pointing at an existing libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// One bitmap destined for the model.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based source page number.
    pub page_num: usize,
    /// 0-based position among the images taken from this page. Always 0 for full-page renders.
    pub index_on_page: usize,
    pub image: DynamicImage,
}

/// Output of [`rasterize`].
#[derive(Debug)]
pub struct Rasterized {
    /// Pages in the source document.
    pub page_count: usize,
    /// Images in page order, then discovery order within a page.
    pub images: Vec<PageImage>,
}

/// Rasterise `document` according to `config.raster_policy`.
///
/// Takes the document by value; its bytes are dropped when this returns.
pub async fn rasterize(
    document: SourceDocument,
    config: &AskConfig,
) -> Result<Rasterized, PdfAskError> {
    let bytes = document.into_bytes();
    let policy = config.raster_policy;
    let scale = config.render_scale;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        rasterize_blocking(&pdfium, bytes, policy, scale, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| PdfAskError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, PdfAskError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PdfAskError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation shared by both policies.
fn rasterize_blocking(
    pdfium: &Pdfium,
    bytes: Vec<u8>,
    policy: RasterPolicy,
    scale: f32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Rasterized, PdfAskError> {
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| classify_load_error(e, password.is_some()))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let images = match policy {
        RasterPolicy::FullPage => render_full_pages(&document, scale, max_pixels)?,
        RasterPolicy::EmbeddedImages => extract_embedded_images(&document)?,
    };

    info!(
        "Rasterised {} pages into {} images ({:?})",
        page_count,
        images.len(),
        policy
    );

    Ok(Rasterized { page_count, images })
}

fn classify_load_error(e: PdfiumError, had_password: bool) -> PdfAskError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            PdfAskError::WrongPassword
        } else {
            PdfAskError::PasswordRequired
        }
    } else {
        PdfAskError::CorruptPdf { detail: err_str }
    }
}

fn render_full_pages(
    document: &PdfDocument<'_>,
    scale: f32,
    max_pixels: u32,
) -> Result<Vec<PageImage>, PdfAskError> {
    let limit = pixel_limit(max_pixels);
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(limit)
        .set_maximum_height(limit);

    let mut results = Vec::with_capacity(document.pages().len() as usize);

    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PdfAskError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        results.push(PageImage {
            page_num,
            index_on_page: 0,
            image,
        });
    }

    Ok(results)
}

/// pdfium takes the cap as `i32`; larger values saturate instead of wrapping negative.
fn pixel_limit(max_pixels: u32) -> i32 {
    i32::try_from(max_pixels).unwrap_or(i32::MAX)
}

fn extract_embedded_images(document: &PdfDocument<'_>) -> Result<Vec<PageImage>, PdfAskError> {
    let mut results = Vec::new();

    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        let mut index_on_page = 0;

        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };

            let image = image_object
                .get_raw_image()
                .map_err(|e| PdfAskError::RasterisationFailed {
                    page: page_num,
                    detail: format!("embedded image {}: {:?}", index_on_page, e),
                })?;

            debug!(
                "Extracted image {} from page {} → {}x{} px",
                index_on_page,
                page_num,
                image.width(),
                image.height()
            );

            results.push(PageImage {
                page_num,
                index_on_page,
                image,
            });
            index_on_page += 1;
        }

        if index_on_page == 0 {
            debug!("Page {} has no embedded images", page_num);
        }
    }

    Ok(results)
}
