//! Image encoding: `PageImage` → base64 JPEG/PNG wrapped in [`EncodedImage`].
//!
//! Chat-completions APIs accept images as base64 data URIs inside the JSON
//! body. JPEG is the default: rendered pages are mostly flat colour and text,
//! where quality 85 is visually lossless at a fraction of the PNG size. PNG
//! stays available for callers that need exact pixels.

use crate::config::{DetailLevel, ImageFormat};
use crate::error::PdfAskError;
use crate::pipeline::render::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A page image ready to embed in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// 1-based source page number, carried through for ordering and reporting.
    pub page_num: usize,
    pub mime_type: &'static str,
    /// Standard base64, no line breaks.
    pub data: String,
    pub detail: DetailLevel,
}

impl EncodedImage {
    /// `data:<mime>;base64,<data>` as used in `image_url.url`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode one page image in `format`.
///
/// JPEG has no alpha channel, so RGBA and other colour modes are flattened to
/// 8-bit RGB first. Encoding is pure: identical input gives identical output.
pub fn encode_image(
    page: &PageImage,
    format: ImageFormat,
    jpeg_quality: u8,
    detail: DetailLevel,
) -> Result<EncodedImage, PdfAskError> {
    let bytes = encode_bytes(&page.image, format, jpeg_quality).map_err(|e| {
        PdfAskError::Encoding {
            page: page.page_num,
            detail: e.to_string(),
        }
    })?;

    let data = STANDARD.encode(&bytes);
    debug!(
        "Encoded page {} image {} → {} bytes base64 ({:?})",
        page.page_num,
        page.index_on_page,
        data.len(),
        format
    );

    Ok(EncodedImage {
        page_num: page.page_num,
        mime_type: format.mime_type(),
        data,
        detail,
    })
}

/// Encode every image in order, stopping at the first failure.
pub fn encode_all(
    pages: &[PageImage],
    format: ImageFormat,
    jpeg_quality: u8,
    detail: DetailLevel,
) -> Result<Vec<EncodedImage>, PdfAskError> {
    pages
        .iter()
        .map(|p| encode_image(p, format, jpeg_quality, detail))
        .collect()
}

fn encode_bytes(
    img: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality).encode_image(&rgb)?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn page(img: DynamicImage) -> PageImage {
        PageImage {
            page_num: 1,
            index_on_page: 0,
            image: img,
        }
    }

    fn decode(encoded: &EncodedImage) -> DynamicImage {
        let bytes = STANDARD.decode(&encoded.data).expect("valid base64");
        image::load_from_memory(&bytes).expect("decodable image")
    }

    #[test]
    fn png_round_trips_exactly() {
        let mut src = RgbaImage::new(8, 6);
        for (x, y, px) in src.enumerate_pixels_mut() {
            *px = Rgba([(x * 30) as u8, (y * 40) as u8, 200, 255]);
        }
        let src = DynamicImage::ImageRgba8(src);

        let encoded = encode_image(&page(src.clone()), ImageFormat::Png, 85, DetailLevel::High).unwrap();
        assert_eq!(encoded.mime_type, "image/png");

        let decoded = decode(&encoded);
        assert_eq!(decoded.to_rgba8().into_raw(), src.to_rgba8().into_raw());
    }

    #[test]
    fn jpeg_round_trips_within_tolerance() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([200, 40, 90, 255])));

        let encoded = encode_image(&page(src), ImageFormat::Jpeg, 90, DetailLevel::High).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");

        let decoded = decode(&encoded);
        assert_eq!(decoded.dimensions(), (32, 32));
        for px in decoded.to_rgb8().pixels() {
            for (got, want) in px.0.iter().zip([200u8, 40, 90]) {
                assert!(
                    (*got as i16 - want as i16).abs() <= 8,
                    "pixel {:?} too far from {:?}",
                    px.0,
                    [200, 40, 90]
                );
            }
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let a = encode_image(&page(src.clone()), ImageFormat::Jpeg, 85, DetailLevel::High).unwrap();
        let b = encode_image(&page(src), ImageFormat::Jpeg, 85, DetailLevel::High).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn data_url_prefix() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let encoded = encode_image(&page(src), ImageFormat::Jpeg, 85, DetailLevel::Low).unwrap();
        assert!(encoded.to_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(encoded.detail, DetailLevel::Low);
    }

    #[test]
    fn encode_all_preserves_order() {
        let pages: Vec<PageImage> = (1..=3)
            .map(|n| PageImage {
                page_num: n,
                index_on_page: 0,
                image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([n as u8, 0, 0, 255]))),
            })
            .collect();
        let encoded = encode_all(&pages, ImageFormat::Png, 85, DetailLevel::High).unwrap();
        let order: Vec<usize> = encoded.iter().map(|e| e.page_num).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
