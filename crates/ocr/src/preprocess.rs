use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Longest side, in pixels, sent to the OCR service.
pub const MAX_SIDE: u32 = 2800;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Unsupported image format; upload a JPEG or PNG")]
    Unsupported,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Format sniffed from the leading bytes. Only JPEG and PNG receipts are accepted.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, PreprocessError> {
    match image::guess_format(data) {
        Ok(fmt @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(fmt),
        _ => Err(PreprocessError::Unsupported),
    }
}

/// Decode an uploaded photo, normalize it and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let format = detect_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;
    encode_as_png(normalize(img))
}

/// Downscale, grayscale and contrast stretch.
fn normalize(img: DynamicImage) -> DynamicImage {
    let img = if img.width() > MAX_SIDE || img.height() > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();

    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px <= min_px {
        return DynamicImage::ImageLuma8(gray);
    }

    let range = (max_px - min_px) as u32;
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([((p - min_px) as u32 * 255 / range) as u8])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn encoded(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn gradient_gray(width: u32, height: u32) -> DynamicImage {
        let img: GrayImage =
            ImageBuffer::from_fn(width, height, |x, _| Luma([(64 + x * 128 / width) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn uniform_image_is_left_alone() {
        let img: GrayImage = ImageBuffer::from_fn(10, 10, |_, _| Luma([128u8]));
        let result = normalize(DynamicImage::ImageLuma8(img));
        assert_eq!((result.width(), result.height()), (10, 10));
        assert!(result.to_luma8().pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn contrast_is_stretched_to_full_range() {
        let gray = normalize(gradient_gray(256, 1)).to_luma8();
        assert_eq!(gray.pixels().map(|p| p[0]).min(), Some(0));
        assert_eq!(gray.pixels().map(|p| p[0]).max(), Some(255));
    }

    #[test]
    fn oversized_photo_is_downscaled() {
        let img: GrayImage = ImageBuffer::from_fn(3000, 1500, |_, _| Luma([200u8]));
        let result = normalize(DynamicImage::ImageLuma8(img));
        assert_eq!(result.width(), MAX_SIDE);
        assert!(result.height() <= 1400);
    }

    #[test]
    fn jpeg_input_becomes_grayscale_png() {
        let rgb: RgbImage = ImageBuffer::from_fn(8, 8, |x, _| image::Rgb([x as u8 * 30, 10, 200]));
        let jpeg = encoded(DynamicImage::ImageRgb8(rgb), ImageFormat::Jpeg);
        assert_eq!(detect_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let png = prepare_for_ocr(&jpeg).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn other_formats_are_rejected() {
        let bmp = encoded(gradient_gray(4, 4), ImageFormat::Bmp);
        assert!(matches!(prepare_for_ocr(&bmp), Err(PreprocessError::Unsupported)));
        assert!(matches!(prepare_for_ocr(b"not an image"), Err(PreprocessError::Unsupported)));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let png = encoded(gradient_gray(16, 16), ImageFormat::Png);
        assert!(matches!(prepare_for_ocr(&png[..20]), Err(PreprocessError::Decode(_))));
    }
}
