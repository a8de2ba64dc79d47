//! The frame resize primitive.
//!
//! [`resize_by_short_edge`] is a pure function of its inputs: decode an
//! encoded image, scale it so its shorter edge matches the target, and
//! re-encode it as JPEG. Determinism here is what makes repeated builds of
//! the same dataset byte-identical.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, imageops::FilterType};

use crate::error::FrameError;

/// Resize encoded image bytes so the shorter edge equals
/// `target_short_edge`, preserving aspect ratio, and return the result as
/// encoded JPEG bytes.
///
/// Scaling is applied unconditionally (up or down); the output is
/// re-encoded even when the source already matches the target, so every
/// stored frame went through the same codec path.
///
/// # Errors
///
/// Returns [`FrameError::Image`] if the input cannot be decoded or the
/// output cannot be encoded.
pub fn resize_by_short_edge(bytes: &[u8], target_short_edge: u32) -> Result<Vec<u8>, FrameError> {
    let image = image::load_from_memory(bytes)?;
    let (width, height) = (image.width(), image.height());
    let (new_width, new_height) = scale_to_short_edge(width, height, target_short_edge);

    let resized = if (new_width, new_height) == (width, height) {
        image
    } else {
        image.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    // JPEG has no alpha; flatten whatever the decoder produced to RGB8.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

/// Compute output dimensions with the shorter edge pinned to `target`.
fn scale_to_short_edge(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width <= height {
        let scaled = (height as f64 * target as f64 / width as f64).round() as u32;
        (target, scaled.max(1))
    } else {
        let scaled = (width as f64 * target as f64 / height as f64).round() as u32;
        (scaled.max(1), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_pins_height() {
        assert_eq!(scale_to_short_edge(100, 50, 25), (50, 25));
    }

    #[test]
    fn portrait_pins_width() {
        assert_eq!(scale_to_short_edge(50, 100, 25), (25, 50));
    }

    #[test]
    fn square_maps_to_square() {
        assert_eq!(scale_to_short_edge(64, 64, 224), (224, 224));
    }

    #[test]
    fn resize_produces_decodable_jpeg() {
        let source = image::RgbImage::from_pixel(100, 50, image::Rgb([200, 30, 30]));
        let mut encoded = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(source)
            .write_to(&mut encoded, ImageFormat::Png)
            .expect("encode fixture");

        let resized = resize_by_short_edge(encoded.get_ref(), 25).expect("resize");
        let decoded = image::load_from_memory(&resized).expect("decode output");
        assert_eq!((decoded.width(), decoded.height()), (50, 25));
    }

    #[test]
    fn resize_is_deterministic() {
        let source = image::RgbImage::from_fn(30, 40, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let mut encoded = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(source)
            .write_to(&mut encoded, ImageFormat::Png)
            .expect("encode fixture");

        let first = resize_by_short_edge(encoded.get_ref(), 20).expect("resize");
        let second = resize_by_short_edge(encoded.get_ref(), 20).expect("resize");
        assert_eq!(first, second);
    }

    #[test]
    fn garbage_input_is_an_image_error() {
        let result = resize_by_short_edge(b"not an image", 224);
        assert!(matches!(result, Err(FrameError::Image(_))));
    }
}
