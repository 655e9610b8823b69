//! Image payload decoding (data URL or bare base64 into an RGB pixel grid).

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::{ImageReader, Limits, RgbImage};
use std::io::Cursor;
use thiserror::Error;

// Browsers and mobile clients disagree on trailing padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded pixel grid handed to the heuristic estimator.
pub type Pixels = RgbImage;

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 8192;

const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Empty image payload")]
    Empty,

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Undecodable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels")]
    NoPixels,
}

fn strip_data_url(input: &str) -> &str {
    if !input.starts_with("data:") {
        return input;
    }
    match input.find(',') {
        Some(idx) => &input[idx + 1..],
        None => "",
    }
}

pub fn decode_image(payload: &str) -> Result<Pixels, CodecError> {
    let encoded = strip_data_url(payload.trim());
    if encoded.is_empty() {
        return Err(CodecError::Empty);
    }

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = PAYLOAD_ENGINE.decode(compact.as_bytes())?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::from)?;
    reader.limits(limits);

    let rgb = reader.decode()?.into_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(CodecError::NoPixels);
    }
    Ok(rgb)
}

/// MIME type sniffed from the first bytes of a bare base64 payload.
fn sniff_mime(encoded: &str) -> &'static str {
    // 64 base64 chars cover every magic number `guess_format` knows.
    let head: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .take(64)
        .collect();
    let head = &head[..head.len() - head.len() % 4];

    PAYLOAD_ENGINE
        .decode(head.as_bytes())
        .ok()
        .and_then(|bytes| image::guess_format(&bytes).ok())
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// The remote model only accepts data URLs. Bare base64 is labelled with the
/// sniffed format, JPEG when the bytes are not recognised.
pub fn to_data_url(payload: &str) -> String {
    let trimmed = payload.trim();
    if trimmed.starts_with("data:image") {
        trimmed.to_string()
    } else {
        format!("data:{};base64,{trimmed}", sniff_mime(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 30]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(&buf)
    }

    #[test]
    fn decodes_data_url() {
        let url = format!("data:image/png;base64,{}", png_base64(4, 3));
        let img = decode_image(&url).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0), &Rgb([200, 40, 30]));
    }

    #[test]
    fn decodes_bare_base64_without_padding() {
        let b64 = png_base64(2, 2);
        let unpadded = b64.trim_end_matches('=');
        assert!(decode_image(unpadded).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_image(""), Err(CodecError::Empty)));
        assert!(matches!(decode_image("data:image/png;base64"), Err(CodecError::Empty)));
        assert!(matches!(decode_image("***not base64***"), Err(CodecError::Base64(_))));

        let not_an_image = STANDARD.encode(b"hello world, definitely not a png");
        assert!(matches!(decode_image(&not_an_image), Err(CodecError::Image(_))));
    }

    #[test]
    fn data_url_prefix_added_once() {
        assert_eq!(to_data_url("AAAA"), "data:image/jpeg;base64,AAAA");
        assert_eq!(to_data_url("data:image/png;base64,AAAA"), "data:image/png;base64,AAAA");
    }

    #[test]
    fn bare_payload_labelled_with_sniffed_format() {
        let b64 = png_base64(3, 3);
        let url = to_data_url(&b64);
        assert_eq!(url, format!("data:image/png;base64,{b64}"));
        assert!(decode_image(&url).is_ok());
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let wide = png_base64(MAX_DIMENSION + 1, 1);
        assert!(matches!(decode_image(&wide), Err(CodecError::Image(_))));

        let tall = png_base64(1, MAX_DIMENSION + 1);
        assert!(matches!(decode_image(&tall), Err(CodecError::Image(_))));

        assert!(decode_image(&png_base64(MAX_DIMENSION, 1)).is_ok());
    }
}
