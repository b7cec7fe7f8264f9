//! Region extraction and JPEG encoding helpers.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ColorType, RgbImage};
use vshop_models::PixelRect;

use crate::error::MediaResult;

/// JPEG quality for frame and crop artifacts.
pub const JPEG_QUALITY: u8 = 90;

/// Copy the pixels inside `rect` into a new image.
pub fn crop(frame: &RgbImage, rect: PixelRect) -> RgbImage {
    imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Encode an RGB image as JPEG.
pub fn encode_jpeg(image: &RgbImage) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;
    Ok(buf)
}
