//! Pre-upload image shrinking.
//!
//! Raster images over the byte budget are clamped to `max_dimension` on the
//! longest edge and re-encoded. PNGs with any non-opaque sampled pixel stay
//! PNG; everything else becomes JPEG, walking quality down from
//! `initial_quality` by `quality_step` until the budget or `min_quality` is
//! reached. The result is only used when it is strictly smaller than the
//! input.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

use crate::config::ImageConfig;
use crate::images::file::UploadFile;

/// Upper bound on pixels inspected for transparency.
const ALPHA_SAMPLES: u64 = 40_000;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Shrink `file` if it is a raster image over budget; otherwise hand it back.
pub fn compress_image(file: UploadFile, config: &ImageConfig) -> UploadFile {
    if is_exempt(&file, config) {
        return file;
    }

    match recompress(&file, config) {
        Ok(out) if out.len() < file.len() => {
            tracing::debug!(
                file = %file.file_name,
                before = file.len(),
                after = out.len(),
                content_type = %out.content_type,
                "Image compressed"
            );
            out
        }
        Ok(out) => {
            tracing::debug!(
                file = %file.file_name,
                before = file.len(),
                after = out.len(),
                "Re-encoding did not shrink image, keeping original"
            );
            file
        }
        Err(e) => {
            tracing::warn!(file = %file.file_name, error = %e, "Could not process image, uploading as-is");
            file
        }
    }
}

/// Vector/icon formats and files already within budget are left alone.
pub fn is_exempt(file: &UploadFile, config: &ImageConfig) -> bool {
    if file.len() <= config.max_bytes {
        return true;
    }
    matches!(file.extension().as_deref(), Some("svg") | Some("ico"))
        || matches!(
            file.content_type.as_str(),
            "image/svg+xml" | "image/x-icon" | "image/vnd.microsoft.icon"
        )
}

fn recompress(file: &UploadFile, config: &ImageConfig) -> Result<UploadFile, ImageError> {
    let format = image::guess_format(&file.bytes)?;
    let img = image::load_from_memory_with_format(&file.bytes, format)?;
    let img = clamp_dimensions(img, config.max_dimension);

    if format == ImageFormat::Png && has_transparency(&img) {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        return Ok(UploadFile::new(file.file_name.clone(), "image/png", buf));
    }

    let bytes = encode_jpeg_within_budget(&img.to_rgb8(), config)?;
    Ok(UploadFile::new(
        file.renamed_with_extension("jpg"),
        "image/jpeg",
        bytes,
    ))
}

/// Longest edge capped at `max_dimension`, aspect ratio preserved.
pub fn clamp_dimensions(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// True if any sampled pixel has alpha below 255.
pub fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }

    let rgba = img.to_rgba8();
    let total = u64::from(rgba.width()) * u64::from(rgba.height());
    let stride = (total / ALPHA_SAMPLES).max(1) as usize;

    rgba.pixels().step_by(stride).any(|p| p.0[3] < u8::MAX)
}

fn encode_jpeg_within_budget(rgb: &RgbImage, config: &ImageConfig) -> Result<Vec<u8>, ImageError> {
    // Whole percent steps avoid float drift (0.85, 0.75, ... 0.45).
    let mut quality = percent(config.initial_quality);
    let floor = percent(config.min_quality);
    let step = percent(config.quality_step).max(1);

    let mut best = encode_jpeg(rgb, quality)?;
    while best.len() > config.max_bytes && quality - step >= floor {
        quality -= step;
        best = encode_jpeg(rgb, quality)?;
    }

    tracing::trace!(quality, bytes = best.len(), budget = config.max_bytes, "JPEG encode settled");
    Ok(best)
}

fn encode_jpeg(rgb: &RgbImage, quality: i32) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    let quality = quality.clamp(1, 100) as u8;
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(rgb)?;
    Ok(buf)
}

fn percent(fraction: f32) -> i32 {
    (fraction * 100.0).round() as i32
}
