use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::StorageError;
use crate::config::CompressionConfig;

#[derive(Debug, Clone, Copy)]
pub struct CompressionSettings {
    pub threshold_bytes: u64,
    pub target_bytes: u64,
    pub max_attempts: u32,
    pub initial_quality: u8,
    pub min_quality: u8,
}

impl From<&CompressionConfig> for CompressionSettings {
    fn from(config: &CompressionConfig) -> Self {
        Self {
            threshold_bytes: config.threshold_bytes,
            target_bytes: config.target_bytes,
            max_attempts: config.max_attempts,
            initial_quality: config.initial_quality,
            min_quality: config.min_quality,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::from(&CompressionConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// Below the threshold or a format without an encoder here (bmp).
    Skipped,
    Compressed {
        original_bytes: u64,
        compressed_bytes: u64,
        attempts: u32,
    },
    /// Every attempt stayed above the target; the original is left as uploaded.
    GaveUp { attempts: u32 },
}

/// Runs [`compress_file`] on the blocking pool.
pub async fn compress_image(
    path: PathBuf,
    settings: CompressionSettings,
) -> Result<CompressionOutcome, StorageError> {
    tokio::task::spawn_blocking(move || compress_file(&path, &settings))
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}

/// Re-encodes an image in place until it fits `target_bytes`. Each attempt
/// goes to `<file>.tmp`, which replaces the original only on success.
pub fn compress_file(
    path: &Path,
    settings: &CompressionSettings,
) -> Result<CompressionOutcome, StorageError> {
    let original_bytes = fs::metadata(path)?.len();
    if original_bytes < settings.threshold_bytes {
        log::debug!(
            "Skipping compression for {} ({} bytes)",
            path.display(),
            original_bytes
        );
        return Ok(CompressionOutcome::Skipped);
    }

    let format = match ImageFormat::from_path(path) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => format,
        _ => {
            log::warn!("Unsupported format for compression: {}", path.display());
            return Ok(CompressionOutcome::Skipped);
        }
    };

    let temp_path = temp_path_for(path);
    let result = run_attempts(path, &temp_path, format, original_bytes, settings);
    if !matches!(result, Ok(CompressionOutcome::Compressed { .. })) {
        if let Err(e) = fs::remove_file(&temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::error!("Failed to remove {}: {}", temp_path.display(), e);
            }
        }
    }
    result
}

fn run_attempts(
    path: &Path,
    temp_path: &Path,
    format: ImageFormat,
    original_bytes: u64,
    settings: &CompressionSettings,
) -> Result<CompressionOutcome, StorageError> {
    let mut image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let mut quality = settings.initial_quality;

    for attempt in 1..=settings.max_attempts {
        encode(&image, format, quality, temp_path)?;
        let written = fs::metadata(temp_path)?.len();

        if written <= settings.target_bytes {
            fs::rename(temp_path, path)?;
            log::info!(
                "Compressed {} from {} to {} bytes in {} attempt(s)",
                path.display(),
                original_bytes,
                written,
                attempt
            );
            return Ok(CompressionOutcome::Compressed {
                original_bytes,
                compressed_bytes: written,
                attempts: attempt,
            });
        }

        let ratio = settings.target_bytes as f64 / written as f64;
        let next_quality = next_quality(ratio, settings);
        if format == ImageFormat::Jpeg && next_quality < quality {
            quality = next_quality;
        } else {
            image = downscale(&image, ratio);
        }
    }

    log::warn!(
        "Could not bring {} under {} bytes after {} attempts",
        path.display(),
        settings.target_bytes,
        settings.max_attempts
    );
    Ok(CompressionOutcome::GaveUp {
        attempts: settings.max_attempts,
    })
}

fn next_quality(ratio: f64, settings: &CompressionSettings) -> u8 {
    let scaled = (ratio * settings.initial_quality as f64).floor() as u8;
    scaled.max(settings.min_quality)
}

fn downscale(image: &DynamicImage, ratio: f64) -> DynamicImage {
    let factor = ratio.sqrt() * 0.9;
    let width = ((image.width() as f64 * factor) as u32).max(1);
    let height = ((image.height() as f64 * factor) as u32).max(1);
    image.resize_exact(width, height, FilterType::Triangle)
}

fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    temp_path: &Path,
) -> Result<(), StorageError> {
    let writer = BufWriter::new(File::create(temp_path)?);
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?;
        }
        ImageFormat::Png => {
            image.write_with_encoder(PngEncoder::new_with_quality(
                writer,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        _ => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(writer))?;
        }
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
