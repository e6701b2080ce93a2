//! Image decoding and downscaling.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::ThumbnailError;

/// Produces encoded preview bytes for a source image.
///
/// Implementations run on blocking worker threads.
pub trait ThumbnailGenerator: Send + Sync + 'static {
    /// Decodes `source` and returns a PNG no larger than `max_width` ×
    /// `max_height`.
    fn generate(
        &self,
        source: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<Vec<u8>, ThumbnailError>;
}

/// [`ThumbnailGenerator`] backed by the `image` crate.
///
/// Images are fitted into the bounding box preserving aspect ratio with a
/// Lanczos3 filter. Images already inside the box are re-encoded unscaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageThumbnailer;

impl ThumbnailGenerator for ImageThumbnailer {
    fn generate(
        &self,
        source: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<Vec<u8>, ThumbnailError> {
        let img = image::open(source)
            .map_err(|e| ThumbnailError::Decode(format!("{}: {e}", source.display())))?;

        let fitted = if img.width() > max_width || img.height() > max_height {
            img.resize(max_width, max_height, FilterType::Lanczos3)
        } else {
            img
        };

        // PNG cannot hold every decoded pixel format; RGBA8 covers all sources.
        let rgba = DynamicImage::ImageRgba8(fitted.to_rgba8());
        let mut out = Cursor::new(Vec::new());
        rgba.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ThumbnailError::Decode(format!("encode failed: {e}")))?;

        Ok(out.into_inner())
    }
}
