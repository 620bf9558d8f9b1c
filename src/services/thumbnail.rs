use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::error::{AppError, Result};

/// Edge length of the square thumbnail
pub const THUMBNAIL_SIZE: u32 = 200;
/// JPEG quality of the encoded thumbnail
pub const THUMBNAIL_QUALITY: u8 = 85;

/// A rendered thumbnail plus the natural size of its source
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Thumbnail service
pub struct ThumbnailService;

impl ThumbnailService {
    /// Decode `source`, crop-fill it to a centred square and encode it as JPEG.
    /// Runs on the blocking pool.
    pub async fn generate(source: Bytes) -> Result<Thumbnail> {
        tokio::task::spawn_blocking(move || Self::generate_blocking(&source))
            .await
            .map_err(|e| AppError::Internal(format!("Thumbnail task failed: {}", e)))?
    }

    fn generate_blocking(source: &[u8]) -> Result<Thumbnail> {
        let img = image::load_from_memory(source)?;
        let (width, height) = (img.width(), img.height());

        // Cover fit: scale to fill then crop the centre
        let thumb = img.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);

        // JPEG has no alpha channel
        let rgb = thumb.to_rgb8();
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, THUMBNAIL_QUALITY).encode_image(&rgb)?;

        Ok(Thumbnail {
            data: Bytes::from(out.into_inner()),
            width,
            height,
        })
    }
}
