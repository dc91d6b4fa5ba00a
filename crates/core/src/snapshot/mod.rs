use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::render::{OverlayRenderer, RasterSurface, RenderOutcome};
use crate::Result;

/// Lays the overlay over the mirrored video frame, the way the user sees it.
///
/// An overlay of a different size is stretched to the frame first.
pub fn compose(video: &RgbImage, overlay: &RgbaImage) -> RgbaImage {
    let mirrored = imageops::flip_horizontal(video);
    let mut out = DynamicImage::ImageRgb8(mirrored).to_rgba8();
    let (width, height) = out.dimensions();
    if width == 0 || height == 0 || overlay.width() == 0 || overlay.height() == 0 {
        return out;
    }

    if overlay.dimensions() == (width, height) {
        imageops::overlay(&mut out, overlay, 0, 0);
    } else {
        let fitted = imageops::resize(overlay, width, height, FilterType::Triangle);
        imageops::overlay(&mut out, &fitted, 0, 0);
    }
    out
}

/// Renders one overlay sized to `frame` and composes the two.
pub fn render_still(renderer: &OverlayRenderer, frame: &RgbImage) -> (RenderOutcome, RgbaImage) {
    let (width, height) = frame.dimensions();
    let mut overlay = RasterSurface::new(width, height);
    let outcome = renderer.tick(&mut overlay);
    (outcome, compose(frame, &overlay.to_image()))
}

pub fn export_png(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.save_with_format(path, ImageFormat::Png)?;
    tracing::info!(path = %path.display(), "snapshot written");
    Ok(())
}

/// `jewelry_tryon_<unix millis>.png`
pub fn default_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("jewelry_tryon_{millis}.png")
}
