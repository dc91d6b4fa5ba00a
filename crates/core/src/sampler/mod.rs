//! Throttled capture of video frames for the detection service.

use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, RgbImage};

use crate::config::SamplerConfig;
use crate::protocol::{OutboundFrame, JPEG_DATA_URL_PREFIX};
use crate::transport::FrameTransport;
use crate::Result;

/// Live video as the sampler and the compositor see it.
pub trait VideoSource {
    /// Pixel size of the stream once it is ready; `None` before then.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// The current frame, unmirrored, or `None` when not ready.
    fn frame(&mut self) -> Option<RgbImage>;
}

/// Source that replays one still image forever.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    frame: RgbImage,
}

impl StillImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let frame = image::open(path.as_ref())?.to_rgb8();
        Ok(Self::from_image(frame))
    }

    pub fn from_image(frame: RgbImage) -> Self {
        Self { frame }
    }
}

impl VideoSource for StillImageSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        let dims = self.frame.dimensions();
        (dims.0 > 0 && dims.1 > 0).then_some(dims)
    }

    fn frame(&mut self) -> Option<RgbImage> {
        self.dimensions().map(|_| self.frame.clone())
    }
}

/// Source standing in for a camera that could not be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl VideoSource for UnavailableSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn frame(&mut self) -> Option<RgbImage> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TransportNotOpen,
    SourceNotReady,
    EncodeFailed,
}

/// Result of one sampler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The previous capture was less than one interval ago.
    RateLimited,
    /// Nothing was captured; the next tick tries again.
    Skipped(SkipReason),
    /// A frame of `bytes` encoded bytes was queued.
    Sent { bytes: usize },
    /// A frame was encoded but the transport refused it.
    Dropped,
}

/// Captures, mirrors and encodes frames at most once per interval.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: Duration,
    jpeg_quality: u8,
    max_width: Option<u32>,
    data_url: bool,
    last_capture: Option<Instant>,
}

impl FrameSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            interval: config.interval(),
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
            max_width: config.max_width,
            data_url: config.data_url,
            last_capture: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one capture attempt at time `now`.
    pub fn tick(
        &mut self,
        now: Instant,
        source: &mut dyn VideoSource,
        transport: &mut FrameTransport,
    ) -> SampleOutcome {
        if let Some(last) = self.last_capture {
            if now.saturating_duration_since(last) < self.interval {
                return SampleOutcome::RateLimited;
            }
        }
        if !transport.is_open() {
            return SampleOutcome::Skipped(SkipReason::TransportNotOpen);
        }
        let Some(frame) = source.frame() else {
            return SampleOutcome::Skipped(SkipReason::SourceNotReady);
        };

        self.last_capture = Some(now);
        let jpeg = match encode_frame(&frame, self.jpeg_quality, self.max_width) {
            Ok(jpeg) => jpeg,
            Err(err) => {
                tracing::warn!("frame encode failed: {err}");
                return SampleOutcome::Skipped(SkipReason::EncodeFailed);
            }
        };

        let bytes = jpeg.len();
        let frame = OutboundFrame {
            image: to_payload(&jpeg, self.data_url),
        };
        if transport.send_frame(&frame) {
            tracing::trace!(bytes, "frame queued for detection");
            SampleOutcome::Sent { bytes }
        } else {
            SampleOutcome::Dropped
        }
    }
}

/// Mirrors `frame` horizontally, shrinks it to `max_width` if wider, and
/// encodes it as JPEG.
pub fn encode_frame(frame: &RgbImage, quality: u8, max_width: Option<u32>) -> Result<Vec<u8>> {
    let mut mirrored = imageops::flip_horizontal(frame);
    if let Some(max_width) = max_width.filter(|w| *w > 0) {
        let (width, height) = mirrored.dimensions();
        if width > max_width {
            let scaled_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
            mirrored = imageops::resize(&mirrored, max_width, scaled_height, FilterType::Triangle);
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&mirrored)?;
    Ok(buffer.into_inner())
}

/// Base64 payload for the `image` field.
pub fn to_payload(jpeg: &[u8], data_url: bool) -> String {
    let encoded = BASE64_STANDARD.encode(jpeg);
    if data_url {
        format!("{JPEG_DATA_URL_PREFIX}{encoded}")
    } else {
        encoded
    }
}
