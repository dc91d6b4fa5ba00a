//! Core library for the jewelry try-on overlay.
//!
//! Frames from a video source are mirrored, encoded and streamed to a face
//! landmark detection service over a WebSocket. Each reply replaces the shared
//! landmark slot, and the overlay renderer redraws the selected jewelry on
//! every display tick from whatever is current. Each module owns one piece of
//! that pipeline; [`session`] ties them together on a single task.

pub mod accessory;
pub mod assets;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod primitives;
pub mod protocol;
pub mod render;
pub mod sampler;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod transport;

pub use accessory::{
    Accessory, AccessoryConfig, AccessoryControls, AccessorySettings, EarringStyle, NecklaceStyle,
    NoseStyle,
};
pub use assets::{AssetOverrideStore, OverrideSlot};
pub use config::{AppConfig, RenderConfig, SamplerConfig, TransportConfig};
pub use error::{Result, TryOnError};
pub use geometry::{Point, Rect, Shape};
pub use landmarks::{LandmarkReader, LandmarkSlot, Landmarks};
pub use protocol::{InboundMessage, OutboundFrame};
pub use render::{OverlayRenderer, RasterSurface, RenderOutcome};
pub use sampler::{FrameSampler, StillImageSource, UnavailableSource, VideoSource};
pub use session::{SessionReport, TryOnSession};
pub use state::AppState;
pub use status::{Indicator, StatusBoard, StatusLevel, StatusReporter, StatusUpdate};
pub use transport::{ConnectionState, FrameTransport, ReconnectPolicy, TransportEvent};
