use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::geometry::Point;

/// One detection result in frame coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub face_width: f32,
    pub chin: Point,
    pub left_ear: Point,
    pub right_ear: Point,
    pub nose: Point,
    /// Face height reported by the detector, when it sends one.
    #[serde(default)]
    pub face_height: Option<f32>,
    /// Size of the frame the detector analysed, when it sends one.
    #[serde(default)]
    pub frame_size: Option<(f32, f32)>,
}

impl Landmarks {
    pub fn new(face_width: f32, chin: Point, left_ear: Point, right_ear: Point, nose: Point) -> Self {
        Self {
            face_width,
            chin,
            left_ear,
            right_ear,
            nose,
            face_height: None,
            frame_size: None,
        }
    }

    /// A detection is usable only with a positive, finite face width and
    /// finite anchors.
    pub fn is_valid(&self) -> bool {
        self.face_width.is_finite()
            && self.face_width > 0.0
            && [self.chin, self.left_ear, self.right_ear, self.nose]
                .iter()
                .all(|p| p.is_finite())
    }

    pub fn ears(&self) -> [Point; 2] {
        [self.left_ear, self.right_ear]
    }

    /// Maps the anchors into a `width` x `height` overlay when the detector
    /// reported analysing a frame of a different size. Face width follows the
    /// horizontal factor.
    pub fn fitted_to(&self, width: u32, height: u32) -> Landmarks {
        let Some((frame_w, frame_h)) = self.frame_size else {
            return self.clone();
        };
        if frame_w <= 0.0 || frame_h <= 0.0 || !frame_w.is_finite() || !frame_h.is_finite() {
            return self.clone();
        }
        let sx = width as f32 / frame_w;
        let sy = height as f32 / frame_h;
        if (sx - 1.0).abs() < f32::EPSILON && (sy - 1.0).abs() < f32::EPSILON {
            return self.clone();
        }
        let map = |p: Point| Point::new(p.x * sx, p.y * sy);
        Landmarks {
            face_width: self.face_width * sx,
            chin: map(self.chin),
            left_ear: map(self.left_ear),
            right_ear: map(self.right_ear),
            nose: map(self.nose),
            face_height: self.face_height.map(|h| h * sy),
            frame_size: Some((width as f32, height as f32)),
        }
    }
}

/// Snapshot of the slot: `None` when no face is present.
pub type CurrentLandmarks = Option<Arc<Landmarks>>;

/// Write side of the shared "latest landmarks" slot.
///
/// Every update swaps the whole value, so a reader holds either the previous
/// detection or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct LandmarkSlot {
    tx: Arc<watch::Sender<CurrentLandmarks>>,
}

impl LandmarkSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn replace(&self, landmarks: Landmarks) {
        self.tx.send_replace(Some(Arc::new(landmarks)));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> CurrentLandmarks {
        self.tx.borrow().clone()
    }

    pub fn reader(&self) -> LandmarkReader {
        LandmarkReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for LandmarkSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the landmark slot held by the renderer.
#[derive(Debug, Clone)]
pub struct LandmarkReader {
    rx: watch::Receiver<CurrentLandmarks>,
}

impl LandmarkReader {
    pub fn current(&self) -> CurrentLandmarks {
        self.rx.borrow().clone()
    }
}
