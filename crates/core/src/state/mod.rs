use crate::accessory::{AccessoryControls, AccessorySettings};
use crate::assets::AssetOverrideStore;
use crate::landmarks::LandmarkSlot;
use crate::status::{StatusReceiver, StatusReporter};

/// Handles to everything the transport, renderer and controls share.
///
/// Cloning is cheap; every clone points at the same slots.
#[derive(Debug, Clone)]
pub struct AppState {
    pub landmarks: LandmarkSlot,
    pub accessories: AccessoryControls,
    pub overrides: AssetOverrideStore,
    pub status: StatusReporter,
}

impl AppState {
    /// Creates fresh shared state plus the receiving end of the status feed.
    pub fn new(settings: AccessorySettings) -> (Self, StatusReceiver) {
        let (status, status_rx) = StatusReporter::channel();
        let state = Self {
            landmarks: LandmarkSlot::new(),
            accessories: AccessoryControls::new(settings),
            overrides: AssetOverrideStore::new(),
            status,
        };
        (state, status_rx)
    }
}
