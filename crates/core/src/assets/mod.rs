use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{accessory::Accessory, Result, TryOnError};

/// Slot a user-supplied image can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideSlot {
    Ear,
    Neck,
    Nose,
}

impl OverrideSlot {
    pub const ALL: [OverrideSlot; 3] = [OverrideSlot::Ear, OverrideSlot::Neck, OverrideSlot::Nose];

    pub fn for_accessory(accessory: Accessory) -> Self {
        match accessory {
            Accessory::Earrings => OverrideSlot::Ear,
            Accessory::Necklace => OverrideSlot::Neck,
            Accessory::Nosepin => OverrideSlot::Nose,
        }
    }

    fn index(self) -> usize {
        match self {
            OverrideSlot::Ear => 0,
            OverrideSlot::Neck => 1,
            OverrideSlot::Nose => 2,
        }
    }
}

type Slots = [Option<Arc<RgbaImage>>; 3];

/// Store for the override images, shared between the renderer and whatever
/// loads files for the user.
///
/// Decoding happens on tokio's blocking pool; a slot is only touched once a
/// decode has succeeded. When several decodes for one slot are in flight the
/// one that finishes last wins.
#[derive(Clone, Default)]
pub struct AssetOverrideStore {
    slots: Arc<Mutex<Slots>>,
}

impl AssetOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an already decoded image.
    pub fn set(&self, slot: OverrideSlot, image: RgbaImage) -> Result<()> {
        let mut slots = self.lock()?;
        slots[slot.index()] = Some(Arc::new(image));
        Ok(())
    }

    /// Decodes `bytes` off the render path and installs the result. Resolves
    /// to the decode outcome; on failure the slot keeps its previous image.
    pub fn set_from_bytes(&self, slot: OverrideSlot, bytes: Vec<u8>) -> JoinHandle<Result<()>> {
        let store = self.clone();
        tokio::spawn(async move {
            let decoded = tokio::task::spawn_blocking(move || decode(&bytes))
                .await
                .map_err(|err| TryOnError::msg(format!("asset decode task failed: {err}")))?;

            match decoded {
                Ok(image) => {
                    tracing::info!(
                        ?slot,
                        width = image.width(),
                        height = image.height(),
                        "override asset loaded"
                    );
                    store.set(slot, image)
                }
                Err(err) => {
                    tracing::warn!(?slot, "override asset rejected: {err}");
                    Err(err)
                }
            }
        })
    }

    /// Reads `path` and hands its bytes to [`Self::set_from_bytes`].
    pub async fn load_file(&self, slot: OverrideSlot, path: impl AsRef<Path>) -> Result<()> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        self.set_from_bytes(slot, bytes)
            .await
            .map_err(|err| TryOnError::msg(format!("asset decode task failed: {err}")))?
    }

    /// Removes the override. Clearing an empty slot is a no-op.
    pub fn clear(&self, slot: OverrideSlot) -> Result<()> {
        let mut slots = self.lock()?;
        slots[slot.index()] = None;
        Ok(())
    }

    pub fn get(&self, slot: OverrideSlot) -> Option<Arc<RgbaImage>> {
        self.lock().ok().and_then(|slots| slots[slot.index()].clone())
    }

    pub fn is_empty(&self) -> bool {
        OverrideSlot::ALL.iter().all(|slot| self.get(*slot).is_none())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|_| TryOnError::msg("override store has been poisoned"))
    }
}

impl std::fmt::Debug for AssetOverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<OverrideSlot> = OverrideSlot::ALL
            .iter()
            .copied()
            .filter(|slot| self.get(*slot).is_some())
            .collect();
        f.debug_struct("AssetOverrideStore")
            .field("loaded", &loaded)
            .finish()
    }
}

fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(TryOnError::InvalidInput("override asset is empty"));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}
