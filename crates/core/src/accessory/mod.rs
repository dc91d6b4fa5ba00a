//! User-facing accessory selections: which jewelry is switched on, in which
//! style, and how much it is scaled.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::TryOnError;

/// The three jewelry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessory {
    Earrings,
    Necklace,
    Nosepin,
}

impl fmt::Display for Accessory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Accessory::Earrings => "earrings",
            Accessory::Necklace => "necklace",
            Accessory::Nosepin => "nosepin",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarringStyle {
    #[default]
    Stud,
    Hoop,
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NecklaceStyle {
    #[default]
    Plain,
    Pearl,
    Pendant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoseStyle {
    Dot,
    #[default]
    Stud,
    Ring,
}

impl FromStr for EarringStyle {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stud" => Ok(Self::Stud),
            "hoop" => Ok(Self::Hoop),
            "drop" => Ok(Self::Drop),
            _ => Err(TryOnError::InvalidInput("unknown earring style")),
        }
    }
}

impl FromStr for NecklaceStyle {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "pearl" => Ok(Self::Pearl),
            "pendant" => Ok(Self::Pendant),
            _ => Err(TryOnError::InvalidInput("unknown necklace style")),
        }
    }
}

impl FromStr for NoseStyle {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "stud" => Ok(Self::Stud),
            "ring" => Ok(Self::Ring),
            _ => Err(TryOnError::InvalidInput("unknown nose style")),
        }
    }
}

/// Toggle, style and scale for one accessory.
///
/// `style` is `None` when the user picked a value that is not a known style;
/// the renderer then draws nothing for this accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig<S> {
    pub enabled: bool,
    pub style: Option<S>,
    pub scale_boost: f32,
}

impl<S> AccessoryConfig<S> {
    pub fn new(style: S) -> Self {
        Self {
            enabled: false,
            style: Some(style),
            scale_boost: 1.0,
        }
    }

    pub fn set_scale_boost(&mut self, scale: f32) {
        self.scale_boost = sanitize_scale(scale);
    }

    /// Scale boost as the renderer uses it.
    pub fn scale(&self) -> f32 {
        sanitize_scale(self.scale_boost)
    }
}

impl<S: FromStr> AccessoryConfig<S> {
    /// Applies a style picked by name. Unknown names clear the style.
    pub fn set_style_str(&mut self, value: &str) {
        self.style = value.parse().ok();
        if self.style.is_none() {
            tracing::debug!(value, "unrecognised accessory style");
        }
    }
}

impl<S: Default> Default for AccessoryConfig<S> {
    fn default() -> Self {
        Self {
            enabled: false,
            style: Some(S::default()),
            scale_boost: 1.0,
        }
    }
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.max(0.0)
    } else {
        0.0
    }
}

/// Current selections for all three accessories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorySettings {
    pub earrings: AccessoryConfig<EarringStyle>,
    pub necklace: AccessoryConfig<NecklaceStyle>,
    pub nosepin: AccessoryConfig<NoseStyle>,
}

impl AccessorySettings {
    pub fn is_enabled(&self, accessory: Accessory) -> bool {
        match accessory {
            Accessory::Earrings => self.earrings.enabled,
            Accessory::Necklace => self.necklace.enabled,
            Accessory::Nosepin => self.nosepin.enabled,
        }
    }

    pub fn toggle(&mut self, accessory: Accessory) -> bool {
        let flag = match accessory {
            Accessory::Earrings => &mut self.earrings.enabled,
            Accessory::Necklace => &mut self.necklace.enabled,
            Accessory::Nosepin => &mut self.nosepin.enabled,
        };
        *flag = !*flag;
        *flag
    }

    /// Applies one scale boost to every accessory.
    pub fn set_scale_boost(&mut self, scale: f32) {
        self.earrings.set_scale_boost(scale);
        self.necklace.set_scale_boost(scale);
        self.nosepin.set_scale_boost(scale);
    }
}

/// UI side of the accessory selections. Each edit publishes a complete new
/// [`AccessorySettings`] value; readers never see a partial edit.
#[derive(Debug, Clone)]
pub struct AccessoryControls {
    tx: Arc<watch::Sender<AccessorySettings>>,
}

impl AccessoryControls {
    pub fn new(initial: AccessorySettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut AccessorySettings),
    {
        let mut next = self.tx.borrow().clone();
        edit(&mut next);
        self.tx.send_replace(next);
    }

    pub fn current(&self) -> AccessorySettings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AccessorySettings> {
        self.tx.subscribe()
    }
}

impl Default for AccessoryControls {
    fn default() -> Self {
        Self::new(AccessorySettings::default())
    }
}
