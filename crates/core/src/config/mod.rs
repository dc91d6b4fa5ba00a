use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::accessory::AccessorySettings;
use crate::assets::OverrideSlot;
use crate::transport::ReconnectPolicy;
use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub sampler: SamplerConfig,
    pub render: RenderConfig,
    pub accessories: AccessorySettings,
    pub overrides: OverrideConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where the detection service lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Host and optional port, e.g. `127.0.0.1:5000`.
    pub host: String,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
    pub path: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:5000".to_string(),
            secure: false,
            path: "/ws".to_string(),
            reconnect: ReconnectPolicy::Never,
        }
    }
}

impl TransportConfig {
    /// WebSocket URL of the detection endpoint.
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = self.path.trim_start_matches('/');
        format!("{scheme}://{}/{path}", self.host.trim_end_matches('/'))
    }
}

/// Frame capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum time between two captured frames.
    pub interval_ms: u64,
    pub jpeg_quality: u8,
    /// Frames wider than this are downscaled before encoding.
    pub max_width: Option<u32>,
    /// Prefix payloads with `data:image/jpeg;base64,`.
    pub data_url: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            jpeg_quality: 60,
            max_width: None,
            data_url: true,
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Overlay refresh rate.
    pub refresh_hz: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { refresh_hz: 60 }
    }
}

impl RenderConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.clamp(1, 240) as f64)
    }
}

/// Image files to load into the override slots at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub ear: Option<PathBuf>,
    pub neck: Option<PathBuf>,
    pub nose: Option<PathBuf>,
}

impl OverrideConfig {
    /// Configured files paired with the slot each one fills.
    pub fn entries(&self) -> Vec<(OverrideSlot, &Path)> {
        [
            (OverrideSlot::Ear, &self.ear),
            (OverrideSlot::Neck, &self.neck),
            (OverrideSlot::Nose, &self.nose),
        ]
        .into_iter()
        .filter_map(|(slot, path)| path.as_deref().map(|path| (slot, path)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{EarringStyle, NecklaceStyle};

    #[test]
    fn defaults_match_the_stock_setup() {
        let config = AppConfig::default();
        assert_eq!(config.transport.endpoint(), "ws://127.0.0.1:5000/ws");
        assert_eq!(config.sampler.interval(), Duration::from_millis(100));
        assert_eq!(config.sampler.jpeg_quality, 60);
        assert!(config.sampler.data_url);
        assert_eq!(config.transport.reconnect, ReconnectPolicy::Never);
        assert!(config.overrides.entries().is_empty());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "transport": { "host": "tryon.example.com", "secure": true,
                               "reconnect": { "mode": "backoff", "initial_ms": 500, "max_ms": 8000 } },
                "accessories": { "necklace": { "enabled": true, "style": "pearl" } },
                "overrides": { "neck": "assets/choker.png" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.transport.endpoint(), "wss://tryon.example.com/ws");
        assert_eq!(
            config.transport.reconnect,
            ReconnectPolicy::Backoff {
                initial_ms: 500,
                max_ms: 8000,
                max_attempts: None
            }
        );
        assert!(config.accessories.necklace.enabled);
        assert_eq!(config.accessories.necklace.style, Some(NecklaceStyle::Pearl));
        assert_eq!(config.accessories.necklace.scale_boost, 1.0);
        assert_eq!(config.accessories.earrings.style, Some(EarringStyle::Stud));
        assert_eq!(config.render.refresh_hz, 60);
        assert_eq!(
            config.overrides.entries(),
            vec![(OverrideSlot::Neck, Path::new("assets/choker.png"))]
        );
    }

    #[test]
    fn unknown_style_in_config_is_rejected() {
        let result = AppConfig::from_json(r#"{"accessories":{"earrings":{"style":"chandelier"}}}"#);
        assert!(result.is_err());
    }
}
