use std::path::Path;

use anyhow::Context as _;

use crate::{
    bridge::LoopOptions,
    engine::EngineSettings,
    foundation::{
        core::{ByteOrder, Rgba8, Viewport},
        error::{BridgeError, BridgeResult},
    },
};

/// Byte order used to pick channel masks. `Native` follows the build target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrderChoice {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrderChoice {
    pub fn resolve(self) -> ByteOrder {
        match self {
            Self::Native => ByteOrder::native(),
            Self::Little => ByteOrder::Little,
            Self::Big => ByteOrder::Big,
        }
    }
}

/// Startup configuration for one offscreen browser window.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub title: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Rows reserved above the browser content; the viewport starts below them.
    pub header_height: u32,
    pub background: Rgba8,
    pub byte_order: ByteOrderChoice,
    pub windowless_rendering_enabled: bool,
    pub max_iterations: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            title: "offscreen browser".to_string(),
            url: "https://www.google.com/".to_string(),
            width: 1024,
            height: 768,
            header_height: 0,
            background: Rgba8::BLACK,
            byte_order: ByteOrderChoice::Native,
            windowless_rendering_enabled: true,
            max_iterations: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(s: &str) -> BridgeResult<Self> {
        serde_json::from_str(s).map_err(|e| BridgeError::serde(format!("bridge config: {e}")))
    }

    pub fn from_json_path(path: &Path) -> BridgeResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg = Self::from_json_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::validation(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.url.trim().is_empty() {
            return Err(BridgeError::validation("url must not be empty"));
        }
        if !self.windowless_rendering_enabled {
            return Err(BridgeError::validation(
                "offscreen rendering requires windowless_rendering_enabled",
            ));
        }
        self.viewport().map(|_| ())
    }

    pub fn viewport(&self) -> BridgeResult<Viewport> {
        Viewport::below_header(self.width, self.height, self.header_height)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            windowless_rendering_enabled: self.windowless_rendering_enabled,
        }
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            max_iterations: self.max_iterations,
        }
    }
}
