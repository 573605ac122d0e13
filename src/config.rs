// src/config.rs

//! Configuration for the platform layer.
//!
//! Every section is `#[serde(default)]`, so a configuration file only needs
//! the keys it changes. GL attribute requests are stored by their stable
//! integer ids.

use crate::event::OverflowPolicy;
use crate::video::attributes::{AttributeRequest, GlAttr};
use anyhow::Context;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "CORE_MEDIA_CONFIG";

/// Process-wide configuration for the binary, read once from
/// `CORE_MEDIA_CONFIG` or falling back to defaults.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match std::env::var(CONFIG_ENV_VAR) {
    Ok(path) => match Config::load(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path);
            config
        }
        Err(err) => {
            warn!("Ignoring configuration {}: {:#}", path, err);
            Config::default()
        }
    },
    Err(_) => Config::default(),
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub events: EventsConfig,
    pub input: InputConfig,
    pub video: VideoConfig,
    pub headless: HeadlessConfig,
    pub joystick: JoystickConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing configuration JSON")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

// --- Events ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Maximum queued events; ignored by the unbounded policy.
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig {
            queue_capacity: crate::event::queue::DEFAULT_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

// --- Input ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Milliseconds before a held key repeats; 0 disables repeat.
    pub key_repeat_delay_ms: u32,
    pub key_repeat_interval_ms: u32,
    /// Fill in codepoints for key presses that arrive without one.
    pub unicode_translation: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            key_repeat_delay_ms: 0,
            key_repeat_interval_ms: 30,
            unicode_translation: true,
        }
    }
}

// --- Video ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Attribute requests applied before the first mode set.
    pub attributes: Vec<AttributeRequest>,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    /// 0 means the display depth.
    pub bits_per_pixel: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            attributes: vec![
                AttributeRequest::preferred(GlAttr::RedSize, 5),
                AttributeRequest::preferred(GlAttr::GreenSize, 5),
                AttributeRequest::preferred(GlAttr::BlueSize, 5),
                AttributeRequest::preferred(GlAttr::DepthSize, 16),
                AttributeRequest::preferred(GlAttr::DoubleBuffer, 1),
            ],
            caption: "core-media".to_string(),
            width: 640,
            height: 480,
            bits_per_pixel: 0,
        }
    }
}

// --- Headless display ---

/// One framebuffer configuration a display can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferConfig {
    pub red_size: i32,
    pub green_size: i32,
    pub blue_size: i32,
    pub alpha_size: i32,
    pub buffer_size: i32,
    pub double_buffer: bool,
    pub depth_size: i32,
    pub stencil_size: i32,
    pub accum_red_size: i32,
    pub accum_green_size: i32,
    pub accum_blue_size: i32,
    pub accum_alpha_size: i32,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        FramebufferConfig::rgb(8, 8, 8, 0, 24, 8, true)
    }
}

impl FramebufferConfig {
    pub const fn rgb(
        red: i32,
        green: i32,
        blue: i32,
        alpha: i32,
        depth: i32,
        stencil: i32,
        double_buffer: bool,
    ) -> Self {
        FramebufferConfig {
            red_size: red,
            green_size: green,
            blue_size: blue,
            alpha_size: alpha,
            buffer_size: red + green + blue + alpha,
            double_buffer,
            depth_size: depth,
            stencil_size: stencil,
            accum_red_size: 0,
            accum_green_size: 0,
            accum_blue_size: 0,
            accum_alpha_size: 0,
        }
    }

    pub const fn with_accum(mut self, red: i32, green: i32, blue: i32, alpha: i32) -> Self {
        self.accum_red_size = red;
        self.accum_green_size = green;
        self.accum_blue_size = blue;
        self.accum_alpha_size = alpha;
        self
    }

    pub fn get(&self, attr: GlAttr) -> i32 {
        match attr {
            GlAttr::RedSize => self.red_size,
            GlAttr::GreenSize => self.green_size,
            GlAttr::BlueSize => self.blue_size,
            GlAttr::AlphaSize => self.alpha_size,
            GlAttr::DoubleBuffer => i32::from(self.double_buffer),
            GlAttr::BufferSize => self.buffer_size,
            GlAttr::DepthSize => self.depth_size,
            GlAttr::StencilSize => self.stencil_size,
            GlAttr::AccumRedSize => self.accum_red_size,
            GlAttr::AccumGreenSize => self.accum_green_size,
            GlAttr::AccumBlueSize => self.accum_blue_size,
            GlAttr::AccumAlphaSize => self.accum_alpha_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    pub display_width: u32,
    pub display_height: u32,
    /// Depth used when a mode asks for 0 bits per pixel.
    pub display_depth: u8,
    pub video_memory_kb: u32,
    pub hw_available: bool,
    pub wm_available: bool,
    /// Candidate GL configurations, in the order the display lists them.
    pub framebuffer_configs: Vec<FramebufferConfig>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            display_width: 1920,
            display_height: 1080,
            display_depth: 32,
            video_memory_kb: 64 * 1024,
            hw_available: false,
            wm_available: true,
            framebuffer_configs: vec![
                FramebufferConfig::rgb(5, 6, 5, 0, 16, 0, false),
                FramebufferConfig::rgb(5, 6, 5, 0, 16, 0, true),
                FramebufferConfig::rgb(8, 8, 8, 0, 24, 8, true),
                FramebufferConfig::rgb(8, 8, 8, 8, 24, 8, true),
                FramebufferConfig::rgb(8, 8, 8, 8, 32, 8, true).with_accum(16, 16, 16, 16),
            ],
        }
    }
}

// --- Joystick ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualJoystickConfig {
    pub name: String,
    pub axes: u8,
    pub buttons: u8,
    pub hats: u8,
    pub balls: u8,
}

impl Default for VirtualJoystickConfig {
    fn default() -> Self {
        VirtualJoystickConfig {
            name: "Virtual Gamepad".to_string(),
            axes: 2,
            buttons: 4,
            hats: 1,
            balls: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    /// Devices exposed by the virtual backend. Empty by default.
    pub devices: Vec<VirtualJoystickConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::attributes::Requirement;
    use test_log::test;

    #[test]
    fn it_should_fill_missing_sections_with_defaults() -> anyhow::Result<()> {
        let config = Config::from_json_str(r#"{ "events": { "queue_capacity": 8 } }"#)?;
        assert_eq!(config.events.queue_capacity, 8);
        assert_eq!(config.events.overflow_policy, OverflowPolicy::RejectNewest);
        assert_eq!(config.input, InputConfig::default());
        assert_eq!(config.headless, HeadlessConfig::default());
        assert!(config.joystick.devices.is_empty());
        Ok(())
    }

    #[test]
    fn it_should_read_attribute_requests_by_id() -> anyhow::Result<()> {
        let config = Config::from_json_str(
            r#"{
                "events": { "overflow_policy": "drop_oldest" },
                "video": { "attributes": [
                    { "attr": 6, "value": 24, "requirement": "required" },
                    { "attr": 4, "value": 1 }
                ] },
                "joystick": { "devices": [ { "name": "Pad", "axes": 6 } ] }
            }"#,
        )?;
        assert_eq!(config.events.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(
            config.video.attributes,
            vec![
                AttributeRequest { attr: GlAttr::DepthSize, value: 24, requirement: Requirement::Required },
                AttributeRequest::preferred(GlAttr::DoubleBuffer, 1),
            ]
        );
        assert_eq!(config.video.width, 640);
        assert_eq!(config.joystick.devices[0].axes, 6);
        assert_eq!(config.joystick.devices[0].buttons, 4);
        Ok(())
    }

    #[test]
    fn it_should_round_trip_through_json() -> anyhow::Result<()> {
        let config = Config::default();
        let json = serde_json::to_string(&config)?;
        assert_eq!(Config::from_json_str(&json)?, config);
        Ok(())
    }

    #[test]
    fn it_should_report_malformed_files() {
        let err = Config::from_json_str(r#"{ "video": { "attributes": [ { "attr": 99, "value": 1 } ] } }"#)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("parsing configuration JSON"));
        assert!(Config::load("/nonexistent/core-media.json").is_err());
    }

    #[test]
    fn it_should_expose_framebuffer_attributes() {
        let fb = FramebufferConfig::rgb(8, 8, 8, 8, 24, 8, true).with_accum(16, 16, 16, 0);
        assert_eq!(fb.get(GlAttr::BufferSize), 32);
        assert_eq!(fb.get(GlAttr::DoubleBuffer), 1);
        assert_eq!(fb.get(GlAttr::AccumGreenSize), 16);
    }
}
