//! Viewer configuration.
//!
//! The recognized options and their effects:
//!
//! | option | effect |
//! |---|---|
//! | `split` | pages grouped per visible side (2 = book spread, 1 = single page) |
//! | `open` | initial anchor page index |
//! | `tile` | target tile size in pixels, drives grid density |
//! | `cache` | tile retention horizon (tile-creation-order count) |
//! | `delay` | debounce quiet period for pan/resize, in milliseconds |
//! | `duration` | settle delay before post-pan/zoom recompute, in milliseconds |
//! | `imageslice` | URL template for the external image-slicing service |

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_IMAGESLICE: &str =
    "imageslice.php?src={src}&width={width}&height={height}&left={left}&top={top}&right={right}&bottom={bottom}";

/// Configuration for a mounted viewer.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Pages grouped per visible spread side.
    #[serde(default = "default_split")]
    pub split: usize,

    /// Initial anchor page index.
    #[serde(default)]
    pub open: usize,

    /// Target tile size in pixels.
    #[serde(default = "default_tile")]
    pub tile: u32,

    /// Tile retention horizon in tile creations.
    #[serde(default = "default_cache")]
    pub cache: u64,

    /// Debounce quiet period for pan/scroll/resize, in milliseconds.
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Settle delay before the post-move recompute, in milliseconds.
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Crop-URL template with `{src} {width} {height} {left} {top}
    /// {right} {bottom}` placeholders.
    #[serde(default = "default_imageslice")]
    pub imageslice: String,
}

fn default_split() -> usize {
    2
}

fn default_tile() -> u32 {
    256
}

fn default_cache() -> u64 {
    128
}

fn default_delay() -> u64 {
    250
}

fn default_duration() -> u64 {
    600
}

fn default_imageslice() -> String {
    DEFAULT_IMAGESLICE.to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            split: default_split(),
            open: 0,
            tile: default_tile(),
            cache: default_cache(),
            delay: default_delay(),
            duration: default_duration(),
            imageslice: default_imageslice(),
        }
    }
}

impl ViewerConfig {
    /// Debounce quiet period as a [`Duration`].
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    /// Settle delay as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }

    /// Parse a YAML configuration document and validate it.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot operate under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split == 0 {
            return Err(ConfigError::Invalid("`split` must be at least 1"));
        }
        if self.tile == 0 {
            return Err(ConfigError::Invalid("`tile` must be at least 1 pixel"));
        }
        if self.imageslice.is_empty() {
            return Err(ConfigError::Invalid("`imageslice` template is empty"));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}
