//! Configuration options for a picking surface.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{PickError, Result};
use crate::material::PassTag;

/// Allowed values for [`PickingOptions::downscale`].
pub const DOWNSCALE_RANGE: RangeInclusive<u32> = 1..=8;

/// Per-surface picking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingOptions {
    /// Factor by which the viewport resolution is divided to size the pick
    /// target. Larger values are cheaper but coarser.
    pub downscale: u32,

    /// Tag selecting the materials drawn by the id pass.
    pub pass_tag: PassTag,
}

impl Default for PickingOptions {
    fn default() -> Self {
        Self {
            downscale: 4,
            pass_tag: PassTag::default(),
        }
    }
}

impl PickingOptions {
    /// Sets the downscale divisor.
    #[must_use]
    pub fn with_downscale(mut self, downscale: u32) -> Self {
        self.downscale = downscale;
        self
    }

    /// Sets the replacement pass tag.
    #[must_use]
    pub fn with_pass_tag(mut self, pass_tag: PassTag) -> Self {
        self.pass_tag = pass_tag;
        self
    }

    /// Checks that every option is within range.
    pub fn validate(&self) -> Result<()> {
        if !DOWNSCALE_RANGE.contains(&self.downscale) {
            return Err(PickError::InvalidDownscale(self.downscale));
        }
        Ok(())
    }

    /// Parses and validates options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
