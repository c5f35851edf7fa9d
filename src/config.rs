//! Caption styling and font selection.
//!
//! Defaults reproduce the stock look: a 36 px bold primary line drawn twice (a dark-blue glow
//! beneath a white fill) and a 20 px secondary line with a hard black drop shadow.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::foundation::{
    core::Rgba8,
    error::{CapResult, CapstackError},
};

/// Environment variable consulted when no explicit font path is configured.
pub const FONT_ENV_VAR: &str = "CAPSTACK_FONT";

/// Dark blue used for the primary caption glow and shadow.
pub const CAPTION_BLUE: Rgba8 = Rgba8::rgb(0x00, 0x31, 0x53);

/// Font weight of a caption layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub(crate) fn css_value(self) -> u16 {
        match self {
            FontWeight::Normal => 400,
            FontWeight::Bold => 700,
        }
    }
}

/// Drop shadow drawn beneath a text layer, HTML-canvas style.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub color: Rgba8,
    /// Canvas `shadowBlur`; the Gaussian sigma is half of it. `0` is a hard shadow.
    #[serde(default)]
    pub blur: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

/// One painted text layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLayerStyle {
    pub font_size: f32,
    #[serde(default)]
    pub weight: FontWeight,
    pub fill: Rgba8,
    /// Applied to the fill and its shadow alike.
    #[serde(default = "one")]
    pub opacity: f32,
    #[serde(default)]
    pub shadow: Option<Shadow>,
}

fn one() -> f32 {
    1.0
}

impl TextLayerStyle {
    fn validate(&self, what: &str) -> CapResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(CapstackError::validation(format!(
                "{what}.font_size must be finite and > 0"
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(CapstackError::validation(format!(
                "{what}.opacity must be within [0, 1]"
            )));
        }
        if let Some(s) = self.shadow {
            if !s.blur.is_finite() || s.blur < 0.0 {
                return Err(CapstackError::validation(format!(
                    "{what}.shadow.blur must be finite and >= 0"
                )));
            }
            if !s.offset_x.is_finite() || !s.offset_y.is_finite() {
                return Err(CapstackError::validation(format!(
                    "{what}.shadow offsets must be finite"
                )));
            }
        }
        Ok(())
    }
}

/// Styling for all three caption layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    /// Drawn first, beneath the primary fill.
    pub primary_glow: TextLayerStyle,
    pub primary_fill: TextLayerStyle,
    pub secondary: TextLayerStyle,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            primary_glow: TextLayerStyle {
                font_size: 36.0,
                weight: FontWeight::Bold,
                fill: CAPTION_BLUE,
                opacity: 0.8,
                shadow: Some(Shadow {
                    color: CAPTION_BLUE,
                    blur: 4.0,
                    offset_x: -1.0,
                    offset_y: -1.0,
                }),
            },
            primary_fill: TextLayerStyle {
                font_size: 36.0,
                weight: FontWeight::Bold,
                fill: Rgba8::WHITE,
                opacity: 1.0,
                shadow: Some(Shadow {
                    color: CAPTION_BLUE,
                    blur: 4.0,
                    offset_x: 2.0,
                    offset_y: 2.0,
                }),
            },
            secondary: TextLayerStyle {
                font_size: 20.0,
                weight: FontWeight::Normal,
                fill: Rgba8::WHITE,
                opacity: 1.0,
                shadow: Some(Shadow {
                    color: Rgba8::BLACK,
                    blur: 0.0,
                    offset_x: 1.0,
                    offset_y: 1.0,
                }),
            },
        }
    }
}

impl CaptionStyle {
    /// Reject non-finite sizes, out-of-range opacities and negative blurs.
    pub fn validate(&self) -> CapResult<()> {
        self.primary_glow.validate("primary_glow")?;
        self.primary_fill.validate("primary_fill")?;
        self.secondary.validate("secondary")
    }
}

/// Which font a caption layer is set in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FontSlot {
    Primary,
    Secondary,
}

/// Font files for the two caption slots.
///
/// Unset slots fall back to [`FONT_ENV_VAR`], then to a system font query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub primary_font: Option<PathBuf>,
    pub secondary_font: Option<PathBuf>,
}

impl FontConfig {
    /// Use one font file for both slots.
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.primary_font = Some(path.clone());
        self.secondary_font = Some(path);
        self
    }

    pub(crate) fn path_for(&self, slot: FontSlot) -> Option<&PathBuf> {
        match slot {
            FontSlot::Primary => self.primary_font.as_ref(),
            FontSlot::Secondary => self.secondary_font.as_ref(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
