use base64::{Engine as _, engine::general_purpose};
use image::{
    ExtendedColorType, ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};
use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::{CapResult, CapstackError},
    render::surface::RasterSurface,
};

/// Encoding options for [`export_png`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOpts {
    /// Advisory quality in `[0, 1]`. Picks the PNG compression effort; pixels are never changed.
    pub quality: f32,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self { quality: 0.8 }
    }
}

impl ExportOpts {
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    fn compression(&self) -> CompressionType {
        let q = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            Self::default().quality
        };
        if q < 0.5 {
            CompressionType::Fast
        } else if q < 0.9 {
            CompressionType::Default
        } else {
            CompressionType::Best
        }
    }
}

/// An encoded PNG with its intrinsic size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ExportedImage {
    /// `data:image/png;base64,...`
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&self.png)
        )
    }
}

/// Encode a composited surface as PNG.
///
/// Surface pixels are premultiplied; they are un-premultiplied to straight RGBA before encoding.
#[tracing::instrument(skip_all, fields(width = surface.width, height = surface.height))]
pub fn export_png(surface: &RasterSurface, opts: &ExportOpts) -> CapResult<ExportedImage> {
    if surface.width == 0 || surface.height == 0 {
        return Err(CapstackError::export(format!(
            "cannot export an empty {}x{} surface",
            surface.width, surface.height
        )));
    }
    let expected = (surface.width as usize)
        .checked_mul(surface.height as usize)
        .and_then(|n| n.checked_mul(4));
    if expected != Some(surface.data.len()) {
        return Err(CapstackError::export(format!(
            "surface data is {} bytes, expected {}x{}x4",
            surface.data.len(),
            surface.width,
            surface.height
        )));
    }

    let straight = unpremultiply(&surface.data);
    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, opts.compression(), FilterType::Adaptive)
        .write_image(
            &straight,
            surface.width,
            surface.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| CapstackError::export(format!("png encode failed: {e}")))?;

    tracing::debug!(bytes = png.len(), "encoded png");
    Ok(ExportedImage {
        width: surface.width,
        height: surface.height,
        png,
    })
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        match a {
            0 => px[..3].fill(0),
            255 => {}
            _ => {
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/export/png.rs"]
mod tests;
