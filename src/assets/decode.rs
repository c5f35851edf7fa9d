use std::sync::Arc;

use anyhow::Context;

use crate::foundation::{
    error::{CapResult, CapstackError},
    math::mul_div255_u8,
};

/// Decoded raster image in premultiplied RGBA8 form.
///
/// Shared behind an `Arc` between every item that references the same source. Drawing applies
/// scale/crop through per-band descriptors; the pixel buffer is never rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels, always > 0.
    pub width: u32,
    /// Height in pixels, always > 0.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    /// Build from straight RGBA8 pixels, premultiplying them.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> CapResult<Self> {
        if width == 0 || height == 0 {
            return Err(CapstackError::image_decode(anyhow::anyhow!(
                "image has zero size ({width}x{height})"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| {
                CapstackError::image_decode(anyhow::anyhow!("image byte size overflow"))
            })?;
        if rgba.len() != expected {
            return Err(CapstackError::image_decode(anyhow::anyhow!(
                "rgba buffer is {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }
}

/// Decode any format the `image` crate understands.
pub fn decode_image(bytes: &[u8]) -> CapResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(CapstackError::image_decode)?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::from_straight_rgba8(width, height, rgba.into_raw())
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = mul_div255_u8(u16::from(*c), a);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
