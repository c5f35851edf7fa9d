//! Layout planning: where every image and caption line lands on the output canvas.
//!
//! The planner is a pure function of the decoded image sizes and caption presence. Band 0 shows
//! image 0 in full; every later band shows only the bottom slice of its image, cut to a shared
//! caption-band height derived from band 0.

use serde::Serialize;

use crate::{
    foundation::core::{Affine, Rect},
    foundation::error::{CapResult, CapstackError},
    scene::item::CaptionedImage,
};

/// Output canvas width; every image is rescaled to it.
pub const CANVAS_WIDTH: u32 = 800;

/// Caption bands are this fraction of band 0's rescaled height, before clamping.
pub const CAPTION_BAND_RATIO: f64 = 0.15;
/// Lower clamp for the caption band height.
pub const CAPTION_BAND_MIN: f64 = 80.0;
/// Upper clamp for the caption band height.
pub const CAPTION_BAND_MAX: f64 = 120.0;

/// Largest canvas, in pixels, a plan may ask for: the 16384 x 16384 area cap browsers put on a
/// canvas. Narrow first images otherwise scale into canvases far taller than memory allows.
pub const MAX_CANVAS_PIXELS: u64 = 16_384 * 16_384;

/// Primary baseline distance from the band bottom when a secondary line is present.
pub const PRIMARY_BASELINE_OFFSET_WITH_SECONDARY: f64 = 65.0;
/// Primary baseline distance from the band bottom when it is the only line.
pub const PRIMARY_BASELINE_OFFSET_ALONE: f64 = 55.0;
/// Secondary baseline distance from the band bottom.
pub const SECONDARY_BASELINE_OFFSET: f64 = 25.0;

/// Fully resolved description of one output image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutPlan {
    /// Canvas width in pixels (always [`CANVAS_WIDTH`]).
    pub canvas_width: u32,
    /// Canvas height in whole pixels: `content_height` rounded, at least 1.
    pub canvas_height: u32,
    /// Exact sum of all band heights.
    pub content_height: f64,
    /// Shared height of bands 1.. (also computed for single-item plans).
    pub caption_band_height: f64,
    /// One band per item, top to bottom.
    pub bands: Vec<Band>,
}

/// A horizontal strip of the canvas holding one item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Band {
    pub top_y: f64,
    pub height_px: f64,
    pub draw: DrawRect,
    /// Present only when the item has at least one non-empty caption.
    pub caption: Option<CaptionLayout>,
}

impl Band {
    pub fn bottom_y(&self) -> f64 {
        self.top_y + self.height_px
    }
}

/// How a band's image is drawn: uniform scale, translation, optional clip in canvas space.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawRect {
    /// Index of the item whose image is drawn.
    pub source: usize,
    pub dest_x: f64,
    pub dest_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Absolute canvas-space clip; `None` draws the whole scaled image.
    pub clip: Option<Rect>,
}

impl DrawRect {
    /// Image-space to canvas-space transform.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.dest_x, self.dest_y))
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// Where a band's caption lines sit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CaptionLayout {
    pub primary_baseline_y: f64,
    pub secondary_baseline_y: f64,
    pub center_x: f64,
}

/// Compute the layout for `items`, top to bottom in slice order.
///
/// Fails with [`CapstackError::EmptyInput`] when `items` is empty.
#[tracing::instrument(skip_all, fields(items = items.len()))]
pub fn plan(items: &[CaptionedImage]) -> CapResult<LayoutPlan> {
    let Some(first) = items.first() else {
        return Err(CapstackError::EmptyInput);
    };

    let canvas_w = f64::from(CANVAS_WIDTH);
    let (scale0, full_height0) = fit_to_width(first.image.width, first.image.height)?;
    let caption_band_height = caption_band_height(full_height0);

    let mut bands = Vec::with_capacity(items.len());
    bands.push(Band {
        top_y: 0.0,
        height_px: full_height0,
        draw: DrawRect {
            source: 0,
            dest_x: 0.0,
            dest_y: 0.0,
            scale_x: scale0,
            scale_y: scale0,
            clip: None,
        },
        caption: caption_layout(first, full_height0),
    });

    let mut top_y = full_height0;
    for (i, item) in items.iter().enumerate().skip(1) {
        let (scale, full_height) = fit_to_width(item.image.width, item.image.height)?;
        let bottom = top_y + caption_band_height;
        bands.push(Band {
            top_y,
            height_px: caption_band_height,
            draw: DrawRect {
                source: i,
                dest_x: 0.0,
                dest_y: bottom - full_height,
                scale_x: scale,
                scale_y: scale,
                clip: Some(Rect::new(0.0, top_y, canvas_w, bottom)),
            },
            caption: caption_layout(item, bottom),
        });
        top_y = bottom;
    }

    let content_height = full_height0 + (items.len() - 1) as f64 * caption_band_height;
    let canvas_height = content_height.round().max(1.0);
    if canvas_height * f64::from(CANVAS_WIDTH) > MAX_CANVAS_PIXELS as f64 {
        return Err(CapstackError::validation(format!(
            "canvas {CANVAS_WIDTH}x{canvas_height} exceeds the {MAX_CANVAS_PIXELS} pixel limit"
        )));
    }

    tracing::debug!(
        bands = bands.len(),
        content_height,
        caption_band_height,
        "layout planned"
    );

    Ok(LayoutPlan {
        canvas_width: CANVAS_WIDTH,
        canvas_height: canvas_height as u32,
        content_height,
        caption_band_height,
        bands,
    })
}

/// `clamp(full_height0 * 0.15, 80, 120)`.
pub fn caption_band_height(full_height0: f64) -> f64 {
    (full_height0 * CAPTION_BAND_RATIO).clamp(CAPTION_BAND_MIN, CAPTION_BAND_MAX)
}

/// Uniform scale mapping `width` onto [`CANVAS_WIDTH`], and the resulting height.
fn fit_to_width(width: u32, height: u32) -> CapResult<(f64, f64)> {
    if width == 0 || height == 0 {
        return Err(CapstackError::validation(format!(
            "image size must be non-zero, got {width}x{height}"
        )));
    }
    let canvas_w = f64::from(CANVAS_WIDTH);
    // Multiply first: integral heights must come out exact.
    let full_height = f64::from(height) * canvas_w / f64::from(width);
    Ok((canvas_w / f64::from(width), full_height))
}

fn caption_layout(item: &CaptionedImage, band_bottom: f64) -> Option<CaptionLayout> {
    if !item.has_captions() {
        return None;
    }
    let primary_offset = if item.caption_secondary.is_empty() {
        PRIMARY_BASELINE_OFFSET_ALONE
    } else {
        PRIMARY_BASELINE_OFFSET_WITH_SECONDARY
    };
    Some(CaptionLayout {
        primary_baseline_y: band_bottom - primary_offset,
        secondary_baseline_y: band_bottom - SECONDARY_BASELINE_OFFSET,
        center_x: f64::from(CANVAS_WIDTH) / 2.0,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/layout/planner.rs"]
mod tests;
