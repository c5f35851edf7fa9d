use serde::Serialize;

use crate::{
    config::{CaptionStyle, FontSlot, TextLayerStyle},
    foundation::core::{Affine, Rect},
    foundation::error::{CapResult, CapstackError},
    layout::planner::LayoutPlan,
    scene::item::CaptionedImage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
/// Which caption layer a text op paints.
pub enum TextRole {
    /// Dark translucent pass beneath the primary line.
    PrimaryGlow,
    /// White pass over the glow.
    PrimaryFill,
    /// The smaller second line.
    Secondary,
}

impl TextRole {
    pub(crate) fn font_slot(self) -> FontSlot {
        match self {
            TextRole::PrimaryGlow | TextRole::PrimaryFill => FontSlot::Primary,
            TextRole::Secondary => FontSlot::Secondary,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// One centered caption line.
pub struct TextDraw {
    /// Band index the line belongs to.
    pub band: usize,
    pub role: TextRole,
    pub text: String,
    pub center_x: f64,
    pub baseline_y: f64,
    pub style: TextLayerStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// A single compositor instruction; ops execute strictly in list order.
pub enum DrawOp {
    /// Draw item `source`'s image through `transform`, limited to `clip` when set.
    Image {
        band: usize,
        source: usize,
        transform: Affine,
        clip: Option<Rect>,
    },
    /// Draw one caption layer.
    Text(TextDraw),
}

impl DrawOp {
    pub fn band(&self) -> usize {
        match self {
            DrawOp::Image { band, .. } => *band,
            DrawOp::Text(t) => t.band,
        }
    }

    pub fn as_text(&self) -> Option<&TextDraw> {
        match self {
            DrawOp::Text(t) => Some(t),
            DrawOp::Image { .. } => None,
        }
    }
}

/// Lower a layout plan into ordered draw ops.
///
/// Per band: the image, then primary glow and fill (if the primary caption is non-empty), then the
/// secondary line (if non-empty).
pub fn compile_draw_ops(
    plan: &LayoutPlan,
    items: &[CaptionedImage],
    style: &CaptionStyle,
) -> CapResult<Vec<DrawOp>> {
    if plan.bands.len() != items.len() {
        return Err(CapstackError::validation(format!(
            "plan has {} bands but {} items were given",
            plan.bands.len(),
            items.len()
        )));
    }

    let mut ops = Vec::with_capacity(items.len() * 4);
    for (band_i, band) in plan.bands.iter().enumerate() {
        let source = band.draw.source;
        let item = items.get(source).ok_or_else(|| {
            CapstackError::validation(format!("band {band_i} references missing item {source}"))
        })?;

        ops.push(DrawOp::Image {
            band: band_i,
            source,
            transform: band.draw.transform(),
            clip: band.draw.clip,
        });

        let Some(caption) = band.caption else {
            continue;
        };
        let text_op = |role: TextRole, text: &str, baseline_y: f64, style: TextLayerStyle| {
            DrawOp::Text(TextDraw {
                band: band_i,
                role,
                text: text.to_owned(),
                center_x: caption.center_x,
                baseline_y,
                style,
            })
        };

        if !item.caption_primary.is_empty() {
            ops.push(text_op(
                TextRole::PrimaryGlow,
                &item.caption_primary,
                caption.primary_baseline_y,
                style.primary_glow,
            ));
            ops.push(text_op(
                TextRole::PrimaryFill,
                &item.caption_primary,
                caption.primary_baseline_y,
                style.primary_fill,
            ));
        }
        if !item.caption_secondary.is_empty() {
            ops.push(text_op(
                TextRole::Secondary,
                &item.caption_secondary,
                caption.secondary_baseline_y,
                style.secondary,
            ));
        }
    }

    tracing::debug!(bands = plan.bands.len(), ops = ops.len(), "compiled draw ops");
    Ok(ops)
}

#[cfg(test)]
#[path = "../../tests/unit/compile/ops.rs"]
mod tests;
