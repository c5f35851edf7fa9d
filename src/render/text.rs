//! Caption lines: one centered, unwrapped line per call, painted as an optional shadow layer and a
//! fill layer, each composited with the layer opacity.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::{
    assets::font::FontResolver,
    compile::ops::TextDraw,
    config::{FontConfig, FontSlot, Shadow},
    foundation::{
        core::{Rect, Rgba8},
        error::{CapResult, CapstackError},
    },
    render::{
        blur::{blur_shadow_in_place, radius_for_blur},
        composite::over_region,
        surface::{PixelRegion, RasterSurface},
    },
};

/// A registered font file, ready for layout and drawing.
struct LoadedFace {
    family: String,
    bytes: Arc<Vec<u8>>,
    /// Drawing handles keyed by face index within the file.
    drawing: HashMap<u32, vello_cpu::peniko::FontData>,
}

impl LoadedFace {
    fn drawing_font(&mut self, index: u32) -> vello_cpu::peniko::FontData {
        let bytes = &self.bytes;
        self.drawing
            .entry(index)
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                    index,
                )
            })
            .clone()
    }
}

struct PlacedGlyph {
    id: u32,
    x: f32,
    y: f32,
}

struct ShapedRun {
    font_index: u32,
    font_size: f32,
    /// Positions relative to the line's left edge on the baseline.
    glyphs: Vec<PlacedGlyph>,
}

struct ShapedLine {
    runs: Vec<ShapedRun>,
    advance: f32,
    ascent: f32,
    descent: f32,
}

/// Lays out and paints caption lines with `parley` and `vello_cpu`.
///
/// Fonts are resolved on first use per slot and kept for the renderer's lifetime.
pub(crate) struct CaptionTextRenderer {
    fonts: FontConfig,
    resolver: FontResolver,
    faces: HashMap<FontSlot, LoadedFace>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
}

impl CaptionTextRenderer {
    pub(crate) fn new(fonts: FontConfig) -> Self {
        Self {
            fonts,
            resolver: FontResolver::default(),
            faces: HashMap::new(),
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Paint one caption layer onto `surface`.
    pub(crate) fn draw(&mut self, surface: &mut RasterSurface, op: &TextDraw) -> CapResult<()> {
        let text = single_line(&op.text);
        if text.trim().is_empty() {
            return Ok(());
        }
        let slot = op.role.font_slot();
        self.ensure_face(slot, op)?;
        let line = self.shape(slot, &text, op)?;
        let Some(line) = line else {
            return Ok(());
        };

        let style = op.style;
        let origin_x = op.center_x - f64::from(line.advance) / 2.0;
        let origin_y = op.baseline_y;

        if let Some(shadow) = style.shadow.filter(casts_shadow) {
            let ox = origin_x + f64::from(shadow.offset_x);
            let oy = origin_y + f64::from(shadow.offset_y);
            let pad = f64::from(radius_for_blur(shadow.blur));
            if let Some(region) =
                PixelRegion::covering(line_bounds(&line, ox, oy, style.font_size, pad), surface)
            {
                let mut layer = self.paint(slot, &line, ox, oy, shadow.color, region)?;
                blur_shadow_in_place(&mut layer, region.width, region.height, shadow.blur)?;
                over_region(surface, region, &layer, style.opacity)?;
            }
        }

        if let Some(region) = PixelRegion::covering(
            line_bounds(&line, origin_x, origin_y, style.font_size, 0.0),
            surface,
        ) {
            let layer = self.paint(slot, &line, origin_x, origin_y, style.fill, region)?;
            over_region(surface, region, &layer, style.opacity)?;
        }
        Ok(())
    }

    fn ensure_face(&mut self, slot: FontSlot, op: &TextDraw) -> CapResult<()> {
        if self.faces.contains_key(&slot) {
            return Ok(());
        }
        let resolved = self.resolver.resolve(&self.fonts, slot, op.style.weight)?;
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(resolved.bytes.as_ref().clone()), None);

        let collection = &mut self.font_ctx.collection;
        let names: Vec<String> = families
            .iter()
            .filter_map(|(id, _)| collection.family_name(*id).map(str::to_owned))
            .collect();
        let family = resolved
            .family
            .as_ref()
            .and_then(|want| names.iter().find(|n| n.eq_ignore_ascii_case(want)))
            .or_else(|| names.first())
            .cloned()
            .ok_or_else(|| {
                CapstackError::render(format!(
                    "font '{}' registered no usable families",
                    resolved.origin
                ))
            })?;

        tracing::debug!(?slot, %family, origin = %resolved.origin, "loaded caption font");
        self.faces.insert(
            slot,
            LoadedFace {
                family,
                bytes: resolved.bytes,
                drawing: HashMap::new(),
            },
        );
        Ok(())
    }

    fn shape(&mut self, slot: FontSlot, text: &str, op: &TextDraw) -> CapResult<Option<ShapedLine>> {
        let family = self
            .faces
            .get(&slot)
            .map(|f| f.family.clone())
            .ok_or_else(|| CapstackError::render(format!("no font loaded for {slot:?}")))?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(op.style.font_size));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(op.style.weight.css_value())),
        ));
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let Some(line) = layout.lines().next() else {
            return Ok(None);
        };
        let metrics = line.metrics();
        let mut runs = Vec::new();
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run
                .positioned_glyphs()
                .map(|g| PlacedGlyph {
                    id: g.id,
                    x: g.x,
                    y: g.y - metrics.baseline,
                })
                .collect();
            runs.push(ShapedRun {
                font_index: run.run().font().index,
                font_size: run.run().font_size(),
                glyphs,
            });
        }
        Ok(Some(ShapedLine {
            runs,
            advance: metrics.advance,
            ascent: metrics.ascent,
            descent: metrics.descent,
        }))
    }

    /// Render the line's glyphs in `color` into a fresh region-sized premultiplied buffer.
    fn paint(
        &mut self,
        slot: FontSlot,
        line: &ShapedLine,
        origin_x: f64,
        origin_y: f64,
        color: Rgba8,
        region: PixelRegion,
    ) -> CapResult<Vec<u8>> {
        let face = self
            .faces
            .get_mut(&slot)
            .ok_or_else(|| CapstackError::render(format!("no font loaded for {slot:?}")))?;
        let (w, h) = region.pixmap_size()?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            origin_x - f64::from(region.x),
            origin_y - f64::from(region.y),
        )));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        for run in &line.runs {
            let font = face.drawing_font(run.font_index);
            let glyphs = run.glyphs.iter().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font)
                .font_size(run.font_size)
                .fill_glyphs(glyphs);
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        Ok(pixmap.data_as_u8_slice().to_vec())
    }
}

/// Canvas text never breaks lines; newlines render as spaces.
fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        Cow::Owned(text.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// A shadow is drawn only when it is visible and displaced or blurred.
fn casts_shadow(shadow: &Shadow) -> bool {
    shadow.color.a > 0 && (shadow.blur > 0.0 || shadow.offset_x != 0.0 || shadow.offset_y != 0.0)
}

/// Canvas-space box that holds every painted pixel of the line at `(x, baseline_y)`.
fn line_bounds(line: &ShapedLine, x: f64, baseline_y: f64, font_size: f32, pad: f64) -> Rect {
    // Glyph ink may overhang the advance box and the font's ascent/descent.
    let slack = f64::from(font_size) * 0.25 + pad + 1.0;
    Rect::new(
        x - slack,
        baseline_y - f64::from(line.ascent) - slack,
        x + f64::from(line.advance) + slack,
        baseline_y + f64::from(line.descent) + slack,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
