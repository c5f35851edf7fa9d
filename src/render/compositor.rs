use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::decode::DecodedImage,
    compile::ops::{DrawOp, compile_draw_ops},
    config::{CaptionStyle, FontConfig},
    foundation::{
        core::{Affine, Rect, Rgba8},
        error::{CapResult, CapstackError},
    },
    layout::planner::LayoutPlan,
    render::{
        composite::over_region,
        surface::{PixelRegion, RasterSurface},
        text::CaptionTextRenderer,
    },
    scene::item::CaptionedImage,
};

/// Tallest strip rasterized in one `vello_cpu` pass; pixmaps are limited to u16 sides.
const IMAGE_TILE_ROWS: u32 = 2048;

/// Executes layout plans onto a white raster surface.
///
/// Ops run strictly in order on the calling thread. Fonts stay loaded between renders.
pub struct Compositor {
    style: CaptionStyle,
    text: CaptionTextRenderer,
}

impl Compositor {
    pub fn new(style: CaptionStyle, fonts: FontConfig) -> CapResult<Self> {
        style.validate()?;
        Ok(Self {
            style,
            text: CaptionTextRenderer::new(fonts),
        })
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    /// Composite `items` according to `plan`.
    ///
    /// Every failure is reported as [`CapstackError::Render`]; no partial surface escapes.
    #[tracing::instrument(
        skip_all,
        fields(bands = plan.bands.len(), width = plan.canvas_width, height = plan.canvas_height)
    )]
    pub fn render(
        &mut self,
        plan: &LayoutPlan,
        items: &[CaptionedImage],
    ) -> CapResult<RasterSurface> {
        self.render_ops(plan, items)
            .map_err(CapstackError::into_render)
    }

    fn render_ops(
        &mut self,
        plan: &LayoutPlan,
        items: &[CaptionedImage],
    ) -> CapResult<RasterSurface> {
        let ops = compile_draw_ops(plan, items, &self.style)?;
        let mut surface =
            RasterSurface::filled(plan.canvas_width, plan.canvas_height, Rgba8::WHITE)?;
        let mut paints = ImagePaints::default();

        for op in &ops {
            match op {
                DrawOp::Image {
                    source,
                    transform,
                    clip,
                    ..
                } => {
                    let image = items
                        .get(*source)
                        .map(|item| &item.image)
                        .ok_or_else(|| CapstackError::render(format!("missing item {source}")))?;
                    draw_image(&mut surface, &mut paints, image, *transform, *clip)?;
                }
                DrawOp::Text(t) => self.text.draw(&mut surface, t)?,
            }
        }
        tracing::debug!(ops = ops.len(), images = paints.by_ptr.len(), "composited");
        Ok(surface)
    }
}

/// `vello_cpu` image paints for this render, shared by items holding the same decoded image.
#[derive(Default)]
struct ImagePaints {
    by_ptr: HashMap<*const DecodedImage, vello_cpu::Image>,
}

impl ImagePaints {
    fn get(&mut self, image: &Arc<DecodedImage>) -> CapResult<vello_cpu::Image> {
        if let Some(p) = self.by_ptr.get(&Arc::as_ptr(image)) {
            return Ok(p.clone());
        }
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap_from_decoded(image)?)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.by_ptr.insert(Arc::as_ptr(image), paint.clone());
        Ok(paint)
    }
}

fn pixmap_from_decoded(image: &DecodedImage) -> CapResult<vello_cpu::Pixmap> {
    let w = u16::try_from(image.width).map_err(|_| {
        CapstackError::render(format!("image width {} exceeds u16", image.width))
    })?;
    let h = u16::try_from(image.height).map_err(|_| {
        CapstackError::render(format!("image height {} exceeds u16", image.height))
    })?;
    let bytes = image.rgba8_premul.as_slice();
    if bytes.len() != usize::from(w) * usize::from(h) * 4 {
        return Err(CapstackError::render("decoded image byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    // Opaque flag lets vello skip blending for fully opaque sources.
    let opaque = bytes.chunks_exact(4).all(|px| px[3] == 255);
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, opaque))
}

/// Draw `image` through `transform`, limited to `clip`. Only the visible part is rasterized.
fn draw_image(
    surface: &mut RasterSurface,
    paints: &mut ImagePaints,
    image: &Arc<DecodedImage>,
    transform: Affine,
    clip: Option<Rect>,
) -> CapResult<()> {
    let image_rect = Rect::new(0.0, 0.0, f64::from(image.width), f64::from(image.height));
    let mut visible = transform.transform_rect_bbox(image_rect);
    if let Some(clip) = clip {
        visible = visible.intersect(clip);
    }
    let Some(region) = PixelRegion::covering(visible, surface) else {
        return Ok(());
    };
    let visible = visible.intersect(surface.bounds());
    let inverse = transform.inverse();
    if !inverse.is_finite() {
        return Err(CapstackError::render("image transform is not invertible"));
    }
    // Fill only the source rect that lands inside the visible window, so the clip edge is exact.
    let src_rect = inverse.transform_rect_bbox(visible).intersect(image_rect);
    let paint = paints.get(image)?;

    for tile in region.rows(IMAGE_TILE_ROWS) {
        let (w, h) = tile.pixmap_size()?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        let to_tile = Affine::translate((-f64::from(tile.x), -f64::from(tile.y))) * transform;
        ctx.set_transform(vello_cpu::kurbo::Affine::new(to_tile.as_coeffs()));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            src_rect.x0,
            src_rect.y0,
            src_rect.x1,
            src_rect.y1,
        ));
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        over_region(surface, tile, pixmap.data_as_u8_slice(), 1.0)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
