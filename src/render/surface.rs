use crate::{
    foundation::{
        core::{Rect, Rgba8},
        error::{CapResult, CapstackError},
    },
    layout::planner::MAX_CANVAS_PIXELS,
};

/// A composited image as RGBA8 pixels.
///
/// Pixels are **premultiplied alpha**, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterSurface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl RasterSurface {
    /// Allocate a surface with every pixel set to `color`.
    ///
    /// Sizes above [`MAX_CANVAS_PIXELS`] and failed allocations are render errors.
    pub(crate) fn filled(width: u32, height: u32, color: Rgba8) -> CapResult<Self> {
        if width == 0 || height == 0 {
            return Err(CapstackError::render(format!(
                "surface must be non-empty, got {width}x{height}"
            )));
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_CANVAS_PIXELS {
            return Err(CapstackError::render(format!(
                "surface {width}x{height} exceeds the {MAX_CANVAS_PIXELS} pixel limit"
            )));
        }
        let len = usize::try_from(pixels * 4).map_err(CapstackError::render_from)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CapstackError::render_from(
                anyhow::Error::new(e).context(format!("allocate {width}x{height} surface")),
            )
        })?;
        data.resize(len, 0);
        let px = color.to_premul();
        for d in data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Premultiplied pixel at `(x, y)`, or `None` out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data
            .get(i..i + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub(crate) fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Integer pixel window of a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PixelRegion {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl PixelRegion {
    /// Smallest pixel window covering `rect`, clipped to `surface`. `None` when nothing is visible.
    pub(crate) fn covering(rect: Rect, surface: &RasterSurface) -> Option<Self> {
        let r = rect.intersect(surface.bounds());
        if !(r.width() > 0.0 && r.height() > 0.0) {
            return None;
        }
        let x0 = r.x0.floor().max(0.0) as u32;
        let y0 = r.y0.floor().max(0.0) as u32;
        let x1 = (r.x1.ceil() as u32).min(surface.width);
        let y1 = (r.y1.ceil() as u32).min(surface.height);
        (x1 > x0 && y1 > y0).then_some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Split into horizontal strips at most `max_rows` tall.
    pub(crate) fn rows(self, max_rows: u32) -> impl Iterator<Item = PixelRegion> {
        let step = max_rows.max(1);
        let end = self.y + self.height;
        (self.y..end).step_by(step as usize).map(move |y| PixelRegion {
            x: self.x,
            y,
            width: self.width,
            height: (end - y).min(step),
        })
    }

    /// Size of a `vello_cpu` pixmap holding this region.
    pub(crate) fn pixmap_size(&self) -> CapResult<(u16, u16)> {
        let w = u16::try_from(self.width).map_err(|_| {
            CapstackError::render(format!("draw region width {} exceeds u16", self.width))
        })?;
        let h = u16::try_from(self.height).map_err(|_| {
            CapstackError::render(format!("draw region height {} exceeds u16", self.height))
        })?;
        Ok((w, h))
    }

    pub(crate) fn byte_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
