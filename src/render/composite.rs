use crate::{
    foundation::error::{CapResult, CapstackError},
    foundation::math::{mul_div255_u8, opacity_u8},
    render::surface::{PixelRegion, RasterSurface},
};

pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel, with `src` scaled by `opacity` first.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: u8) -> PremulRgba8 {
    let op = u16::from(opacity);
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite a region-sized premultiplied buffer onto `dst` at the region's offset.
pub(crate) fn over_region(
    dst: &mut RasterSurface,
    region: PixelRegion,
    src: &[u8],
    opacity: f32,
) -> CapResult<()> {
    if src.len() != region.byte_len() {
        return Err(CapstackError::render(format!(
            "region buffer is {} bytes, expected {}",
            src.len(),
            region.byte_len()
        )));
    }
    if region.x + region.width > dst.width || region.y + region.height > dst.height {
        return Err(CapstackError::render("region lies outside the surface"));
    }
    let op = opacity_u8(opacity);
    if op == 0 {
        return Ok(());
    }

    let dst_stride = dst.width as usize * 4;
    let row_len = region.width as usize * 4;
    for (row, src_row) in src.chunks_exact(row_len).enumerate() {
        let start = (region.y as usize + row) * dst_stride + region.x as usize * 4;
        let dst_row = &mut dst.data[start..start + row_len];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], op);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
