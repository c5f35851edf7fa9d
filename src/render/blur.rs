use crate::foundation::error::{CapResult, CapstackError};

/// Kernel radius for a canvas-style `shadowBlur` value (sigma is half the blur).
pub(crate) fn radius_for_blur(blur: f32) -> u32 {
    if !blur.is_finite() || blur <= 0.0 {
        return 0;
    }
    (3.0 * blur / 2.0).ceil() as u32
}

/// Gaussian-blur a premultiplied RGBA8 buffer in place, canvas `shadowBlur` semantics.
pub(crate) fn blur_shadow_in_place(
    data: &mut [u8],
    width: u32,
    height: u32,
    blur: f32,
) -> CapResult<()> {
    let radius = radius_for_blur(blur);
    if radius == 0 {
        return Ok(());
    }
    let expected = (width as usize) * (height as usize) * 4;
    if data.len() != expected {
        return Err(CapstackError::render(format!(
            "blur buffer is {} bytes, expected {expected}",
            data.len()
        )));
    }

    let kernel = kernel_q16(radius, blur / 2.0)?;
    let mut tmp = vec![0u8; data.len()];
    blur_axis(data, &mut tmp, width, height, &kernel, Axis::Rows);
    blur_axis(&tmp, data, width, height, &kernel, Axis::Columns);
    Ok(())
}

/// Symmetric Gaussian taps in 16.16 fixed point, summing to exactly `1 << 16`.
///
/// Side taps are rounded from the mirrored half; the center tap takes whatever remains.
fn kernel_q16(radius: u32, sigma: f32) -> CapResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CapstackError::render("blur sigma must be finite and > 0"));
    }
    let denom = 2.0 * f64::from(sigma).powi(2);
    let gauss = |d: u32| (-f64::from(d).powi(2) / denom).exp();
    let total = gauss(0) + 2.0 * (1..=radius).map(gauss).sum::<f64>();

    let side: Vec<u32> = (1..=radius)
        .map(|d| (gauss(d) / total * 65536.0).round() as u32)
        .collect();
    let center = 65536u32
        .checked_sub(2 * side.iter().sum::<u32>())
        .ok_or_else(|| CapstackError::render("gaussian side taps exceed unit weight"))?;

    Ok(side
        .iter()
        .rev()
        .copied()
        .chain(std::iter::once(center))
        .chain(side.iter().copied())
        .collect())
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// Convolve every row or every column of `src` into `dst`, clamping at the edges.
fn blur_axis(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let (w, h) = (width as usize, height as usize);
    // (lines, samples per line, byte offset of a line, byte stride along a line)
    let (lines, len, line_step, stride) = match axis {
        Axis::Rows => (h, w, w * 4, 4),
        Axis::Columns => (w, h, 4, w * 4),
    };
    let radius = k.len() / 2;

    for line in 0..lines {
        let base = line * line_step;
        for i in 0..len {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let at = base + (i + ki).saturating_sub(radius).min(len - 1) * stride;
                for (a, &v) in acc.iter_mut().zip(&src[at..at + 4]) {
                    *a += u64::from(kw) * u64::from(v);
                }
            }
            let out = base + i * stride;
            for (d, a) in dst[out..out + 4].iter_mut().zip(acc) {
                *d = ((a + 32768) >> 16).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;
