use super::*;

#[test]
fn radius_follows_half_blur_sigma() {
    assert_eq!(radius_for_blur(0.0), 0);
    assert_eq!(radius_for_blur(-2.0), 0);
    assert_eq!(radius_for_blur(f32::NAN), 0);
    // sigma 2 -> 3 sigma = 6.
    assert_eq!(radius_for_blur(4.0), 6);
    assert_eq!(radius_for_blur(1.0), 2);
}

#[test]
fn kernel_sums_to_one_in_q16() {
    for (radius, sigma) in [(1, 0.5), (6, 2.0), (12, 4.0)] {
        let k = kernel_q16(radius, sigma).unwrap();
        assert_eq!(k.len(), 2 * radius as usize + 1);
        assert_eq!(k.iter().map(|&w| u64::from(w)).sum::<u64>(), 65536);
        assert_eq!(k.first(), k.last());
    }
}

#[test]
fn zero_blur_is_identity() {
    let mut data: Vec<u8> = (0..4 * 3 * 4).map(|i| (i as u8).wrapping_mul(31)).collect();
    let before = data.clone();
    blur_shadow_in_place(&mut data, 4, 3, 0.0).unwrap();
    assert_eq!(data, before);
}

#[test]
fn constant_image_is_unchanged() {
    let mut data = [10u8, 20, 30, 40].repeat(25);
    let before = data.clone();
    blur_shadow_in_place(&mut data, 5, 5, 2.0).unwrap();
    assert_eq!(data, before);
}

#[test]
fn single_pixel_spreads_symmetrically() {
    let (w, h) = (9u32, 9u32);
    let mut data = vec![0u8; (w * h * 4) as usize];
    let center = ((4 * w + 4) * 4) as usize;
    data[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    blur_shadow_in_place(&mut data, w, h, 2.0).unwrap();

    let alpha = |x: u32, y: u32| data[((y * w + x) * 4 + 3) as usize];
    assert!(alpha(4, 4) < 255);
    assert!(alpha(4, 4) > alpha(5, 4));
    assert_eq!(alpha(3, 4), alpha(5, 4));
    assert_eq!(alpha(4, 3), alpha(4, 5));
    assert!(alpha(5, 4) > 0);
}

#[test]
fn mismatched_buffer_is_render_error() {
    let mut data = vec![0u8; 10];
    assert!(matches!(
        blur_shadow_in_place(&mut data, 2, 2, 4.0),
        Err(CapstackError::Render(_))
    ));
}

#[test]
fn rows_and_columns_blur_alike() {
    // A vertical line blurred must match the transposed horizontal line.
    let n = 7u32;
    let mut vertical = vec![0u8; (n * n * 4) as usize];
    let mut horizontal = vertical.clone();
    for i in 0..n {
        let v = ((i * n + 3) * 4) as usize;
        vertical[v..v + 4].copy_from_slice(&[200, 100, 50, 200]);
        let h = ((3 * n + i) * 4) as usize;
        horizontal[h..h + 4].copy_from_slice(&[200, 100, 50, 200]);
    }
    blur_shadow_in_place(&mut vertical, n, n, 3.0).unwrap();
    blur_shadow_in_place(&mut horizontal, n, n, 3.0).unwrap();
    for y in 0..n {
        for x in 0..n {
            let a = ((y * n + x) * 4) as usize;
            let b = ((x * n + y) * 4) as usize;
            assert_eq!(vertical[a..a + 4], horizontal[b..b + 4], "({x},{y})");
        }
    }
}
