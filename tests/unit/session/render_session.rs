use std::io::Cursor;

use super::*;
use crate::assets::loader::MemoryResolver;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn session() -> RenderSession<MemoryResolver> {
    RenderSession::new(
        MemoryResolver::new(),
        RenderSessionOpts::default().with_threads(Some(2)),
    )
    .unwrap()
}

#[test]
fn empty_input_fails_without_a_surface() {
    let mut s = session();
    assert!(matches!(s.render(&[]), Err(CapstackError::EmptyInput)));
    assert!(s.surface().is_none());
}

#[test]
fn zero_threads_is_rejected() {
    let err = RenderSession::new(
        MemoryResolver::new(),
        RenderSessionOpts::default().with_threads(Some(0)),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CapstackError::Validation(_)));
}

#[test]
fn duplicate_orders_are_rejected_before_loading() {
    let mut s = session();
    // Handles are unknown: a decode error would surface if loading ran first.
    let items = [SourceItem::new(1, "mem:404"), SourceItem::new(1, "mem:405")];
    assert!(matches!(s.render(&items), Err(CapstackError::Validation(_))));
}

#[test]
fn items_are_stacked_by_order_not_slice_position() {
    let mut s = session();
    let tall = s.resolver_mut().insert(png_bytes(100, 100, [0, 255, 0, 255]));
    let wide = s.resolver_mut().insert(png_bytes(1000, 600, [255, 0, 0, 255]));

    let items = [SourceItem::new(5, wide.clone()), SourceItem::new(2, tall.clone())];
    let p = s.plan(&items).unwrap();
    // Order 2 (100x100) comes first: 800 + 120.
    assert_eq!((p.canvas_width, p.canvas_height), (800, 920));

    let surface = s.render(&items).unwrap();
    assert_eq!((surface.width, surface.height), (800, 920));
    let near = |px: Option<[u8; 4]>, want: [u8; 4]| {
        px.is_some_and(|px| px.iter().zip(want).all(|(&a, b)| a.abs_diff(b) <= 2))
    };
    assert!(near(surface.pixel(400, 400), [0, 255, 0, 255]));
    assert!(near(surface.pixel(400, 900), [255, 0, 0, 255]));
}

#[test]
fn decode_failure_aborts_and_releases_previous_surface() {
    let mut s = session();
    let good = s.resolver_mut().insert(png_bytes(8, 8, [0, 0, 255, 255]));
    let bad = s.resolver_mut().insert(b"not an image".to_vec());

    s.render(&[SourceItem::new(0, good.clone())]).unwrap();
    assert!(s.surface().is_some());

    let err = s
        .render(&[SourceItem::new(0, good), SourceItem::new(1, bad)])
        .unwrap_err();
    assert!(matches!(err, CapstackError::ImageDecode(_)));
    assert!(s.surface().is_none());
}

#[test]
fn cache_keeps_only_handles_of_the_latest_render() {
    let mut s = session();
    let a = s.resolver_mut().insert(png_bytes(4, 4, [1, 2, 3, 255]));
    let b = s.resolver_mut().insert(png_bytes(4, 4, [4, 5, 6, 255]));

    s.render(&[SourceItem::new(0, a.clone()), SourceItem::new(1, b.clone())])
        .unwrap();
    assert_eq!(s.cached_images(), 2);

    s.render(&[SourceItem::new(0, a.clone()), SourceItem::new(1, a.clone())])
        .unwrap();
    assert_eq!(s.cached_images(), 1);

    // Revoked blobs still render from the cache while referenced.
    assert!(s.resolver_mut().revoke(&a));
    s.render(&[SourceItem::new(0, a)]).unwrap();

    s.clear();
    assert_eq!(s.cached_images(), 0);
    assert!(s.surface().is_none());
}

#[test]
fn planning_prunes_the_cache_like_rendering() {
    let mut s = session();
    let handles: Vec<_> = (0..4u8)
        .map(|i| s.resolver_mut().insert(png_bytes(20, 10, [i, 0, 0, 255])))
        .collect();

    for h in &handles {
        s.plan(&[SourceItem::new(0, h.clone())]).unwrap();
        assert_eq!(s.cached_images(), 1);
    }
    s.plan(&[
        SourceItem::new(0, handles[0].clone()),
        SourceItem::new(1, handles[1].clone()),
    ])
    .unwrap();
    assert_eq!(s.cached_images(), 2);
    assert!(s.surface().is_none());
}

#[test]
fn render_png_exports_surface_dimensions() {
    let mut s = session();
    let a = s.resolver_mut().insert(png_bytes(1000, 600, [9, 9, 9, 255]));
    let out = s.render_png(&[SourceItem::new(0, a)]).unwrap();
    assert_eq!((out.width, out.height), (800, 480));
    let back = image::load_from_memory(&out.png).unwrap();
    assert_eq!((back.width(), back.height()), (800, 480));
}

#[test]
fn opts_deserialize_with_partial_fields() {
    let opts: RenderSessionOpts =
        serde_json::from_str(r#"{ "threads": 3, "export": { "quality": 1.0 } }"#).unwrap();
    assert_eq!(opts.threads, Some(3));
    assert_eq!(opts.export.quality, 1.0);
    assert_eq!(opts.style, CaptionStyle::default());
    assert_eq!(opts.fonts, FontConfig::default());
}
