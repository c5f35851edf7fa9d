use std::sync::Arc;

use super::*;
use crate::{assets::decode::DecodedImage, layout::planner::plan};

fn item(w: u32, h: u32, primary: &str, secondary: &str) -> CaptionedImage {
    CaptionedImage::new(
        Arc::new(DecodedImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(Vec::new()),
        }),
        primary,
        secondary,
    )
}

fn compile(items: &[CaptionedImage]) -> Vec<DrawOp> {
    let p = plan(items).unwrap();
    compile_draw_ops(&p, items, &CaptionStyle::default()).unwrap()
}

fn roles(ops: &[DrawOp]) -> Vec<TextRole> {
    ops.iter().filter_map(DrawOp::as_text).map(|t| t.role).collect()
}

#[test]
fn empty_captions_yield_image_ops_only() {
    let items = [item(1000, 600, "", ""), item(500, 500, "", "")];
    let ops = compile(&items);
    assert_eq!(ops.len(), 2);
    assert!(ops.iter().all(|op| matches!(op, DrawOp::Image { .. })));
}

#[test]
fn primary_only_yields_glow_then_fill() {
    // 1000x1000 -> band 0 800 tall, caption band 120, canvas 920.
    let items = [item(1000, 1000, "", ""), item(640, 480, "测试", "")];
    let ops = compile(&items);
    assert_eq!(roles(&ops), vec![TextRole::PrimaryGlow, TextRole::PrimaryFill]);

    for t in ops.iter().filter_map(DrawOp::as_text) {
        assert_eq!(t.band, 1);
        assert_eq!(t.text, "测试");
        assert_eq!(t.baseline_y, 865.0);
        assert_eq!(t.center_x, 400.0);
    }
    let glow = ops[2].as_text().unwrap();
    let fill = ops[3].as_text().unwrap();
    assert_eq!(glow.style, CaptionStyle::default().primary_glow);
    assert_eq!(fill.style, CaptionStyle::default().primary_fill);
}

#[test]
fn both_captions_order_image_glow_fill_secondary() {
    let items = [item(800, 400, "hello", "你好")];
    let ops = compile(&items);
    assert_eq!(ops.len(), 4);
    assert!(matches!(ops[0], DrawOp::Image { band: 0, source: 0, clip: None, .. }));
    assert_eq!(
        roles(&ops),
        vec![TextRole::PrimaryGlow, TextRole::PrimaryFill, TextRole::Secondary]
    );
    // Band 0 bottom is 400.
    assert_eq!(ops[1].as_text().unwrap().baseline_y, 335.0);
    assert_eq!(ops[3].as_text().unwrap().baseline_y, 375.0);
}

#[test]
fn secondary_only_draws_one_text_op() {
    let items = [item(800, 400, "", "second")];
    let ops = compile(&items);
    assert_eq!(roles(&ops), vec![TextRole::Secondary]);
}

#[test]
fn ops_stay_grouped_by_band_in_order() {
    let items = [
        item(1000, 1000, "a", "b"),
        item(100, 300, "c", ""),
        item(300, 100, "", "d"),
    ];
    let ops = compile(&items);
    let bands: Vec<usize> = ops.iter().map(DrawOp::band).collect();
    assert_eq!(bands, vec![0, 0, 0, 0, 1, 1, 1, 2, 2]);

    let DrawOp::Image {
        transform, clip, ..
    } = &ops[4]
    else {
        panic!("expected image op first in band 1");
    };
    assert_eq!(*clip, Some(Rect::new(0.0, 800.0, 800.0, 920.0)));
    // 100x300 scaled by 8 -> 2400 tall, bottom aligned at 920.
    let mapped = *transform * kurbo::Point::new(0.0, 300.0);
    assert_eq!(mapped, kurbo::Point::new(0.0, 920.0));
}

#[test]
fn mismatched_items_are_rejected() {
    let items = [item(10, 10, "", ""), item(10, 10, "", "")];
    let p = plan(&items).unwrap();
    let err = compile_draw_ops(&p, &items[..1], &CaptionStyle::default()).unwrap_err();
    assert!(matches!(err, CapstackError::Validation(_)));
}

#[test]
fn text_roles_map_to_font_slots() {
    assert_eq!(TextRole::PrimaryGlow.font_slot(), FontSlot::Primary);
    assert_eq!(TextRole::PrimaryFill.font_slot(), FontSlot::Primary);
    assert_eq!(TextRole::Secondary.font_slot(), FontSlot::Secondary);
}
