use super::*;

#[test]
fn order_items_sorts_by_order_not_position() {
    let items = vec![
        SourceItem::new(2, "c.png"),
        SourceItem::new(0, "a.png"),
        SourceItem::new(1, "b.png"),
    ];
    let ordered = order_items(&items).unwrap();
    let refs: Vec<&str> = ordered.iter().map(|it| it.image_ref.as_str()).collect();
    assert_eq!(refs, ["a.png", "b.png", "c.png"]);
}

#[test]
fn duplicate_order_is_rejected() {
    let items = vec![SourceItem::new(3, "a.png"), SourceItem::new(3, "b.png")];
    let err = order_items(&items).unwrap_err();
    assert!(matches!(err, CapstackError::Validation(_)));
    assert!(err.to_string().contains("duplicate item order 3"));
}

#[test]
fn manifest_item_captions_default_to_empty() {
    let it: SourceItem = serde_json::from_str(r#"{ "order": 0, "image_ref": "a.png" }"#).unwrap();
    assert_eq!(it, SourceItem::new(0, "a.png"));

    let it = it.with_captions("测试", "test");
    assert_eq!(it.caption_primary, "测试");
    assert_eq!(it.caption_secondary, "test");
}
