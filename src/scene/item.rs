use std::{collections::HashSet, sync::Arc};

use crate::{
    assets::{decode::DecodedImage, loader::ImageRef},
    foundation::error::{CapResult, CapstackError},
};

/// One caller-supplied entry of the stack.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceItem {
    /// Position in the stack; must be unique within one render.
    pub order: u32,
    /// Handle resolved by an [`crate::ImageResolver`].
    pub image_ref: ImageRef,
    /// First caption line (may be empty).
    #[serde(default)]
    pub caption_primary: String,
    /// Second caption line (may be empty).
    #[serde(default)]
    pub caption_secondary: String,
}

impl SourceItem {
    /// Item with both captions empty.
    pub fn new(order: u32, image_ref: impl Into<ImageRef>) -> Self {
        Self {
            order,
            image_ref: image_ref.into(),
            caption_primary: String::new(),
            caption_secondary: String::new(),
        }
    }

    /// Replace both captions.
    pub fn with_captions(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.caption_primary = primary.into();
        self.caption_secondary = secondary.into();
        self
    }
}

/// Decoded form of a [`SourceItem`]: the planner's and compositor's input element.
#[derive(Clone, Debug)]
pub struct CaptionedImage {
    /// Shared decoded pixels.
    pub image: Arc<DecodedImage>,
    /// First caption line (may be empty).
    pub caption_primary: String,
    /// Second caption line (may be empty).
    pub caption_secondary: String,
}

impl CaptionedImage {
    /// Pair an image with its captions.
    pub fn new(
        image: Arc<DecodedImage>,
        primary: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        Self {
            image,
            caption_primary: primary.into(),
            caption_secondary: secondary.into(),
        }
    }

    /// Whether either caption slot carries text.
    pub fn has_captions(&self) -> bool {
        !self.caption_primary.is_empty() || !self.caption_secondary.is_empty()
    }
}

/// Sort items by `order`, rejecting duplicate order values.
pub fn order_items(items: &[SourceItem]) -> CapResult<Vec<&SourceItem>> {
    let mut seen = HashSet::with_capacity(items.len());
    for it in items {
        if !seen.insert(it.order) {
            return Err(CapstackError::validation(format!(
                "duplicate item order {}",
                it.order
            )));
        }
    }
    let mut ordered: Vec<&SourceItem> = items.iter().collect();
    ordered.sort_by_key(|it| it.order);
    Ok(ordered)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/item.rs"]
mod tests;
