//! capstack stacks images into one tall picture with caption bands.
//!
//! The first image is shown in full. Every later image contributes only a fixed-height strip cut
//! from the bottom of its frame, and each strip can carry a two-line caption drawn with a
//! shadowed, glowing style.
//!
//! - Hand [`SourceItem`]s to a [`RenderSession`] backed by an [`ImageResolver`]
//! - Get back a premultiplied [`RasterSurface`] or an encoded [`ExportedImage`]
//!
//! The lower layers are public too: [`plan`] computes a [`LayoutPlan`], [`compile_draw_ops`]
//! lowers it to [`DrawOp`]s and a [`Compositor`] rasterizes them.
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub(crate) mod compile;
/// Caption styling and font configuration.
pub mod config;
pub(crate) mod export;
pub(crate) mod layout;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{Affine, Point, Rect, Rgba8, Vec2};
pub use crate::foundation::error::{CapResult, CapstackError};

pub use crate::assets::decode::{DecodedImage, decode_image};
pub use crate::assets::loader::{FsResolver, ImageLoader, ImageRef, ImageResolver, MemoryResolver};
pub use crate::compile::ops::{DrawOp, TextDraw, TextRole, compile_draw_ops};
pub use crate::config::{
    CAPTION_BLUE, CaptionStyle, FONT_ENV_VAR, FontConfig, FontWeight, Shadow, TextLayerStyle,
};
pub use crate::export::png::{ExportOpts, ExportedImage, export_png};
pub use crate::layout::planner::{
    Band, CANVAS_WIDTH, CAPTION_BAND_MAX, CAPTION_BAND_MIN, CaptionLayout, DrawRect, LayoutPlan,
    MAX_CANVAS_PIXELS, caption_band_height, plan,
};
pub use crate::render::compositor::Compositor;
pub use crate::render::surface::RasterSurface;
pub use crate::scene::item::{CaptionedImage, SourceItem, order_items};
pub use crate::session::render_session::{RenderSession, RenderSessionOpts};
