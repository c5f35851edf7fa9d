use serde::{Deserialize, Serialize};

use crate::{
    assets::loader::{ImageLoader, ImageRef, ImageResolver, build_thread_pool},
    config::{CaptionStyle, FontConfig},
    export::png::{ExportOpts, ExportedImage, export_png},
    foundation::error::{CapResult, CapstackError},
    layout::planner::{LayoutPlan, plan},
    render::{compositor::Compositor, surface::RasterSurface},
    scene::item::{CaptionedImage, SourceItem, order_items},
};

/// Options for a [`RenderSession`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSessionOpts {
    /// Override the number of rayon decode threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Caption font files.
    pub fonts: FontConfig,
    /// Caption colors, sizes and shadows.
    pub style: CaptionStyle,
    /// PNG encoding options for [`RenderSession::render_png`].
    pub export: ExportOpts,
}

impl RenderSessionOpts {
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_fonts(mut self, fonts: FontConfig) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_export(mut self, export: ExportOpts) -> Self {
        self.export = export;
        self
    }
}

/// Loader, planner, compositor and exporter behind one entry point.
///
/// The session keeps decoded images for the handles used by the latest render and owns at most
/// one composited surface. Starting a render releases the previous surface first.
pub struct RenderSession<R: ImageResolver> {
    resolver: R,
    loader: ImageLoader,
    pool: rayon::ThreadPool,
    compositor: Compositor,
    export: ExportOpts,
    surface: Option<RasterSurface>,
}

impl<R: ImageResolver> RenderSession<R> {
    /// Construct a session; fails on invalid options.
    pub fn new(resolver: R, opts: RenderSessionOpts) -> CapResult<Self> {
        let pool = build_thread_pool(opts.threads)?;
        let compositor = Compositor::new(opts.style, opts.fonts)?;
        Ok(Self {
            resolver,
            loader: ImageLoader::new(),
            pool,
            compositor,
            export: opts.export,
            surface: None,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access for resolvers that accept new blobs between renders.
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Latest composited surface, if any.
    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    /// Number of decoded images currently cached.
    pub fn cached_images(&self) -> usize {
        self.loader.len()
    }

    /// Drop the current surface.
    pub fn release(&mut self) {
        self.surface = None;
    }

    /// Drop the current surface and every cached decoded image.
    pub fn clear(&mut self) {
        self.release();
        self.loader.clear();
    }

    /// Load `items` and compute their layout without compositing.
    ///
    /// Like [`RenderSession::render`], the cache afterwards holds only the handles in `items`.
    pub fn plan(&mut self, items: &[SourceItem]) -> CapResult<LayoutPlan> {
        let (refs, decoded) = self.load(items)?;
        let layout = plan(&decoded)?;
        self.retain(&refs);
        Ok(layout)
    }

    /// Composite `items` into the session's surface.
    ///
    /// Items are drawn in ascending `order`. The previous surface is released before any work, so a
    /// failed render leaves the session without a surface.
    #[tracing::instrument(skip_all, fields(items = items.len()))]
    pub fn render(&mut self, items: &[SourceItem]) -> CapResult<&RasterSurface> {
        self.release();

        let (refs, decoded) = self.load(items)?;
        let layout = plan(&decoded)?;
        let surface = self.compositor.render(&layout, &decoded)?;

        self.retain(&refs);
        tracing::debug!(
            width = surface.width,
            height = surface.height,
            cached = self.loader.len(),
            "render complete"
        );
        Ok(self.surface.insert(surface))
    }

    /// [`RenderSession::render`], then encode with the session's [`ExportOpts`].
    pub fn render_png(&mut self, items: &[SourceItem]) -> CapResult<ExportedImage> {
        let opts = self.export;
        let surface = self.render(items)?;
        export_png(surface, &opts)
    }

    fn retain(&mut self, refs: &[ImageRef]) {
        let keep: Vec<&ImageRef> = refs.iter().collect();
        self.loader.retain_refs(&keep);
    }

    fn load(&mut self, items: &[SourceItem]) -> CapResult<(Vec<ImageRef>, Vec<CaptionedImage>)> {
        if items.is_empty() {
            return Err(CapstackError::EmptyInput);
        }
        let ordered = order_items(items)?;
        let refs: Vec<&ImageRef> = ordered.iter().map(|it| &it.image_ref).collect();
        let images = self.loader.load_all(&self.resolver, &refs, &self.pool)?;

        let decoded = ordered
            .iter()
            .zip(images)
            .map(|(it, image)| {
                CaptionedImage::new(image, it.caption_primary.clone(), it.caption_secondary.clone())
            })
            .collect();
        Ok((refs.into_iter().cloned().collect(), decoded))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
