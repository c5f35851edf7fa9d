use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use rayon::prelude::*;

use crate::{
    assets::decode::{DecodedImage, decode_image},
    foundation::error::{CapResult, CapstackError},
};

/// Opaque handle to source image bytes (a path, a `mem:N` blob handle, ...).
///
/// Only an [`ImageResolver`] interprets the string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a raw handle.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Access the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns an [`ImageRef`] into encoded image bytes.
///
/// This is the seam to whatever owns the blobs (filesystem, upload store, network cache).
pub trait ImageResolver: Send + Sync {
    /// Return the encoded bytes behind `image_ref`.
    fn resolve<'a>(&'a self, image_ref: &ImageRef) -> anyhow::Result<Cow<'a, [u8]>>;
}

/// Resolves handles as filesystem paths; relative paths are joined onto `root`.
#[derive(Clone, Debug)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    /// Resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root used for relative handles.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageResolver for FsResolver {
    fn resolve<'a>(&'a self, image_ref: &ImageRef) -> anyhow::Result<Cow<'a, [u8]>> {
        let raw = Path::new(image_ref.as_str());
        let path = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.root.join(raw)
        };
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))?;
        Ok(Cow::Owned(bytes))
    }
}

/// In-memory blob store handing out `mem:N` handles, the analogue of browser blob URLs.
#[derive(Clone, Debug, Default)]
pub struct MemoryResolver {
    blobs: HashMap<ImageRef, Arc<Vec<u8>>>,
    next_id: u64,
}

impl MemoryResolver {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and return a fresh handle for them.
    pub fn insert(&mut self, bytes: impl Into<Vec<u8>>) -> ImageRef {
        let image_ref = ImageRef::new(format!("mem:{}", self.next_id));
        self.next_id += 1;
        self.blobs.insert(image_ref.clone(), Arc::new(bytes.into()));
        image_ref
    }

    /// Drop the bytes behind `image_ref`. Returns whether the handle was known.
    pub fn revoke(&mut self, image_ref: &ImageRef) -> bool {
        self.blobs.remove(image_ref).is_some()
    }

    /// Number of live blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ImageResolver for MemoryResolver {
    fn resolve<'a>(&'a self, image_ref: &ImageRef) -> anyhow::Result<Cow<'a, [u8]>> {
        self.blobs
            .get(image_ref)
            .map(|b| Cow::Borrowed(b.as_slice()))
            .ok_or_else(|| anyhow::anyhow!("unknown blob handle '{image_ref}'"))
    }
}

/// Decoded-image cache keyed by [`ImageRef`].
///
/// Items that share a handle share one `Arc<DecodedImage>`. Cache misses are decoded in parallel.
#[derive(Debug, Default)]
pub struct ImageLoader {
    cache: HashMap<ImageRef, Arc<DecodedImage>>,
}

impl ImageLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached decoded images.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached image.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Drop cached images whose handle is not in `keep`.
    pub fn retain_refs(&mut self, keep: &[&ImageRef]) {
        let keep: HashSet<&ImageRef> = keep.iter().copied().collect();
        self.cache.retain(|k, _| keep.contains(k));
    }

    /// Resolve and decode `refs`, returning one image per input position.
    ///
    /// Unique uncached handles are decoded on `pool`. The first failure in input order is returned
    /// as [`CapstackError::ImageDecode`] and nothing is inserted for the failing handle.
    #[tracing::instrument(skip_all, fields(refs = refs.len()))]
    pub fn load_all(
        &mut self,
        resolver: &dyn ImageResolver,
        refs: &[&ImageRef],
        pool: &rayon::ThreadPool,
    ) -> CapResult<Vec<Arc<DecodedImage>>> {
        let mut seen = HashSet::<&ImageRef>::new();
        let missing: Vec<&ImageRef> = refs
            .iter()
            .copied()
            .filter(|r| !self.cache.contains_key(*r) && seen.insert(*r))
            .collect();
        tracing::debug!(
            cached = refs.len() - missing.len(),
            decoding = missing.len(),
            "loading images"
        );

        let decoded: Vec<(&ImageRef, CapResult<DecodedImage>)> = pool.install(|| {
            missing
                .par_iter()
                .map(|r| (*r, load_one(resolver, r)))
                .collect()
        });

        let mut failures = HashMap::<&ImageRef, CapstackError>::new();
        for (r, res) in decoded {
            match res {
                Ok(img) => {
                    self.cache.insert(r.clone(), Arc::new(img));
                }
                Err(e) => {
                    failures.insert(r, e);
                }
            }
        }
        // Report the failure that comes first in item order, not in decode-completion order.
        if let Some(err) = refs.iter().find_map(|r| failures.remove(*r)) {
            tracing::warn!(error = %err, "image decode failed");
            return Err(err);
        }

        refs.iter()
            .map(|r| {
                self.cache.get(*r).cloned().ok_or_else(|| {
                    CapstackError::image_decode(anyhow::anyhow!("image '{r}' missing after load"))
                })
            })
            .collect()
    }
}

fn load_one(resolver: &dyn ImageResolver, image_ref: &ImageRef) -> CapResult<DecodedImage> {
    let bytes = resolver
        .resolve(image_ref)
        .with_context(|| format!("resolve image '{image_ref}'"))
        .map_err(CapstackError::image_decode)?;
    decode_image(&bytes).map_err(|e| match e {
        CapstackError::ImageDecode(cause) => {
            CapstackError::ImageDecode(cause.context(format!("decode image '{image_ref}'")))
        }
        other => other,
    })
}

/// Build the rayon pool used for parallel decoding.
pub(crate) fn build_thread_pool(threads: Option<usize>) -> CapResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CapstackError::validation(
            "'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CapstackError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
