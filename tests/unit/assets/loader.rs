use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct CountingResolver {
    inner: MemoryResolver,
    calls: AtomicUsize,
}

impl ImageResolver for CountingResolver {
    fn resolve<'a>(&'a self, image_ref: &ImageRef) -> anyhow::Result<Cow<'a, [u8]>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(image_ref)
    }
}

fn pool() -> rayon::ThreadPool {
    build_thread_pool(Some(2)).unwrap()
}

#[test]
fn memory_resolver_hands_out_distinct_handles() {
    let mut mem = MemoryResolver::new();
    let a = mem.insert(vec![1, 2, 3]);
    let b = mem.insert(vec![4]);
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("mem:"));
    assert_eq!(mem.resolve(&a).unwrap().as_ref(), &[1, 2, 3]);
    assert!(mem.revoke(&a));
    assert!(mem.resolve(&a).is_err());
    assert_eq!(mem.len(), 1);
}

#[test]
fn shared_ref_decodes_once_and_shares_arc() {
    let mut mem = MemoryResolver::new();
    let a = mem.insert(png_bytes(4, 2, [255, 0, 0, 255]));
    let resolver = CountingResolver {
        inner: mem,
        calls: AtomicUsize::new(0),
    };

    let mut loader = ImageLoader::new();
    let images = loader.load_all(&resolver, &[&a, &a, &a], &pool()).unwrap();
    assert_eq!(images.len(), 3);
    assert!(Arc::ptr_eq(&images[0], &images[1]));
    assert!(Arc::ptr_eq(&images[1], &images[2]));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!((images[0].width, images[0].height), (4, 2));

    // Second pass is served from cache.
    let again = loader.load_all(&resolver, &[&a], &pool()).unwrap();
    assert!(Arc::ptr_eq(&again[0], &images[0]));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn first_failure_in_item_order_is_reported() {
    let mut mem = MemoryResolver::new();
    let good = mem.insert(png_bytes(1, 1, [0, 0, 0, 255]));
    let bad_a = mem.insert(b"not an image".to_vec());
    let missing = ImageRef::new("mem:999");

    let mut loader = ImageLoader::new();
    let err = loader
        .load_all(&mem, &[&good, &bad_a, &missing], &pool())
        .unwrap_err();
    assert!(matches!(err, CapstackError::ImageDecode(_)));
    assert!(err.to_string().contains(bad_a.as_str()));

    // Successful decodes stay cached; failing ones do not.
    assert_eq!(loader.len(), 1);
}

#[test]
fn retain_refs_prunes_unused_entries() {
    let mut mem = MemoryResolver::new();
    let a = mem.insert(png_bytes(1, 1, [0, 0, 0, 255]));
    let b = mem.insert(png_bytes(2, 1, [0, 0, 0, 255]));

    let mut loader = ImageLoader::new();
    loader.load_all(&mem, &[&a, &b], &pool()).unwrap();
    assert_eq!(loader.len(), 2);
    loader.retain_refs(&[&b]);
    assert_eq!(loader.len(), 1);
    loader.clear();
    assert!(loader.is_empty());
}

#[test]
fn fs_resolver_joins_relative_paths() {
    let dir = std::path::PathBuf::from("target").join("loader_fs_resolver");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("one.png"), png_bytes(3, 3, [1, 2, 3, 255])).unwrap();

    let resolver = FsResolver::new(&dir);
    let mut loader = ImageLoader::new();
    let images = loader
        .load_all(&resolver, &[&ImageRef::new("one.png")], &pool())
        .unwrap();
    assert_eq!(images[0].width, 3);

    let err = loader
        .load_all(&resolver, &[&ImageRef::new("nope.png")], &pool())
        .unwrap_err();
    assert!(err.to_string().contains("nope.png"));
}

#[test]
fn zero_threads_is_rejected() {
    assert!(matches!(
        build_thread_pool(Some(0)),
        Err(CapstackError::Validation(_))
    ));
}
