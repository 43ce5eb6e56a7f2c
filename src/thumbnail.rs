use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};

/// Decoded RGBA pixels ready for an `image::Handle`.
#[derive(Debug, Clone)]
pub struct Pixels {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Pixels {
    fn from_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            rgba: img.to_rgba8().into_raw(),
            width,
            height,
        }
    }
}

/// Generate a grid thumbnail, consulting the QOI disk cache first.
pub fn load_thumbnail(path: &Path, max_size: u32) -> Pixels {
    let key = cache_key(path, max_size);

    if let Some(cached) = key.as_deref().and_then(read_cache) {
        return cached;
    }

    let pixels = render_thumbnail(path, max_size);
    if let Some(key) = key {
        write_cache(&key, &pixels);
    }
    pixels
}

/// Thumbnail a batch of paths in parallel.
pub fn load_thumbnails_parallel(paths: &[PathBuf], max_size: u32) -> Vec<(PathBuf, Pixels)> {
    use rayon::prelude::*;
    paths
        .par_iter()
        .map(|p| (p.clone(), load_thumbnail(p, max_size)))
        .collect()
}

/// Full-size decode with EXIF orientation applied, for the viewer.
pub fn load_oriented(path: &Path) -> Option<Pixels> {
    let img = image::open(path).ok()?;
    let (orientation, _) = read_exif_info(path);
    Some(Pixels::from_image(apply_orientation(img, orientation)))
}

fn render_thumbnail(path: &Path, max_size: u32) -> Pixels {
    let (orientation, exif_thumb) = read_exif_info(path);

    // Embedded EXIF thumbnail is the cheapest source, but only when it is
    // large enough that the grid cell will not show upscaling blur. Header
    // peek avoids decoding small candidates at all.
    if let Some(data) = exif_thumb {
        let large_enough = {
            let mut d = jpeg_decoder::Decoder::new(Cursor::new(&data));
            d.read_info()
                .ok()
                .and_then(|()| d.info())
                .is_some_and(|i| (i.width as u32).min(i.height as u32) >= max_size)
        };
        if large_enough {
            if let Ok(img) = image::load_from_memory(&data) {
                let thumb = img.resize(max_size, max_size, FilterType::Triangle);
                return Pixels::from_image(apply_orientation(thumb, orientation));
            }
        }
    }

    // DCT-scaled JPEG decode skips most of the pixels of a large photo.
    if let Some(img) = decode_jpeg_scaled(path, max_size) {
        let thumb = img.resize(max_size, max_size, FilterType::Triangle);
        return Pixels::from_image(apply_orientation(thumb, orientation));
    }

    match image::open(path) {
        Ok(img) => {
            let thumb = img.resize(max_size, max_size, FilterType::Triangle);
            Pixels::from_image(apply_orientation(thumb, orientation))
        }
        Err(e) => {
            log::warn!("Failed to load image {}: {}", path.display(), e);
            placeholder(max_size)
        }
    }
}

/// Decode a JPEG at reduced resolution; the decoder picks the closest DCT
/// scale factor at or above the target. None for non-JPEGs, images that are
/// already small, or on any decode failure.
fn decode_jpeg_scaled(path: &Path, max_size: u32) -> Option<DynamicImage> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext != "jpg" && ext != "jpeg" {
        return None;
    }

    let file = std::fs::File::open(path).ok()?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));

    let max_u16 = max_size as u16;
    let (actual_w, actual_h) = decoder.scale(max_u16, max_u16).ok()?;

    let info = decoder.info()?;
    if actual_w == info.width && actual_h == info.height {
        return None;
    }

    let data = decoder.decode().ok()?;
    match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => {
            image::RgbImage::from_raw(actual_w as u32, actual_h as u32, data)
                .map(DynamicImage::ImageRgb8)
        }
        jpeg_decoder::PixelFormat::L8 => {
            image::GrayImage::from_raw(actual_w as u32, actual_h as u32, data)
                .map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

// --- Disk cache ---

fn cache_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|d| d.join(".photogrid").join("cache").join("thumbs"))
}

/// Cache key from canonical path + file size + mtime + target size, so an
/// edited or replaced photo never serves a stale thumbnail.
fn cache_key(path: &Path, max_size: u32) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_nanos();
    let canonical = std::fs::canonicalize(path).ok()?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(meta.len().to_le_bytes());
    hasher.update(mtime.to_le_bytes());
    hasher.update(max_size.to_le_bytes());
    let digest = hasher.finalize();
    Some(digest.iter().map(|b| format!("{b:02x}")).collect())
}

fn cache_path(key: &str) -> Option<PathBuf> {
    // Two-character fan-out keeps the cache directory listable
    Some(cache_dir()?.join(&key[..2]).join(format!("{}.qoi", key)))
}

fn read_cache(key: &str) -> Option<Pixels> {
    let data = std::fs::read(cache_path(key)?).ok()?;
    let (header, rgba) = qoi::decode_to_vec(&data).ok()?;
    Some(Pixels {
        rgba,
        width: header.width,
        height: header.height,
    })
}

fn write_cache(key: &str, pixels: &Pixels) {
    let Some(path) = cache_path(key) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(data) = qoi::encode_to_vec(&pixels.rgba, pixels.width, pixels.height) {
        let _ = std::fs::write(&path, data);
    }
}

// --- EXIF ---

/// Single file open + EXIF parse: orientation plus the embedded thumbnail
/// JPEG bytes, when present.
fn read_exif_info(path: &Path) -> (u32, Option<Vec<u8>>) {
    let Ok(file) = std::fs::File::open(path) else {
        return (1, None);
    };
    let mut reader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return (1, None);
    };

    let orientation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1);

    let thumbnail = (|| {
        let offset = exif
            .get_field(exif::Tag::JPEGInterchangeFormat, exif::In::THUMBNAIL)?
            .value
            .get_uint(0)? as u64;
        let length = exif
            .get_field(exif::Tag::JPEGInterchangeFormatLength, exif::In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        if length == 0 || length > 1_000_000 {
            return None;
        }
        reader.seek(SeekFrom::Start(offset)).ok()?;
        let mut data = vec![0u8; length];
        reader.read_exact(&mut data).ok()?;
        Some(data)
    })();

    (orientation, thumbnail)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img, // 1 = normal, or unknown
    }
}

fn placeholder(size: u32) -> Pixels {
    Pixels {
        rgba: vec![60u8; (size * size * 4) as usize],
        width: size,
        height: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 100, 50, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn thumbnails_fit_within_the_target_box() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, 800, 200);

        let thumb = load_thumbnail(&path, 100);
        assert!(thumb.width <= 100 && thumb.height <= 100);
        assert_eq!(thumb.rgba.len(), (thumb.width * thumb.height * 4) as usize);
    }

    #[test]
    fn unreadable_files_yield_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let thumb = load_thumbnail(&path, 64);
        assert_eq!((thumb.width, thumb.height), (64, 64));
    }

    #[test]
    fn parallel_batch_keeps_path_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, 50, 50);
        write_png(&b, 30, 60);

        let batch = load_thumbnails_parallel(&[a.clone(), b.clone()], 40);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().any(|(p, _)| p == &a));
        assert!(batch.iter().any(|(p, _)| p == &b));
    }

    #[test]
    fn load_oriented_decodes_full_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.png");
        write_png(&path, 120, 80);

        let pixels = load_oriented(&path).unwrap();
        assert_eq!((pixels.width, pixels.height), (120, 80));
    }
}
