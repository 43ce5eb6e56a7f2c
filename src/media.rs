use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One folder of photos. `photos` is newest-first; `cover` is the newest.
pub struct Album {
    pub name: String,
    pub dir: PathBuf,
    pub photos: Vec<PathBuf>,
}

impl Album {
    pub fn cover(&self) -> Option<&PathBuf> {
        self.photos.first()
    }
}

/// Recursively collect image files under `root`, sorted by path.
pub fn scan_library(root: PathBuf) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut stack = vec![root];
    while let Some(dir) = stack.pop() {
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if is_image_file(&path) {
                    paths.push(path);
                }
            }
        }
    }
    paths.sort();
    paths
}

pub fn is_image_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff" | "tif"
        ),
        None => false,
    }
}

/// Group scanned photos into albums by containing directory. Photos inside
/// each album are ordered newest-first by modification time; albums are
/// ordered by name with the library root first.
pub fn build_albums(root: &Path, paths: &[PathBuf]) -> Vec<Album> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        let dir = path.parent().unwrap_or(root).to_path_buf();
        groups.entry(dir).or_default().push(path.clone());
    }

    let mut albums: Vec<Album> = groups
        .into_iter()
        .map(|(dir, mut photos)| {
            photos.sort_by_key(|p| std::cmp::Reverse(mtime_of(p)));
            let name = album_name(root, &dir);
            Album { name, dir, photos }
        })
        .collect();

    albums.sort_by(|a, b| {
        (a.dir != root)
            .cmp(&(b.dir != root))
            .then_with(|| a.name.cmp(&b.name))
    });
    albums
}

fn album_name(root: &Path, dir: &Path) -> String {
    if dir == root {
        return "Library".to_string();
    }
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

fn mtime_of(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image_file(Path::new("a/b/photo.JPG")));
        assert!(is_image_file(Path::new("shot.webp")));
        assert!(!is_image_file(Path::new("clip.mp4")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn scan_finds_nested_images() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("trip/day2")).unwrap();
        std::fs::write(root.join("top.jpg"), b"x").unwrap();
        std::fs::write(root.join("trip/a.png"), b"x").unwrap();
        std::fs::write(root.join("trip/day2/b.jpg"), b"x").unwrap();
        std::fs::write(root.join("trip/readme.txt"), b"x").unwrap();

        let paths = scan_library(root.to_path_buf());
        assert_eq!(paths.len(), 3);
        assert!(paths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn albums_group_by_directory_with_root_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("zoo")).unwrap();
        std::fs::create_dir_all(root.join("alps")).unwrap();
        std::fs::write(root.join("loose.jpg"), b"x").unwrap();
        std::fs::write(root.join("zoo/z1.jpg"), b"x").unwrap();
        std::fs::write(root.join("zoo/z2.jpg"), b"x").unwrap();
        std::fs::write(root.join("alps/a1.jpg"), b"x").unwrap();

        let paths = scan_library(root.to_path_buf());
        let albums = build_albums(root, &paths);

        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Library", "alps", "zoo"]);
        assert_eq!(albums[2].photos.len(), 2);
        assert!(albums[2].cover().is_some());
    }

    #[test]
    fn empty_scan_builds_no_albums() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scan_library(dir.path().to_path_buf());
        assert!(paths.is_empty());
        assert!(build_albums(dir.path(), &paths).is_empty());
    }
}
