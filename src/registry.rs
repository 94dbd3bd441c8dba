use anyhow::{anyhow, Result};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Fallback dimensions for entries whose pixels never decoded, so layout
/// math never sees a zero-sized image.
pub const FALLBACK_SIZE: (u32, u32) = (1, 1);

/// Position-stable identity of a source image. Survives reordering; a key
/// is never reused after its entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey(Uuid);

impl ImageKey {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone)]
enum ImageSource {
    Bytes(Arc<[u8]>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum LoadState {
    Pending,
    Loaded { pixels: Arc<RgbaImage> },
    Failed,
}

#[derive(Debug, Clone)]
pub struct SourceImage {
    key: ImageKey,
    label: String,
    source: ImageSource,
    state: LoadState,
}

impl SourceImage {
    pub fn key(&self) -> ImageKey {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LoadState::Pending)
    }

    pub fn load_failed(&self) -> bool {
        matches!(self.state, LoadState::Failed)
    }

    /// Decoded pixels, if the entry loaded successfully.
    pub fn pixels(&self) -> Option<&Arc<RgbaImage>> {
        match &self.state {
            LoadState::Loaded { pixels } => Some(pixels),
            _ => None,
        }
    }

    /// Natural dimensions. Entries that are still pending or failed to
    /// decode report the 1x1 fallback rather than nothing, so a plan can
    /// always be produced.
    pub fn natural_size(&self) -> (u32, u32) {
        match &self.state {
            LoadState::Loaded { pixels } => pixels.dimensions(),
            LoadState::Pending | LoadState::Failed => FALLBACK_SIZE,
        }
    }
}

/// Ordered collection of source images. Append-only growth, positional
/// removal, and move-style reordering; identity of untouched entries is
/// preserved across all three.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    entries: Vec<SourceImage>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SourceImage] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&SourceImage> {
        self.entries.get(position)
    }

    pub fn by_key(&self, key: ImageKey) -> Option<&SourceImage> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Appends an in-memory image. The entry stays pending until the next
    /// call to [`SourceRegistry::resolve_pending`].
    pub fn add_bytes(&mut self, label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ImageKey {
        let key = ImageKey::new();
        self.entries.push(SourceImage {
            key,
            label: label.into(),
            source: ImageSource::Bytes(bytes.into()),
            state: LoadState::Pending,
        });
        key
    }

    /// Appends a file-backed image; the file is read and decoded lazily.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> ImageKey {
        let path = path.into();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let key = ImageKey::new();
        self.entries.push(SourceImage {
            key,
            label,
            source: ImageSource::File(path),
            state: LoadState::Pending,
        });
        key
    }

    /// Appends every regular file in `dir`, sorted by file name. Files the
    /// decoder rejects settle as failed entries later, like any other load.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<Vec<ImageKey>> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|err| anyhow!("Failed to read image directory {}: {err}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        Ok(paths.into_iter().map(|path| self.add_file(path)).collect())
    }

    /// Removes the entry at `position`; later entries shift down by one.
    /// Dropping the entry releases its decoded-pixel handle.
    pub fn remove(&mut self, position: usize) -> Option<ImageKey> {
        if position >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(position);
        Some(entry.key)
    }

    /// Moves the entry at `from` to `to`, shifting intervening entries.
    /// No-op (returns false) when the indices match or either is out of
    /// bounds.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.entries.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    /// Resolves every pending load. This is the cooperative suspension
    /// point for image loads: a decode failure settles the entry as
    /// failed (1x1) instead of leaving it pending forever. Returns how
    /// many entries settled.
    pub fn resolve_pending(&mut self) -> usize {
        let mut settled = 0;
        for entry in &mut self.entries {
            if !matches!(entry.state, LoadState::Pending) {
                continue;
            }
            entry.state = match decode_source(&entry.source) {
                Ok(pixels) => LoadState::Loaded { pixels: Arc::new(pixels) },
                Err(err) => {
                    eprintln!(
                        "[registry] failed to load '{}': {err}. Using {}x{} placeholder.",
                        entry.label, FALLBACK_SIZE.0, FALLBACK_SIZE.1
                    );
                    LoadState::Failed
                }
            };
            settled += 1;
        }
        settled
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_pending()).count()
    }
}

fn decode_source(source: &ImageSource) -> Result<RgbaImage> {
    let bytes: Arc<[u8]> = match source {
        ImageSource::Bytes(bytes) => Arc::clone(bytes),
        ImageSource::File(path) => fs::read(path)
            .map_err(|err| anyhow!("Failed to read {}: {err}", path.display()))?
            .into(),
    };
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).expect("encode png");
        bytes
    }

    #[test]
    fn add_appends_and_resolve_populates_dimensions() {
        let mut registry = SourceRegistry::new();
        registry.add_bytes("a.png", png_bytes(4, 2));
        registry.add_bytes("b.png", png_bytes(8, 8));
        assert_eq!(registry.pending_count(), 2);
        assert_eq!(registry.resolve_pending(), 2);
        assert_eq!(registry.get(0).expect("entry 0").natural_size(), (4, 2));
        assert_eq!(registry.get(1).expect("entry 1").natural_size(), (8, 8));
        assert_eq!(registry.resolve_pending(), 0, "settled entries should not re-resolve");
    }

    #[test]
    fn failed_decode_settles_as_one_by_one() {
        let mut registry = SourceRegistry::new();
        registry.add_bytes("garbage.bin", vec![0u8, 1, 2, 3]);
        registry.resolve_pending();
        let entry = registry.get(0).expect("entry");
        assert!(entry.load_failed());
        assert!(entry.pixels().is_none());
        assert_eq!(entry.natural_size(), FALLBACK_SIZE);
    }

    #[test]
    fn remove_shifts_and_preserves_identity() {
        let mut registry = SourceRegistry::new();
        let a = registry.add_bytes("a", png_bytes(1, 1));
        let b = registry.add_bytes("b", png_bytes(1, 1));
        let c = registry.add_bytes("c", png_bytes(1, 1));
        assert_eq!(registry.remove(1), Some(b));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).expect("first").key(), a);
        assert_eq!(registry.get(1).expect("second").key(), c);
        assert!(registry.by_key(b).is_none(), "removed keys no longer resolve");
        assert_eq!(registry.remove(5), None);
    }

    #[test]
    fn reorder_moves_entry_and_rejects_bad_indices() {
        let mut registry = SourceRegistry::new();
        let a = registry.add_bytes("a", png_bytes(1, 1));
        let b = registry.add_bytes("b", png_bytes(1, 1));
        let c = registry.add_bytes("c", png_bytes(1, 1));
        assert!(registry.reorder(0, 2));
        let order: Vec<ImageKey> = registry.entries().iter().map(|entry| entry.key()).collect();
        assert_eq!(order, vec![b, c, a]);
        assert_eq!(
            registry.by_key(a).expect("moved entry resolves by key").label(),
            "a",
            "identity survives the move"
        );
        assert!(!registry.reorder(1, 1), "same-index reorder is a no-op");
        assert!(!registry.reorder(0, 3), "out-of-bounds target is a no-op");
        assert!(!registry.reorder(7, 0), "out-of-bounds source is a no-op");
    }
}
