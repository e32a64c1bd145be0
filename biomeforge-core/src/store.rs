//! Artifact Store
//!
//! Each slot owns a raster and a metadata record, both keyed by the slot's
//! zero-padded 4-digit number: `0007.png` and `0007.json`.

use chrono::Local;
use image::{ImageFormat, RgbaImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resolver::AttributeSet;
use crate::tables::Slot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("No artifacts stored for slot {0}")]
    Missing(Slot),
}

pub trait ArtifactStore {
    fn save(&mut self, slot: Slot, image: &RgbaImage, attributes: &AttributeSet) -> Result<(), StoreError>;

    /// Remove both the raster and the metadata of a slot.
    fn delete(&mut self, slot: Slot) -> Result<(), StoreError>;

    fn stored_slots(&self) -> Result<Vec<Slot>, StoreError>;
}

pub fn slot_key(slot: Slot) -> String {
    format!("{:04}", slot)
}

/// Writes artifacts into one directory per run.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Use `dir` directly, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    /// Create a fresh timestamped run directory under `output_root`.
    pub fn create_run_dir(output_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = output_root.as_ref();
        fs::create_dir_all(root).map_err(|source| StoreError::Io { path: root.to_path_buf(), source })?;

        let stamp = Local::now().format("%Y-%m-%d--%H-%M-%S").to_string();
        let dir = root.join(stamp);
        fs::create_dir(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.png", slot_key(slot)))
    }

    pub fn metadata_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.json", slot_key(slot)))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save(&mut self, slot: Slot, image: &RgbaImage, attributes: &AttributeSet) -> Result<(), StoreError> {
        let image_path = self.image_path(slot);
        image
            .save_with_format(&image_path, ImageFormat::Png)
            .map_err(|source| StoreError::Encode { path: image_path, source })?;

        let metadata_path = self.metadata_path(slot);
        let json = serde_json::to_string_pretty(attributes)?;
        fs::write(&metadata_path, json)
            .map_err(|source| StoreError::Io { path: metadata_path, source })?;
        Ok(())
    }

    fn delete(&mut self, slot: Slot) -> Result<(), StoreError> {
        let present: Vec<PathBuf> = [self.image_path(slot), self.metadata_path(slot)]
            .into_iter()
            .filter(|path| path.exists())
            .collect();
        if present.is_empty() {
            return Err(StoreError::Missing(slot));
        }
        for path in present {
            fs::remove_file(&path).map_err(|source| StoreError::Io { path, source })?;
        }
        Ok(())
    }

    fn stored_slots(&self) -> Result<Vec<Slot>, StoreError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;

        let mut slots = vec![];
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "png") {
                if let Some(slot) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()) {
                    slots.push(slot);
                }
            }
        }
        slots.sort_unstable();
        Ok(slots)
    }
}

/// Keeps artifacts in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    images: BTreeMap<Slot, RgbaImage>,
    metadata: BTreeMap<Slot, AttributeSet>,
    saves: usize,
    deletes: usize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, slot: Slot) -> Option<&RgbaImage> {
        self.images.get(&slot)
    }

    pub fn metadata(&self, slot: Slot) -> Option<&AttributeSet> {
        self.metadata.get(&slot)
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn delete_count(&self) -> usize {
        self.deletes
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&mut self, slot: Slot, image: &RgbaImage, attributes: &AttributeSet) -> Result<(), StoreError> {
        self.images.insert(slot, image.clone());
        self.metadata.insert(slot, attributes.clone());
        self.saves += 1;
        Ok(())
    }

    fn delete(&mut self, slot: Slot) -> Result<(), StoreError> {
        let image = self.images.remove(&slot);
        let metadata = self.metadata.remove(&slot);
        if image.is_none() && metadata.is_none() {
            return Err(StoreError::Missing(slot));
        }
        self.deletes += 1;
        Ok(())
    }

    fn stored_slots(&self) -> Result<Vec<Slot>, StoreError> {
        Ok(self.images.keys().copied().collect())
    }
}
