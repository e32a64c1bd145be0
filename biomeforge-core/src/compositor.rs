//! Layer Compositor
//!
//! Stacks background, foreground and object rasters with a normal
//! (alpha-over) blend at full opacity. Order matters: each layer is drawn
//! over everything before it.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::manifest::BiomeManifest;
use crate::resolver::AttributeSet;
use crate::tables::Category;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Failed to open {category} layer {path}: {source}")]
    Open {
        category: Category,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{category} layer is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        category: Category,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("No layers to composite")]
    NoLayers,
}

pub trait Compositor {
    fn render(&self, attributes: &AttributeSet) -> Result<RgbaImage, CompositeError>;
}

/// Per-category asset directories, relative to the asset root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDirectories {
    #[serde(default = "default_background_dir")]
    pub background: String,
    #[serde(default = "default_foreground_dir")]
    pub foreground: String,
    #[serde(default = "default_object_dir")]
    pub object: String,
}

fn default_background_dir() -> String { "Environment background".to_string() }
fn default_foreground_dir() -> String { "Environment foreground".to_string() }
fn default_object_dir() -> String { "Objects".to_string() }

impl LayerDirectories {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Background => &self.background,
            Category::Foreground => &self.foreground,
            Category::Object => &self.object,
        }
    }
}

impl Default for LayerDirectories {
    fn default() -> Self {
        Self {
            background: default_background_dir(),
            foreground: default_foreground_dir(),
            object: default_object_dir(),
        }
    }
}

/// Composite layers bottom to top. All layers must share the first layer's
/// dimensions.
pub fn composite_layers(layers: Vec<(Category, RgbaImage)>) -> Result<RgbaImage, CompositeError> {
    let mut layers = layers.into_iter();
    let (_, mut canvas) = layers.next().ok_or(CompositeError::NoLayers)?;
    let expected = canvas.dimensions();

    for (category, layer) in layers {
        if layer.dimensions() != expected {
            return Err(CompositeError::DimensionMismatch {
                category,
                expected,
                actual: layer.dimensions(),
            });
        }
        imageops::overlay(&mut canvas, &layer, 0, 0);
    }

    Ok(canvas)
}

/// Loads layer files from disk and composites them.
#[derive(Debug, Clone)]
pub struct LayeredCompositor {
    asset_root: PathBuf,
    directories: LayerDirectories,
}

impl LayeredCompositor {
    pub fn new(asset_root: impl AsRef<Path>, directories: LayerDirectories) -> Self {
        Self {
            asset_root: asset_root.as_ref().to_path_buf(),
            directories,
        }
    }

    pub fn from_manifest(manifest: &BiomeManifest) -> Self {
        Self::new(&manifest.asset_root, manifest.directories.clone())
    }

    pub fn layer_path(&self, category: Category, asset: &str) -> PathBuf {
        self.asset_root.join(self.directories.get(category)).join(asset)
    }

    fn load(&self, category: Category, asset: &str) -> Result<RgbaImage, CompositeError> {
        let path = self.layer_path(category, asset);
        let layer = image::open(&path)
            .map_err(|source| CompositeError::Open { category, path, source })?;
        Ok(layer.to_rgba8())
    }
}

impl Compositor for LayeredCompositor {
    fn render(&self, attributes: &AttributeSet) -> Result<RgbaImage, CompositeError> {
        let layers = Category::ALL
            .iter()
            .map(|&category| {
                self.load(category, attributes.get(category))
                    .map(|layer| (category, layer))
            })
            .collect::<Result<Vec<_>, CompositeError>>()?;
        composite_layers(layers)
    }
}
