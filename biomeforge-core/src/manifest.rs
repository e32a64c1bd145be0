//! Biome Manifest - Attribute Tables and Run Configuration
//!
//! One JSON document describes the asset layout, the per-category range
//! tables, the conflict ruleset and the random source.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compositor::LayerDirectories;
use crate::conflicts::ConflictRuleset;
use crate::random::RandomSourceConfig;
use crate::tables::{AttributeTables, DrawDomain};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Manifest {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomeManifest {
    #[serde(default = "default_manifest_version")]
    pub manifest_version: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    #[serde(default)]
    pub directories: LayerDirectories,
    #[serde(default)]
    pub draw_domain: DrawDomain,
    pub tables: AttributeTables,
    #[serde(default)]
    pub conflicts: ConflictRuleset,
    #[serde(default)]
    pub random_source: RandomSourceConfig,
}

fn default_manifest_version() -> String { "1.0.0".to_string() }
fn default_engine_min_version() -> String { crate::MIN_ENGINE_VERSION.to_string() }
fn default_asset_root() -> PathBuf { PathBuf::from(".") }

impl BiomeManifest {
    /// Load from disk. A relative asset root is taken relative to the
    /// manifest's own directory.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
        let mut manifest = Self::from_json(&content)?;

        if manifest.asset_root.is_relative() {
            if let Some(parent) = path.parent() {
                manifest.asset_root = parent.join(&manifest.asset_root);
            }
        }

        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(content)?;
        manifest.check_engine_version()?;
        Ok(manifest)
    }

    fn check_engine_version(&self) -> Result<(), ManifestError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| ManifestError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&self.engine_min_version)
            .map_err(|_| ManifestError::InvalidVersion(self.engine_min_version.clone()))?;

        if engine_ver < min_ver {
            return Err(ManifestError::EngineVersionMismatch(
                self.manifest_version.clone(),
                self.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Category;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"{
        "assetRoot": "assets",
        "tables": {
            "background": [{"low": 1, "high": 65535, "asset": "Great wave.png"}],
            "foreground": [{"low": 1, "high": 65535, "asset": "Treetops.png"}],
            "object": [{"low": 1, "high": 65535, "asset": "Frog.png"}]
        },
        "conflicts": {"Great wave.png": ["Lonely islands WIP cleaned.png"]}
    }"#;

    #[test]
    fn test_defaults_applied() {
        let manifest = BiomeManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.draw_domain, DrawDomain::new(1, 65535));
        assert_eq!(manifest.directories.get(Category::Object), "Objects");
        assert_eq!(manifest.random_source.timeout_secs, 30);
        assert!(manifest.conflicts.is_conflicting("Great wave.png", "Lonely islands WIP cleaned.png"));
    }

    #[test]
    fn test_load_resolves_asset_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("biomes.json");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = BiomeManifest::load(&path).unwrap();
        assert_eq!(manifest.asset_root, dir.path().join("assets"));
    }

    #[test]
    fn test_engine_version_gate() {
        let json = r#"{"engineMinVersion": "99.0.0", "tables": {}}"#;
        let err = BiomeManifest::from_json(json).unwrap_err();
        assert!(err.to_string().contains("requires engine"));
    }

    #[test]
    fn test_missing_tables_rejected() {
        assert!(matches!(BiomeManifest::from_json("{}"), Err(ManifestError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = BiomeManifest::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
