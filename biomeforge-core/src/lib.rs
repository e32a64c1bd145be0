//! BiomeForge Core - Unique Layered Biome Generation
//!
//! # Batch Guarantees
//! 1. Every draw resolves through the range tables or is redrawn
//! 2. No accepted biome pairs a background with a forbidden foreground
//! 3. Fingerprints are stable across runs and platforms
//! 4. A finished batch holds slots 1..=N with no duplicate fingerprint
//! 5. Duplicates are settled in favour of the lowest slot

pub mod tables;
pub mod conflicts;
pub mod resolver;
pub mod hashing;
pub mod ledger;
pub mod random;
pub mod compositor;
pub mod store;
pub mod manifest;
pub mod validation;
pub mod pipeline;

pub use tables::{AssetId, AttributeTables, Category, DrawDomain, RangeEntry, RangeTable, Slot};
pub use conflicts::ConflictRuleset;
pub use resolver::{AttributeResolver, AttributeSet, Draws, Rejection};
pub use hashing::{canonical_json, compute_manifest_hash, fingerprint, Fingerprint};
pub use ledger::{BatchLedger, DuplicateGroup};
pub use random::{HttpRandomSource, RandomSource, RandomSourceError, SeededRandomSource};
pub use compositor::{Compositor, CompositeError, LayeredCompositor};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, StoreError};
pub use manifest::{BiomeManifest, ManifestError};
pub use validation::{TableValidator, ValidationReport, ValidationViolation, ViolationSeverity};
pub use pipeline::{BatchReport, BiomePipeline, PipelineError, PipelineOptions, RetryPolicy};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_ENGINE_VERSION: &str = "1.0.0";
