//! Range Tables - Draw-to-Asset Resolution

use serde::{Deserialize, Serialize};
use std::fmt;

pub type AssetId = String;

/// Ordinal output position in a batch, 1-based.
pub type Slot = u32;

/// Layer category. Declaration order is the compositing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Background,
    Foreground,
    Object,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Background, Category::Foreground, Category::Object];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Background => "background",
            Category::Foreground => "foreground",
            Category::Object => "object",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive draw range mapped to one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub low: u32,
    pub high: u32,
    pub asset: AssetId,
}

impl RangeEntry {
    pub fn new(low: u32, high: u32, asset: impl Into<AssetId>) -> Self {
        Self { low, high, asset: asset.into() }
    }

    pub fn contains(&self, draw: u32) -> bool {
        self.low <= draw && draw <= self.high
    }
}

/// Declared domain of a single draw, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawDomain {
    #[serde(default = "default_draw_min")]
    pub min: u32,
    #[serde(default = "default_draw_max")]
    pub max: u32,
}

fn default_draw_min() -> u32 { 1 }
fn default_draw_max() -> u32 { 65535 }

impl DrawDomain {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, draw: u32) -> bool {
        self.min <= draw && draw <= self.max
    }

    /// An inverted domain contains no draw at all.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for DrawDomain {
    fn default() -> Self {
        Self { min: default_draw_min(), max: default_draw_max() }
    }
}

/// Ordered range entries for one category.
///
/// Entries are scanned in listed order and the first match wins, so an
/// overlapping later entry is shadowed for the overlapping draws.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    entries: Vec<RangeEntry>,
}

impl RangeTable {
    pub fn new(entries: Vec<RangeEntry>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, draw: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.contains(draw))
            .map(|entry| entry.asset.as_str())
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_asset(&self, asset: &str) -> bool {
        self.entries.iter().any(|entry| entry.asset == asset)
    }
}

/// One range table per category, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeTables {
    #[serde(default)]
    pub background: RangeTable,
    #[serde(default)]
    pub foreground: RangeTable,
    #[serde(default)]
    pub object: RangeTable,
}

impl AttributeTables {
    pub fn new(background: RangeTable, foreground: RangeTable, object: RangeTable) -> Self {
        Self { background, foreground, object }
    }

    pub fn table(&self, category: Category) -> &RangeTable {
        match category {
            Category::Background => &self.background,
            Category::Foreground => &self.foreground,
            Category::Object => &self.object,
        }
    }

    pub fn resolve(&self, category: Category, draw: u32) -> Option<&str> {
        self.table(category).resolve(draw)
    }
}
