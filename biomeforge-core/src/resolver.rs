//! Attribute Resolver
//!
//! Turns one draw triple into an attribute set, or a rejection. Resolution is
//! a pure function of the draws and the read-only tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::conflicts::ConflictRuleset;
use crate::manifest::BiomeManifest;
use crate::tables::{AssetId, AttributeTables, Category};

/// One random draw per category, consumed by a single resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draws {
    pub background: u32,
    pub foreground: u32,
    pub object: u32,
}

impl Draws {
    pub fn new(background: u32, foreground: u32, object: u32) -> Self {
        Self { background, foreground, object }
    }

    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Background => self.background,
            Category::Foreground => self.foreground,
            Category::Object => self.object,
        }
    }
}

impl fmt::Display for Draws {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.background, self.foreground, self.object)
    }
}

/// Accepted category -> asset mapping. No setters; build a new one instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSet {
    background: AssetId,
    foreground: AssetId,
    object: AssetId,
}

impl AttributeSet {
    pub fn new(
        background: impl Into<AssetId>,
        foreground: impl Into<AssetId>,
        object: impl Into<AssetId>,
    ) -> Self {
        Self {
            background: background.into(),
            foreground: foreground.into(),
            object: object.into(),
        }
    }

    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Background => &self.background,
            Category::Foreground => &self.foreground,
            Category::Object => &self.object,
        }
    }

    pub fn background(&self) -> &str { &self.background }
    pub fn foreground(&self) -> &str { &self.foreground }
    pub fn object(&self) -> &str { &self.object }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "background={} foreground={} object={}",
            self.background, self.foreground, self.object
        )
    }
}

/// Why a draw triple produced no attribute set. Never fatal; the caller redraws.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no {category} asset covers draw {draw}")]
    Unresolved { category: Category, draw: u32 },

    #[error("background {background} clashes with foreground {foreground}")]
    Conflict { background: AssetId, foreground: AssetId },
}

#[derive(Debug, Clone)]
pub struct AttributeResolver {
    tables: AttributeTables,
    conflicts: ConflictRuleset,
}

impl AttributeResolver {
    pub fn new(tables: AttributeTables, conflicts: ConflictRuleset) -> Self {
        Self { tables, conflicts }
    }

    pub fn from_manifest(manifest: &BiomeManifest) -> Self {
        Self::new(manifest.tables.clone(), manifest.conflicts.clone())
    }

    pub fn conflicts(&self) -> &ConflictRuleset {
        &self.conflicts
    }

    /// Resolve every category, then apply the conflict ruleset.
    ///
    /// A category with no covering range rejects the whole attempt rather
    /// than yielding a set with a missing layer.
    pub fn resolve(&self, draws: &Draws) -> Result<AttributeSet, Rejection> {
        let background = self.lookup(Category::Background, draws)?;
        let foreground = self.lookup(Category::Foreground, draws)?;
        let object = self.lookup(Category::Object, draws)?;

        if self.conflicts.is_conflicting(background, foreground) {
            return Err(Rejection::Conflict {
                background: background.to_string(),
                foreground: foreground.to_string(),
            });
        }

        Ok(AttributeSet::new(background, foreground, object))
    }

    fn lookup(&self, category: Category, draws: &Draws) -> Result<&str, Rejection> {
        let draw = draws.get(category);
        self.tables
            .resolve(category, draw)
            .ok_or(Rejection::Unresolved { category, draw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{RangeEntry, RangeTable};

    fn resolver() -> AttributeResolver {
        let tables = AttributeTables::new(
            RangeTable::new(vec![
                RangeEntry::new(1, 100, "Great wave.png"),
                RangeEntry::new(101, 200, "Pine forest.png"),
            ]),
            RangeTable::new(vec![
                RangeEntry::new(1, 100, "Cloud world.png"),
                RangeEntry::new(101, 200, "Pyramid stone.png"),
            ]),
            RangeTable::new(vec![RangeEntry::new(1, 200, "Frog.png")]),
        );
        let conflicts = ConflictRuleset::new().with_rule("Pine forest.png", ["Cloud world.png"]);
        AttributeResolver::new(tables, conflicts)
    }

    #[test]
    fn test_accepts_compatible_draws() {
        let set = resolver().resolve(&Draws::new(5, 150, 7)).unwrap();
        assert_eq!(set, AttributeSet::new("Great wave.png", "Pyramid stone.png", "Frog.png"));
        assert_eq!(set.get(Category::Object), "Frog.png");
    }

    #[test]
    fn test_rejects_conflicting_pair() {
        let result = resolver().resolve(&Draws::new(150, 50, 7));
        assert_eq!(
            result,
            Err(Rejection::Conflict {
                background: "Pine forest.png".to_string(),
                foreground: "Cloud world.png".to_string(),
            })
        );
    }

    #[test]
    fn test_rejects_unresolved_category() {
        let result = resolver().resolve(&Draws::new(5, 50, 999));
        assert_eq!(
            result,
            Err(Rejection::Unresolved { category: Category::Object, draw: 999 })
        );
    }

    #[test]
    fn test_never_returns_conflicting_set() {
        let r = resolver();
        for bg in (1..=200).step_by(7) {
            for fg in (1..=200).step_by(11) {
                if let Ok(set) = r.resolve(&Draws::new(bg, fg, 1)) {
                    assert!(!r.conflicts().is_conflicting(set.background(), set.foreground()));
                }
            }
        }
    }

    #[test]
    fn test_resolution_is_stateless() {
        let r = resolver();
        let first = r.resolve(&Draws::new(5, 150, 7));
        let _ = r.resolve(&Draws::new(150, 50, 7));
        assert_eq!(first, r.resolve(&Draws::new(5, 150, 7)));
    }
}
