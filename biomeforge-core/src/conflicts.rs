//! Conflict Ruleset
//!
//! Background assets map to the foreground assets they cannot be paired with.
//! Only the background -> foreground direction is consulted; objects are never
//! checked.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::tables::AssetId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictRuleset {
    rules: BTreeMap<AssetId, BTreeSet<AssetId>>,
}

impl ConflictRuleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbid `foreground` on top of `background`.
    pub fn forbid(&mut self, background: impl Into<AssetId>, foreground: impl Into<AssetId>) {
        self.rules
            .entry(background.into())
            .or_default()
            .insert(foreground.into());
    }

    pub fn with_rule<I, S>(mut self, background: &str, foregrounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AssetId>,
    {
        for foreground in foregrounds {
            self.forbid(background, foreground);
        }
        self
    }

    pub fn is_conflicting(&self, background: &str, foreground: &str) -> bool {
        self.rules
            .get(background)
            .map_or(false, |forbidden| forbidden.contains(foreground))
    }

    pub fn rules(&self) -> impl Iterator<Item = (&AssetId, &BTreeSet<AssetId>)> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
