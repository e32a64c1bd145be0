//! Biome Pipeline - Generation and Reconciliation
//!
//! `produce` fills slots one at a time, redrawing until the resolver accepts.
//! `reconcile` repeats scan -> purge -> regenerate until every fingerprint in
//! the ledger belongs to exactly one slot. `run` does both for slots 1..=N.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compositor::{CompositeError, Compositor};
use crate::hashing::{fingerprint, Fingerprint};
use crate::ledger::{BatchLedger, DuplicateGroup};
use crate::random::{RandomSource, RandomSourceError};
use crate::resolver::{AttributeResolver, AttributeSet};
use crate::store::{ArtifactStore, StoreError};
use crate::tables::Slot;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Random source failure: {0}")]
    RandomSource(#[from] RandomSourceError),

    #[error("Compositing failed for slot {slot}: {source}")]
    Composite {
        slot: Slot,
        #[source]
        source: CompositeError,
    },

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Slot {slot} made {attempts} attempts without an accepted attribute set")]
    RetriesExhausted { slot: Slot, attempts: u32 },

    #[error("Duplicates remain after {0} reconciliation rounds")]
    ReconciliationStalled(u32),

    #[error("Batch size must be at least 1")]
    EmptyBatch,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// How many draws a single slot may consume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    Unbounded,
    MaxAttempts(u32),
}

impl RetryPolicy {
    pub fn allows(&self, attempts_made: u32) -> bool {
        match self {
            RetryPolicy::Unbounded => true,
            RetryPolicy::MaxAttempts(max) => attempts_made < *max,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub retry: RetryPolicy,
    /// Cap on purge/regenerate rounds; `None` keeps going until clean.
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Scanning,
    Purging,
    Regenerating,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub attempts: u64,
    pub rejections: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducedBiome {
    pub slot: Slot,
    pub attributes: AttributeSet,
    pub fingerprint: Fingerprint,
    pub attempts: u32,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub rounds: u32,
    pub regenerated: Vec<Slot>,
    pub transitions: Vec<ReconcileState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requested: u32,
    pub attempts: u64,
    pub rejections: u64,
    pub duplicate_rounds: u32,
    pub regenerated: Vec<Slot>,
    pub fingerprints: BTreeMap<Slot, Fingerprint>,
    pub elapsed_secs: f64,
}

pub struct BiomePipeline<R, C, S> {
    resolver: AttributeResolver,
    source: R,
    compositor: C,
    store: S,
    ledger: BatchLedger,
    options: PipelineOptions,
    stats: GenerationStats,
}

impl<R, C, S> BiomePipeline<R, C, S>
where
    R: RandomSource,
    C: Compositor,
    S: ArtifactStore,
{
    pub fn new(resolver: AttributeResolver, source: R, compositor: C, store: S) -> Self {
        Self {
            resolver,
            source,
            compositor,
            store,
            ledger: BatchLedger::new(),
            options: PipelineOptions::default(),
            stats: GenerationStats::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ledger(&self) -> &BatchLedger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// Generate one biome for each slot, in the order given.
    pub fn produce(&mut self, slots: &[Slot]) -> Result<Vec<ProducedBiome>, PipelineError> {
        info!("Making {} biome(s)", slots.len());
        slots.iter().map(|&slot| self.produce_slot(slot)).collect()
    }

    fn produce_slot(&mut self, slot: Slot) -> Result<ProducedBiome, PipelineError> {
        let started = Instant::now();
        let mut attempts = 0u32;

        let attributes = loop {
            if !self.options.retry.allows(attempts) {
                return Err(PipelineError::RetriesExhausted { slot, attempts });
            }
            attempts += 1;
            self.stats.attempts += 1;

            let draws = self.source.next_draws()?;
            debug!(slot, %draws, "drew attributes");

            match self.resolver.resolve(&draws) {
                Ok(attributes) => break attributes,
                Err(rejection) => {
                    self.stats.rejections += 1;
                    warn!(slot, %rejection, "rejected draw, getting new attributes");
                }
            }
        };

        let image = self
            .compositor
            .render(&attributes)
            .map_err(|source| PipelineError::Composite { slot, source })?;
        self.store.save(slot, &image, &attributes)?;

        let fingerprint = fingerprint(&attributes)?;
        self.ledger.record(slot, fingerprint.clone());

        let elapsed_secs = started.elapsed().as_secs_f64();
        info!(slot, attempts, %attributes, "biome generated in {:.3}s", elapsed_secs);

        Ok(ProducedBiome { slot, attributes, fingerprint, attempts, elapsed_secs })
    }

    /// Scan/purge/regenerate until the ledger holds no duplicate fingerprint.
    pub fn reconcile(&mut self) -> Result<ReconcileReport, PipelineError> {
        let mut report = ReconcileReport::default();
        let mut state = ReconcileState::Scanning;
        let mut groups: Vec<DuplicateGroup> = vec![];
        let mut pending: Vec<Slot> = vec![];

        loop {
            report.transitions.push(state);
            state = match state {
                ReconcileState::Scanning => {
                    groups = self.ledger.duplicate_groups();
                    if groups.is_empty() {
                        info!("No duplicates found");
                        ReconcileState::Done
                    } else if self.options.max_rounds.map_or(false, |max| report.rounds >= max) {
                        return Err(PipelineError::ReconciliationStalled(report.rounds));
                    } else {
                        report.rounds += 1;
                        warn!(round = report.rounds, groups = groups.len(), "found duplicate biomes");
                        ReconcileState::Purging
                    }
                }
                ReconcileState::Purging => {
                    pending = self.purge(&groups)?;
                    ReconcileState::Regenerating
                }
                ReconcileState::Regenerating => {
                    self.produce(&pending)?;
                    report.regenerated.append(&mut pending);
                    ReconcileState::Scanning
                }
                ReconcileState::Done => break,
            };
        }

        Ok(report)
    }

    /// Drop every non-survivor of each group; returns the freed slots ascending.
    fn purge(&mut self, groups: &[DuplicateGroup]) -> Result<Vec<Slot>, PipelineError> {
        let mut freed = vec![];
        for group in groups {
            for &slot in group.redundant() {
                self.store.delete(slot)?;
                self.ledger.remove(slot);
                warn!(slot, survivor = group.survivor(), fingerprint = %group.fingerprint, "purged duplicate");
                freed.push(slot);
            }
        }
        freed.sort_unstable();
        Ok(freed)
    }

    /// Generate slots 1..=count and reconcile until unique.
    pub fn run(&mut self, count: u32) -> Result<BatchReport, PipelineError> {
        if count == 0 {
            return Err(PipelineError::EmptyBatch);
        }

        self.ledger = BatchLedger::new();
        self.stats = GenerationStats::default();

        let started_at = Utc::now();
        let clock = Instant::now();

        let slots: Vec<Slot> = (1..=count).collect();
        self.produce(&slots)?;
        let reconcile = self.reconcile()?;

        let elapsed_secs = clock.elapsed().as_secs_f64();
        info!("Total time for {} biomes was {:.3}s", count, elapsed_secs);

        Ok(BatchReport {
            batch_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            requested: count,
            attempts: self.stats.attempts,
            rejections: self.stats.rejections,
            duplicate_rounds: reconcile.rounds,
            regenerated: reconcile.regenerated,
            fingerprints: self.ledger.entries().clone(),
            elapsed_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy() {
        assert!(RetryPolicy::Unbounded.allows(u32::MAX));
        let bounded = RetryPolicy::MaxAttempts(2);
        assert!(bounded.allows(0));
        assert!(bounded.allows(1));
        assert!(!bounded.allows(2));
    }

    #[test]
    fn test_default_options_unbounded() {
        let options = PipelineOptions::default();
        assert_eq!(options.retry, RetryPolicy::Unbounded);
        assert_eq!(options.max_rounds, None);
    }
}
