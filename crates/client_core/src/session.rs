//! Selection state for both generation modes and the readiness rules that gate generation.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::{GenerationMode, PatternName, MAX_REFINEMENT_STEPS},
    protocol::RefinementPayload,
};
use tracing::{debug, warn};

use crate::{catalog::PatternCatalog, counter_store::CounterStore, error::ComposerError};

/// Operations the controller needs from a session, whichever mode it runs in.
#[async_trait]
pub trait GenerationSession: Send + Sync {
    fn mode(&self) -> GenerationMode;
    fn catalog(&self) -> &PatternCatalog;
    /// Installs a fresh catalog snapshot and returns how many stale selections were pruned.
    fn replace_catalog(&mut self, catalog: Arc<PatternCatalog>) -> usize;
    fn is_ready(&self) -> bool;
    fn step_count(&self) -> usize;
    fn payload(&self) -> RefinementPayload;
    /// Runs once after an artefact was generated and downloaded.
    async fn record_success(&mut self) {}
}

/// Parses free-text step-count input the way the refinement form accepts it.
pub fn parse_step_count(raw: &str) -> Result<usize, ComposerError> {
    let trimmed = raw.trim();
    let count = match trimmed.parse::<i64>() {
        Ok(count) => usize::try_from(count).map_err(|_| ComposerError::InvalidStepCount(0))?,
        // Positive numbers too large for any integer are still "too many".
        Err(_) if is_unsigned_digits(trimmed) => usize::MAX,
        Err(_) => return Err(ComposerError::InvalidStepCount(0)),
    };
    validate_step_count(count)
}

fn is_unsigned_digits(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn validate_step_count(count: usize) -> Result<usize, ComposerError> {
    if (1..=MAX_REFINEMENT_STEPS).contains(&count) {
        Ok(count)
    } else {
        Err(ComposerError::InvalidStepCount(count))
    }
}

fn toggle_in(
    catalog: &PatternCatalog,
    selection: &mut BTreeSet<PatternName>,
    pattern: &str,
) -> Result<bool, ComposerError> {
    if selection.remove(pattern) {
        return Ok(false);
    }
    if !catalog.contains(pattern) {
        return Err(ComposerError::UnknownPattern(pattern.to_string()));
    }
    selection.insert(PatternName::from(pattern));
    Ok(true)
}

fn prune_stale(catalog: &PatternCatalog, selection: &mut BTreeSet<PatternName>) -> usize {
    let before = selection.len();
    selection.retain(|name| catalog.contains(name.as_str()));
    before - selection.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementStep {
    index: usize,
    selection: BTreeSet<PatternName>,
}

impl RefinementStep {
    fn new(index: usize) -> Self {
        Self {
            index,
            selection: BTreeSet::new(),
        }
    }

    /// 1-based position in the refinement sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn selection(&self) -> &BTreeSet<PatternName> {
        &self.selection
    }

    pub fn is_selected(&self, pattern: &str) -> bool {
        self.selection.contains(pattern)
    }

    pub fn is_valid(&self) -> bool {
        !self.selection.is_empty()
    }
}

/// Ordered sequence of refinement steps, each with its own pattern selection.
#[derive(Debug, Clone, Default)]
pub struct RefinementSession {
    catalog: Arc<PatternCatalog>,
    steps: Vec<RefinementStep>,
}

impl RefinementSession {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self {
            catalog,
            steps: Vec::new(),
        }
    }

    /// Replaces every step with `count` empty ones. Prior selections are discarded.
    pub fn configure_steps(&mut self, count: usize) -> Result<(), ComposerError> {
        let count = validate_step_count(count)?;
        self.steps = (1..=count).map(RefinementStep::new).collect();
        debug!(count, "configured refinement steps");
        Ok(())
    }

    /// Flips `pattern` in the selection of step `step_index` (1-based).
    ///
    /// Returns whether the pattern is selected afterwards.
    pub fn toggle(&mut self, step_index: usize, pattern: &str) -> Result<bool, ComposerError> {
        let len = self.steps.len();
        let step = step_index
            .checked_sub(1)
            .and_then(|i| self.steps.get_mut(i))
            .ok_or(ComposerError::StepOutOfRange {
                index: step_index,
                len,
            })?;
        toggle_in(&self.catalog, &mut step.selection, pattern)
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn steps(&self) -> &[RefinementStep] {
        &self.steps
    }
}

#[async_trait]
impl GenerationSession for RefinementSession {
    fn mode(&self) -> GenerationMode {
        GenerationMode::MultiStep
    }

    fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    fn replace_catalog(&mut self, catalog: Arc<PatternCatalog>) -> usize {
        self.catalog = catalog;
        let pruned: usize = self
            .steps
            .iter_mut()
            .map(|step| prune_stale(&self.catalog, &mut step.selection))
            .sum();
        if pruned > 0 {
            warn!(pruned, "removed selections of patterns no longer in the catalog");
        }
        pruned
    }

    fn is_ready(&self) -> bool {
        !self.catalog.is_empty()
            && !self.steps.is_empty()
            && self.steps.iter().all(RefinementStep::is_valid)
    }

    fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn payload(&self) -> RefinementPayload {
        RefinementPayload::MultiStep {
            refinements: self
                .steps
                .iter()
                .map(|step| step.selection.iter().cloned().collect())
                .collect(),
        }
    }
}

/// One implicit selection labelled by a persisted refinement counter.
#[derive(Debug, Clone)]
pub struct SingleStepSession {
    catalog: Arc<PatternCatalog>,
    selection: BTreeSet<PatternName>,
    counter: CounterStore,
    refinement: u32,
}

impl SingleStepSession {
    /// Restores the refinement counter from `counter`.
    pub async fn load(catalog: Arc<PatternCatalog>, counter: CounterStore) -> Self {
        let refinement = counter.load().await;
        Self {
            catalog,
            selection: BTreeSet::new(),
            counter,
            refinement,
        }
    }

    pub fn toggle(&mut self, pattern: &str) -> Result<bool, ComposerError> {
        toggle_in(&self.catalog, &mut self.selection, pattern)
    }

    pub fn selection(&self) -> &BTreeSet<PatternName> {
        &self.selection
    }

    /// Refinement number the next generation will be labelled with.
    pub fn refinement(&self) -> u32 {
        self.refinement
    }

    pub async fn reset_counter(&mut self) -> u32 {
        self.refinement = self.counter.reset().await;
        self.refinement
    }
}

#[async_trait]
impl GenerationSession for SingleStepSession {
    fn mode(&self) -> GenerationMode {
        GenerationMode::SingleStep
    }

    fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    fn replace_catalog(&mut self, catalog: Arc<PatternCatalog>) -> usize {
        self.catalog = catalog;
        let pruned = prune_stale(&self.catalog, &mut self.selection);
        if pruned > 0 {
            warn!(pruned, "removed selections of patterns no longer in the catalog");
        }
        pruned
    }

    fn is_ready(&self) -> bool {
        !self.catalog.is_empty() && !self.selection.is_empty()
    }

    fn step_count(&self) -> usize {
        1
    }

    fn payload(&self) -> RefinementPayload {
        RefinementPayload::SingleStep {
            refinement: self.refinement,
            patterns: self.selection.iter().cloned().collect(),
        }
    }

    async fn record_success(&mut self) {
        self.refinement = self.refinement.saturating_add(1);
        self.counter.save(self.refinement).await;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
