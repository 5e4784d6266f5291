//! Snapshot of the patterns offered by the generation service.

use std::collections::HashSet;

use shared::domain::PatternName;
use tracing::{info, warn};

use crate::{error::ComposerError, transport::GenerationBackend};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCatalog {
    patterns: Vec<PatternName>,
}

impl PatternCatalog {
    /// Builds a snapshot in display order, keeping the first occurrence of any repeated name.
    pub fn from_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PatternName>,
    {
        let mut seen = HashSet::new();
        let mut patterns = Vec::new();
        for name in names {
            let name = name.into();
            if seen.insert(name.clone()) {
                patterns.push(name);
            } else {
                warn!(pattern = %name, "dropping duplicate pattern name from catalog");
            }
        }
        Self { patterns }
    }

    pub async fn load(backend: &dyn GenerationBackend) -> Result<Self, ComposerError> {
        let names = backend.list_patterns().await?;
        let catalog = Self::from_names(names);
        info!(patterns = catalog.len(), "loaded pattern catalog");
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternName> {
        self.patterns.iter()
    }
}
