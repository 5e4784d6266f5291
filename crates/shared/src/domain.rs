use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a pattern offered by the generation service.
///
/// Equality is exact string match; the service uses the pattern's file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternName(String);

impl PatternName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PatternName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PatternName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PatternName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Upper bound on the number of refinement steps a session may configure.
pub const MAX_REFINEMENT_STEPS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// One implicit selection, labelled with a persisted refinement counter.
    SingleStep,
    /// An explicit, ordered sequence of refinement steps.
    MultiStep,
}
