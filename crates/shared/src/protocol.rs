use serde::{Deserialize, Serialize};

use crate::domain::PatternName;

pub const PATTERNS_PATH: &str = "api/patterns";
pub const GENERATE_PATH: &str = "api/generate";

pub const PROJECT_NAME_HEADER: &str = "x-project-name";
pub const PROJECT_PATH_HEADER: &str = "x-project-path";
pub const GENERATED_FILES_HEADER: &str = "x-generated-files";

/// Separator used by the service when listing generated files in a header.
pub const GENERATED_FILES_SEPARATOR: char = ';';

/// Download name used when neither the response nor the project provides one.
pub const DEFAULT_ARCHIVE_NAME: &str = "eventb-artifacts.zip";

/// Body of `POST /api/generate`.
///
/// The refinement payload is flattened into the top-level object so that the
/// wire shape is either `{"refinement": n, "patterns": [..]}` or
/// `{"refinements": [[..], ..]}`, with an optional `projectName` alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(
        rename = "projectName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub project_name: Option<String>,
    #[serde(flatten)]
    pub payload: RefinementPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefinementPayload {
    SingleStep {
        refinement: u32,
        patterns: Vec<PatternName>,
    },
    MultiStep {
        refinements: Vec<Vec<PatternName>>,
    },
}

impl RefinementPayload {
    pub fn step_count(&self) -> usize {
        match self {
            Self::SingleStep { .. } => 1,
            Self::MultiStep { refinements } => refinements.len(),
        }
    }
}
