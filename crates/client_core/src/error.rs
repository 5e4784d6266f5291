use thiserror::Error;

use shared::domain::MAX_REFINEMENT_STEPS;

/// Failures surfaced to the user while composing and generating artefacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    #[error("{0}")]
    CatalogLoad(String),
    #[error("{}", invalid_step_count_message(.0))]
    InvalidStepCount(usize),
    #[error("refinement {index} does not exist (configured: {len})")]
    StepOutOfRange { index: usize, len: usize },
    #[error("pattern '{0}' is not offered by the current catalog")]
    UnknownPattern(String),
    #[error("Select at least one pattern for each refinement before generating.")]
    NotReady,
    #[error("a generation request is already in flight")]
    Busy,
    #[error("{0}")]
    GenerationFailed(String),
    #[error("failed to save download: {0}")]
    DownloadFailed(String),
    #[error("invalid server url '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },
}

fn invalid_step_count_message(requested: &usize) -> String {
    if *requested < 1 {
        "Enter a refinement count of at least 1.".to_string()
    } else {
        format!(
            "Please choose {MAX_REFINEMENT_STEPS} refinements or fewer to keep things manageable."
        )
    }
}
