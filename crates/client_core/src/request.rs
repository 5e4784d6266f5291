use shared::protocol::GenerateRequest;

use crate::session::GenerationSession;

/// Serialises session state into the body of a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequestBuilder {
    project_name: Option<String>,
}

impl GenerationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_name(mut self, project_name: Option<&str>) -> Self {
        self.project_name = project_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    /// Callers must check readiness first; a non-ready session is a logic error here.
    pub fn build<S: GenerationSession + ?Sized>(&self, session: &S) -> GenerateRequest {
        debug_assert!(session.is_ready(), "built a request from a non-ready session");
        GenerateRequest {
            project_name: self.project_name.clone(),
            payload: session.payload(),
        }
    }
}
