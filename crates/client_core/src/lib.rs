use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::info;

pub mod catalog;
pub mod counter_store;
pub mod download;
pub mod error;
pub mod interpreter;
pub mod request;
pub mod session;
pub mod status;
pub mod transport;

pub use catalog::PatternCatalog;
pub use counter_store::CounterStore;
pub use download::{DirectoryDownloads, DownloadTrigger};
pub use error::ComposerError;
pub use interpreter::GenerationResult;
pub use request::GenerationRequestBuilder;
pub use session::{GenerationSession, RefinementSession, RefinementStep, SingleStepSession};
pub use status::{StatusLine, StatusMessage, StatusReporter, StatusSeverity};
pub use transport::{GenerationBackend, GenerationResponse, HttpBackend};

const GENERATING_STATUS: &str = "Generating files…";

/// What the user learns about a generation once the archive has been saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub project_name: Option<String>,
    pub project_path: Option<String>,
    pub generated_files: Vec<String>,
    pub file_count: usize,
    pub download_filename: String,
    pub saved_to: PathBuf,
    pub summary: String,
}

impl GenerationReport {
    fn new(result: GenerationResult, saved_to: PathBuf) -> Self {
        let summary = result.summary();
        let GenerationResult {
            project_name,
            project_path,
            generated_files,
            file_count,
            download_filename,
            content: _,
        } = result;
        Self {
            project_name,
            project_path,
            generated_files,
            file_count,
            download_filename,
            saved_to,
            summary,
        }
    }
}

/// Sequences catalog loading, session edits and generation requests for one user.
///
/// Every user action maps to one method call; status text is routed through the
/// configured [`StatusReporter`].
pub struct Composer<S: GenerationSession, R: StatusReporter = StatusLine> {
    backend: Arc<dyn GenerationBackend>,
    downloads: Arc<dyn DownloadTrigger>,
    session: S,
    status: R,
    requests: GenerationRequestBuilder,
    busy: AtomicBool,
}

/// Marks a generation as in flight; the flag is released when the guard drops,
/// including when the owning future is cancelled.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<S: GenerationSession, R: StatusReporter> Composer<S, R> {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        downloads: Arc<dyn DownloadTrigger>,
        session: S,
        status: R,
    ) -> Self {
        Self {
            backend,
            downloads,
            session,
            status,
            requests: GenerationRequestBuilder::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_project_name(mut self, project_name: Option<&str>) -> Self {
        self.requests = self.requests.with_project_name(project_name);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn status(&self) -> &R {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn can_generate(&self) -> bool {
        !self.is_busy() && self.session.is_ready()
    }

    /// Fetches a fresh catalog. On failure the session sees an empty catalog.
    pub async fn reload_catalog(&mut self) -> Result<(), ComposerError> {
        match PatternCatalog::load(self.backend.as_ref()).await {
            Ok(catalog) => {
                let empty = catalog.is_empty();
                self.session.replace_catalog(Arc::new(catalog));
                if empty {
                    self.status
                        .report("No patterns are available on the server.", false);
                }
                Ok(())
            }
            Err(err) => {
                self.session
                    .replace_catalog(Arc::new(PatternCatalog::default()));
                self.status
                    .report(&format!("Failed to load patterns: {err}"), true);
                Err(err)
            }
        }
    }

    pub async fn generate(&mut self) -> Result<GenerationReport, ComposerError> {
        if self.is_busy() {
            return Err(ComposerError::Busy);
        }
        if !self.session.is_ready() {
            return Err(self.fail(ComposerError::NotReady));
        }

        self.status.report(GENERATING_STATUS, false);
        let outcome = {
            let _busy = BusyGuard::acquire(&self.busy).ok_or(ComposerError::Busy)?;
            self.run_generation().await
        };

        match outcome {
            Ok(report) => {
                self.session.record_success().await;
                info!(
                    mode = ?self.session.mode(),
                    path = %report.saved_to.display(),
                    files = report.file_count,
                    "generation completed"
                );
                self.status.report(&report.summary, false);
                Ok(report)
            }
            Err(err) => {
                self.status
                    .report(&format!("Generation failed: {err}"), true);
                Err(err)
            }
        }
    }

    async fn run_generation(&self) -> Result<GenerationReport, ComposerError> {
        let request = self.requests.build(&self.session);
        let response = self.backend.generate(&request).await?;
        let result = interpreter::interpret(response, self.session.step_count())?;
        let saved_to = self
            .downloads
            .trigger(&result.content, &result.download_filename)
            .await?;
        Ok(GenerationReport::new(result, saved_to))
    }

    fn fail(&mut self, err: ComposerError) -> ComposerError {
        self.status.report(&err.to_string(), true);
        err
    }
}

impl<R: StatusReporter> Composer<RefinementSession, R> {
    pub fn configure_steps(&mut self, count: usize) -> Result<(), ComposerError> {
        if let Err(err) = self.session.configure_steps(count) {
            return Err(self.fail(err));
        }
        self.status.report(
            &format!(
                "Configured {count} refinement{}. Select patterns for each step.",
                if count == 1 { "" } else { "s" }
            ),
            false,
        );
        Ok(())
    }

    /// Applies free-text step-count input such as `--steps 3`.
    pub fn configure_steps_from(&mut self, raw: &str) -> Result<usize, ComposerError> {
        let count = session::parse_step_count(raw).map_err(|err| self.fail(err))?;
        self.configure_steps(count)?;
        Ok(count)
    }

    pub fn toggle(&mut self, step_index: usize, pattern: &str) -> Result<bool, ComposerError> {
        self.session
            .toggle(step_index, pattern)
            .map_err(|err| self.fail(err))
    }

    pub fn clear(&mut self) {
        self.session.clear();
        self.status.report("Refinements cleared.", false);
    }
}

impl<R: StatusReporter> Composer<SingleStepSession, R> {
    pub fn toggle(&mut self, pattern: &str) -> Result<bool, ComposerError> {
        self.session.toggle(pattern).map_err(|err| self.fail(err))
    }

    pub async fn reset_counter(&mut self) -> u32 {
        let value = self.session.reset_counter().await;
        self.status
            .report(&format!("Refinement counter reset to {value}."), false);
        value
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
