//! Saves generated archives, staging each write so nothing is left behind on failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared::protocol::DEFAULT_ARCHIVE_NAME;
use tracing::{info, warn};

use crate::error::ComposerError;

/// Suffixes tried before giving up on finding a free download name.
const MAX_NAME_ATTEMPTS: usize = 1000;

#[async_trait]
pub trait DownloadTrigger: Send + Sync {
    /// Delivers `content` under `filename` and returns where it ended up.
    async fn trigger(&self, content: &[u8], filename: &str) -> Result<PathBuf, ComposerError>;
}

pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn free_target(&self, filename: &str) -> Result<PathBuf, ComposerError> {
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = match (attempt, ext) {
                (0, _) => filename.to_string(),
                (n, Some(ext)) => format!("{stem} ({n}).{ext}"),
                (n, None) => format!("{stem} ({n})"),
            };
            let path = self.dir.join(candidate);
            let taken = tokio::fs::try_exists(&path)
                .await
                .map_err(|err| ComposerError::DownloadFailed(err.to_string()))?;
            if !taken {
                return Ok(path);
            }
        }
        Err(ComposerError::DownloadFailed(format!(
            "no free file name for {filename} in {}",
            self.dir.display()
        )))
    }
}

#[async_trait]
impl DownloadTrigger for DirectoryDownloads {
    async fn trigger(&self, content: &[u8], filename: &str) -> Result<PathBuf, ComposerError> {
        let filename = sanitize_filename(filename);
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            ComposerError::DownloadFailed(format!("{}: {err}", self.dir.display()))
        })?;

        let staged = StagedFile::new(self.dir.join(format!(".{filename}.part")));
        tokio::fs::write(staged.path(), content)
            .await
            .map_err(|err| ComposerError::DownloadFailed(err.to_string()))?;

        let target = self.free_target(&filename).await?;
        staged.commit(&target).await?;
        info!(path = %target.display(), bytes = content.len(), "saved generated archive");
        Ok(target)
    }
}

/// Staging file removed on drop unless it was renamed into place.
struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(mut self, target: &Path) -> Result<(), ComposerError> {
        tokio::fs::rename(&self.path, target)
            .await
            .map_err(|err| ComposerError::DownloadFailed(err.to_string()))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "failed to remove staged download");
            }
        }
    }
}

/// Keeps only the final path component of a server-provided name.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        DEFAULT_ARCHIVE_NAME.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
