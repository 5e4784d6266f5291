//! Turns a raw generation response into a [`GenerationResult`].

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use shared::protocol::{
    DEFAULT_ARCHIVE_NAME, GENERATED_FILES_HEADER, GENERATED_FILES_SEPARATOR, PROJECT_NAME_HEADER,
    PROJECT_PATH_HEADER,
};
use thiserror::Error;
use tracing::debug;

use crate::{error::ComposerError, transport::GenerationResponse};

const EXTENDED_FILENAME_MARKER: &str = "filename*=utf-8''";
const QUOTED_FILENAME_MARKER: &str = "filename=\"";
const BARE_FILENAME_MARKER: &str = "filename=";

#[derive(Debug, Error, PartialEq, Eq)]
enum FilenameDecodeError {
    #[error("malformed percent escape at byte {0}")]
    MalformedEscape(usize),
    #[error("decoded filename is not valid UTF-8")]
    InvalidUtf8,
}

/// A successfully generated artefact, ready to be handed to a download trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub project_name: Option<String>,
    pub project_path: Option<String>,
    pub generated_files: Vec<String>,
    /// Files reported by the service, or an estimate of two per refinement step.
    pub file_count: usize,
    pub download_filename: String,
    pub content: Vec<u8>,
}

impl GenerationResult {
    pub fn summary(&self) -> String {
        let target = self.project_path.as_deref().unwrap_or("workspace");
        format!(
            "Generated {} file{} in {target}. Download saved as {}.",
            self.file_count,
            if self.file_count == 1 { "" } else { "s" },
            self.download_filename
        )
    }
}

pub fn interpret(
    response: GenerationResponse,
    step_count: usize,
) -> Result<GenerationResult, ComposerError> {
    let GenerationResponse {
        status,
        headers,
        body,
    } = response;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Err(ComposerError::GenerationFailed(if text.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            text.into_owned()
        }));
    }

    let project_name = header_text(&headers, PROJECT_NAME_HEADER).filter(|v| !v.is_empty());
    let project_path = header_text(&headers, PROJECT_PATH_HEADER)
        .filter(|v| !v.is_empty())
        .or_else(|| project_name.clone());
    let generated_files = header_text(&headers, GENERATED_FILES_HEADER)
        .map(|raw| parse_generated_files(&raw))
        .unwrap_or_default();
    let disposition = header_text(&headers, CONTENT_DISPOSITION.as_str());
    let download_filename =
        resolve_download_filename(disposition.as_deref(), project_name.as_deref().unwrap_or(""));
    let file_count = if generated_files.is_empty() {
        step_count * 2
    } else {
        generated_files.len()
    };

    Ok(GenerationResult {
        project_name,
        project_path,
        generated_files,
        file_count,
        download_filename,
        content: body,
    })
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Splits a `;`-delimited file list, trimming entries and dropping empty ones.
pub fn parse_generated_files(header: &str) -> Vec<String> {
    header
        .split(GENERATED_FILES_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks the download name from a `Content-Disposition` value, falling back to
/// `<project>.zip` and then to [`DEFAULT_ARCHIVE_NAME`].
pub fn resolve_download_filename(disposition: Option<&str>, project_name: &str) -> String {
    if let Some(name) = disposition.and_then(filename_from_disposition) {
        return name;
    }
    if project_name.is_empty() {
        DEFAULT_ARCHIVE_NAME.to_string()
    } else {
        format!("{project_name}.zip")
    }
}

/// Tries the extended, quoted and bare `filename` parameters in that order.
pub fn filename_from_disposition(disposition: &str) -> Option<String> {
    if disposition.is_empty() {
        return None;
    }
    let lowered = disposition.to_ascii_lowercase();

    if let Some(encoded) = param_values(disposition, &lowered, EXTENDED_FILENAME_MARKER)
        .map(until_semicolon)
        .find(|value| !value.is_empty())
    {
        match percent_decode(encoded) {
            Ok(name) => {
                debug!(filename = %name, "resolved extended filename parameter");
                return Some(name);
            }
            Err(err) => debug!(error = %err, "ignoring undecodable extended filename"),
        }
    }

    if let Some(quoted) = param_values(disposition, &lowered, QUOTED_FILENAME_MARKER)
        .filter_map(|rest| rest.split_once('"').map(|(value, _)| value))
        .find(|value| !value.is_empty())
    {
        return Some(quoted.to_string());
    }

    let bare = param_values(disposition, &lowered, BARE_FILENAME_MARKER)
        .map(until_semicolon)
        .find(|value| !value.is_empty())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    bare
}

/// Text following each case-insensitive occurrence of `marker`.
///
/// `lowered` must be the ASCII-lowercased form of `original`, so byte offsets line up.
fn param_values<'a>(
    original: &'a str,
    lowered: &'a str,
    marker: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    lowered
        .match_indices(marker)
        .map(move |(start, _)| &original[start + marker.len()..])
}

fn until_semicolon(value: &str) -> &str {
    value.split(';').next().unwrap_or_default()
}

fn percent_decode(encoded: &str) -> Result<String, FilenameDecodeError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(FilenameDecodeError::MalformedEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    urlencoding::decode(encoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FilenameDecodeError::InvalidUtf8)
}

#[cfg(test)]
#[path = "tests/interpreter_tests.rs"]
mod tests;
