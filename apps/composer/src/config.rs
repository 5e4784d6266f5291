use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "composer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub download_dir: PathBuf,
    pub state_path: PathBuf,
    pub project_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            state_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("eventb_composer")
                .join("state.json"),
            project_name: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    download_dir: Option<PathBuf>,
    state_path: Option<PathBuf>,
    project_name: Option<String>,
}

/// Defaults, then `composer.toml` (or `config_path`), then environment overrides.
///
/// A missing default config file is fine; an explicitly requested one must exist.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match config_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        apply_file(&mut settings, &raw).with_context(|| {
            format!(
                "failed to parse config file '{}'",
                config_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
            )
        })?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.download_dir {
        settings.download_dir = v;
    }
    if let Some(v) = file_cfg.state_path {
        settings.state_path = v;
    }
    if let Some(v) = file_cfg.project_name {
        settings.project_name = Some(v);
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("COMPOSER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("COMPOSER_DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }

    if let Some(v) = var("COMPOSER_STATE_PATH") {
        settings.state_path = PathBuf::from(v);
    }

    if let Some(v) = var("COMPOSER_PROJECT_NAME") {
        settings.project_name = Some(v);
    }
}
