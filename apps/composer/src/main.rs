use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use client_core::{
    Composer, ComposerError, CounterStore, DirectoryDownloads, GenerationSession, HttpBackend,
    PatternCatalog, RefinementSession, SingleStepSession, StatusReporter,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, Settings};
use console::ConsoleStatus;

#[derive(Parser, Debug)]
#[command(
    name = "composer",
    about = "Compose Event-B refinements from reusable patterns"
)]
struct Cli {
    /// Settings file; defaults to ./composer.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[arg(long)]
    state_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the patterns offered by the server.
    Patterns,
    /// Generate one archive from an ordered sequence of refinement steps.
    Generate {
        /// Comma-separated patterns for one refinement; repeat once per step.
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
        /// Number of refinements; defaults to one per `--step`.
        #[arg(long = "steps", value_name = "N")]
        step_count: Option<String>,
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Generate the next refinement from a single selection.
    GenerateSingle {
        #[arg(long = "pattern", required = true)]
        patterns: Vec<String>,
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Show the refinement number the next single-step generation will use.
    Counter,
    /// Restart single-step numbering at 1.
    ResetCounter,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(v) = cli.server_url {
        settings.server_url = v;
    }
    if let Some(v) = cli.download_dir {
        settings.download_dir = v;
    }
    if let Some(v) = cli.state_file {
        settings.state_path = v;
    }
    debug!(?settings, "resolved settings");

    let outcome = match cli.command {
        Command::Patterns => list_patterns(&settings).await,
        Command::Generate {
            steps,
            step_count,
            project_name,
        } => {
            generate(
                &settings,
                &steps,
                step_count.as_deref(),
                project_name.or(settings.project_name.clone()),
            )
            .await
        }
        Command::GenerateSingle {
            patterns,
            project_name,
        } => {
            generate_single(
                &settings,
                &patterns,
                project_name.or(settings.project_name.clone()),
            )
            .await
        }
        Command::Counter => {
            let next = CounterStore::new(&settings.state_path).load().await;
            println!("next refinement: {next}");
            Ok(())
        }
        Command::ResetCounter => {
            reset_counter(&settings).await;
            Ok(())
        }
    };

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    })
}

fn backend(settings: &Settings) -> Result<Arc<HttpBackend>, ComposerError> {
    HttpBackend::new(&settings.server_url)
        .map(Arc::new)
        .map_err(|err| {
            ConsoleStatus.report(&err.to_string(), true);
            err
        })
}

fn composer<S: GenerationSession>(
    settings: &Settings,
    session: S,
    project_name: Option<&str>,
) -> Result<Composer<S, ConsoleStatus>, ComposerError> {
    Ok(Composer::new(
        backend(settings)?,
        Arc::new(DirectoryDownloads::new(&settings.download_dir)),
        session,
        ConsoleStatus,
    )
    .with_project_name(project_name))
}

/// Splits one `--step` value into distinct pattern names, keeping their order.
fn split_patterns(step: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in step.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

async fn list_patterns(settings: &Settings) -> Result<(), ComposerError> {
    let mut composer = composer(settings, RefinementSession::default(), None)?;
    composer.reload_catalog().await?;
    for name in composer.session().catalog().iter() {
        println!("{name}");
    }
    Ok(())
}

async fn generate(
    settings: &Settings,
    steps: &[String],
    step_count: Option<&str>,
    project_name: Option<String>,
) -> Result<(), ComposerError> {
    let mut composer = composer(
        settings,
        RefinementSession::default(),
        project_name.as_deref(),
    )?;
    composer.reload_catalog().await?;
    match step_count {
        Some(raw) => composer.configure_steps_from(raw).map(|_| ())?,
        None => composer.configure_steps(steps.len())?,
    }
    for (index, step) in steps.iter().enumerate() {
        for pattern in split_patterns(step) {
            composer.toggle(index + 1, pattern)?;
        }
    }
    for step in composer.session().steps() {
        debug!(step = step.index(), patterns = ?step.selection(), "refinement selection");
    }
    composer.generate().await?;
    Ok(())
}

async fn generate_single(
    settings: &Settings,
    patterns: &[String],
    project_name: Option<String>,
) -> Result<(), ComposerError> {
    let session = SingleStepSession::load(
        Arc::new(PatternCatalog::default()),
        CounterStore::new(&settings.state_path),
    )
    .await;
    let mut composer = composer(settings, session, project_name.as_deref())?;
    composer.reload_catalog().await?;
    for pattern in patterns.iter().flat_map(|p| split_patterns(p)) {
        if !composer.session().selection().contains(pattern) {
            composer.toggle(pattern)?;
        }
    }
    let refinement = composer.session().refinement();
    composer.generate().await?;
    println!("refinement {refinement} generated; next is {}", composer.session().refinement());
    Ok(())
}

/// Resets the stored counter without contacting the server.
async fn reset_counter(settings: &Settings) -> u32 {
    let value = CounterStore::new(&settings.state_path).reset().await;
    ConsoleStatus.report(&format!("Refinement counter reset to {value}."), false);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_patterns_trims_and_drops_duplicates() {
        assert_eq!(
            split_patterns(" Logger, Mutex ,,Logger"),
            vec!["Logger", "Mutex"]
        );
        assert!(split_patterns(" , ").is_empty());
    }

    #[test]
    fn cli_accepts_repeated_steps() {
        let cli = Cli::try_parse_from([
            "composer",
            "--server-url",
            "http://generator:9000",
            "generate",
            "--step",
            "Logger,Mutex",
            "--step",
            "Logger",
            "--project-name",
            "Acme",
        ])
        .expect("parse");

        assert_eq!(cli.server_url.as_deref(), Some("http://generator:9000"));
        match cli.command {
            Command::Generate {
                steps,
                step_count,
                project_name,
            } => {
                assert_eq!(steps, vec!["Logger,Mutex", "Logger"]);
                assert_eq!(step_count, None);
                assert_eq!(project_name.as_deref(), Some("Acme"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_accepts_an_explicit_step_count() {
        let cli = Cli::try_parse_from([
            "composer", "generate", "--steps", " 2 ", "--step", "Logger",
        ])
        .expect("parse");

        match cli.command {
            Command::Generate {
                steps, step_count, ..
            } => {
                assert_eq!(steps, vec!["Logger"]);
                assert_eq!(step_count.as_deref(), Some(" 2 "));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reset_counter_works_without_a_reachable_server() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings {
            server_url: "not a url".to_string(),
            state_path: dir.path().join("state.json"),
            ..Settings::default()
        };
        CounterStore::new(&settings.state_path).save(7).await;

        assert_eq!(reset_counter(&settings).await, 1);
        assert_eq!(CounterStore::new(&settings.state_path).load().await, 1);
    }

    #[test]
    fn generate_requires_at_least_one_step() {
        assert!(Cli::try_parse_from(["composer", "generate"]).is_err());
    }
}
