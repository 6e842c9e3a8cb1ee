//! Migration script discovery and application
//!
//! Scripts are applied in plain lexical order of their paths. Each script moves
//! through `Pending -> Parsed -> Executing -> Applied | Failed`.

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MigrationsConfig;
use crate::db::executor::ScriptExecutor;
use crate::db::parser::split_statements;
use crate::error::{Error, Result};

/// A migration script on disk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MigrationFile {
    pub path: PathBuf,
}

impl MigrationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name used in logs and reports
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Progress of one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScriptState {
    Pending,
    Parsed { statements: usize },
    Executing { statements: usize },
    Applied { statements: usize },
    Failed { error: String },
}

/// Final state of one script after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptOutcome {
    pub script: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub state: ScriptState,
}

/// Per-script results of one run, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<ScriptOutcome>,
}

impl ApplyReport {
    pub fn applied(&self) -> impl Iterator<Item = &ScriptOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, ScriptState::Applied { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScriptOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, ScriptState::Failed { .. }))
    }

    /// Turn a run with failed scripts into a [`Error::MigrationError`]
    pub fn ensure_success(&self) -> Result<()> {
        let failed: Vec<String> = self.failed().map(|o| o.script.clone()).collect();
        if failed.is_empty() {
            return Ok(());
        }
        Err(Error::MigrationError(format!(
            "{} of {} scripts failed: {}",
            failed.len(),
            self.outcomes.len(),
            failed.join(", ")
        )))
    }
}

/// List scripts in `directory` with the given extension, sorted lexically.
///
/// The sort is on the path text, so `10_seed.sql` runs before `2_add.sql`.
pub fn discover_scripts(directory: &Path, extension: &str) -> Result<Vec<MigrationFile>> {
    if !directory.is_dir() {
        return Err(Error::UsageError(format!(
            "Scripts directory does not exist: {}",
            directory.display()
        )));
    }

    let dir = directory.to_str().ok_or_else(|| {
        Error::UsageError(format!("Scripts directory is not valid UTF-8: {}", directory.display()))
    })?;
    let pattern = format!("{}/*.{}", Pattern::escape(dir), Pattern::escape(extension));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let entries = glob::glob_with(&pattern, options)
        .map_err(|e| Error::ConfigError(format!("Invalid script pattern '{}': {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::IoError(std::io::Error::new(e.error().kind(), e.to_string())))?;
        if path.is_file() {
            files.push(MigrationFile::new(path));
        }
    }
    files.sort();

    tracing::debug!(directory = %directory.display(), count = files.len(), "Discovered scripts");
    Ok(files)
}

/// Apply scripts in order.
///
/// A failed script is recorded and, unless `continue_on_error` is off, the run
/// moves on to the next one. Scripts after an abort stay `Pending`.
pub async fn apply_scripts<E>(
    executor: &E,
    files: &[MigrationFile],
    config: &MigrationsConfig,
) -> ApplyReport
where
    E: ScriptExecutor + ?Sized,
{
    let mut outcomes: Vec<ScriptOutcome> = files
        .iter()
        .map(|file| ScriptOutcome {
            script: file.name(),
            path: file.path.clone(),
            state: ScriptState::Pending,
        })
        .collect();

    for outcome in outcomes.iter_mut() {
        tracing::info!(script = %outcome.script, "Running script");
        outcome.state = apply_script(executor, outcome, config.dry_run).await;

        match &outcome.state {
            ScriptState::Failed { error } => {
                tracing::error!(script = %outcome.script, error = %error, "Script failed");
                if !config.continue_on_error {
                    tracing::warn!("Stopping after failed script");
                    break;
                }
            }
            ScriptState::Applied { statements } => {
                tracing::info!(script = %outcome.script, statements, "Script applied");
            }
            _ => {}
        }
    }

    ApplyReport { outcomes }
}

async fn apply_script<E>(executor: &E, outcome: &ScriptOutcome, dry_run: bool) -> ScriptState
where
    E: ScriptExecutor + ?Sized,
{
    let statements = match fs::read_to_string(&outcome.path)
        .map_err(Error::from)
        .and_then(|text| split_statements(&text))
    {
        Ok(statements) => statements,
        Err(e) => return ScriptState::Failed { error: e.to_string() },
    };
    let count = statements.len();
    tracing::debug!(script = %outcome.script, statements = count, "Script parsed");

    if dry_run {
        for statement in &statements {
            tracing::info!(script = %outcome.script, sql = %statement, "Statement (dry run)");
        }
        return ScriptState::Parsed { statements: count };
    }

    if statements.is_empty() {
        return ScriptState::Applied { statements: 0 };
    }

    let executing = ScriptState::Executing { statements: count };
    tracing::debug!(script = %outcome.script, state = ?executing, "Executing batch");
    match executor.execute_batch(&statements).await {
        Ok(()) => ScriptState::Applied { statements: count },
        Err(e) => ScriptState::Failed { error: e.to_string() },
    }
}
