//! Script application tests against a recording executor.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

use dbmeta::config::MigrationsConfig;
use dbmeta::{apply_scripts, discover_scripts, Error, Result, ScriptExecutor, ScriptState};

/// Records every batch and fails any batch containing `fail_marker`
struct RecordingExecutor {
    fail_marker: Option<&'static str>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            fail_marker: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_marker: Some(marker),
            ..Self::new()
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptExecutor for RecordingExecutor {
    async fn execute_batch(&self, statements: &[String]) -> Result<()> {
        self.batches.lock().unwrap().push(statements.to_vec());
        if let Some(marker) = self.fail_marker {
            if statements.iter().any(|s| s.contains(marker)) {
                return Err(Error::DatabaseError(format!("relation \"{}\" does not exist", marker)));
            }
        }
        Ok(())
    }
}

fn scripts(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

async fn states(
    dir: &Path,
    executor: &RecordingExecutor,
    config: &MigrationsConfig,
) -> Vec<ScriptState> {
    let files = discover_scripts(dir, "sql").unwrap();
    apply_scripts(executor, &files, config)
        .await
        .outcomes
        .into_iter()
        .map(|o| o.state)
        .collect()
}

fn three_scripts() -> TempDir {
    scripts(&[
        ("01_init.sql", "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n"),
        ("02_broken.sql", "INSERT INTO missing VALUES (1);\n"),
        ("03_seed.sql", "INSERT INTO a VALUES (1);\n"),
    ])
}

#[tokio::test]
async fn failed_script_does_not_stop_the_run() {
    let dir = three_scripts();
    let executor = RecordingExecutor::failing_on("missing");

    let states = states(dir.path(), &executor, &MigrationsConfig::default()).await;

    assert_eq!(states.len(), 3);
    assert_eq!(states[0], ScriptState::Applied { statements: 2 });
    assert!(matches!(&states[1], ScriptState::Failed { error } if error.contains("missing")));
    assert_eq!(states[2], ScriptState::Applied { statements: 1 });
    assert_eq!(executor.batches().len(), 3);
}

#[tokio::test]
async fn abort_leaves_later_scripts_pending() {
    let dir = three_scripts();
    let executor = RecordingExecutor::failing_on("missing");
    let config = MigrationsConfig {
        continue_on_error: false,
        ..Default::default()
    };

    let states = states(dir.path(), &executor, &config).await;

    assert!(matches!(states[1], ScriptState::Failed { .. }));
    assert_eq!(states[2], ScriptState::Pending);
    assert_eq!(executor.batches().len(), 2);
}

#[tokio::test]
async fn dry_run_never_executes() {
    let dir = three_scripts();
    let executor = RecordingExecutor::new();
    let config = MigrationsConfig {
        dry_run: true,
        ..Default::default()
    };

    let states = states(dir.path(), &executor, &config).await;

    assert_eq!(
        states,
        vec![
            ScriptState::Parsed { statements: 2 },
            ScriptState::Parsed { statements: 1 },
            ScriptState::Parsed { statements: 1 },
        ]
    );
    assert!(executor.batches().is_empty());
}

#[tokio::test]
async fn unparseable_script_fails_without_reaching_the_database() {
    let dir = scripts(&[
        ("01_bad.sql", "INSERT INTO a VALUES ('unterminated);\n"),
        ("02_good.sql", "SELECT 1;\n"),
    ]);
    let executor = RecordingExecutor::new();

    let states = states(dir.path(), &executor, &MigrationsConfig::default()).await;

    assert!(matches!(&states[0], ScriptState::Failed { error } if error.contains("line")));
    assert_eq!(states[1], ScriptState::Applied { statements: 1 });
    assert_eq!(executor.batches(), vec![vec!["SELECT 1".to_string()]]);
}

#[tokio::test]
async fn scripts_run_in_lexical_order_with_split_statements() {
    let dir = scripts(&[
        ("2_add.sql", "ALTER TABLE a ADD COLUMN name TEXT;"),
        ("10_seed.sql", "INSERT INTO a VALUES (10);"),
        (
            "1_init.sql",
            "SET TERM ^ ;\nCREATE PROCEDURE p AS $$ BEGIN NULL; END $$ LANGUAGE plpgsql^\nSET TERM ; ^\nCREATE TABLE a (id INT);",
        ),
    ]);
    let executor = RecordingExecutor::new();

    states(dir.path(), &executor, &MigrationsConfig::default()).await;

    assert_eq!(
        executor.batches(),
        vec![
            vec![
                "CREATE PROCEDURE p AS $$ BEGIN NULL; END $$ LANGUAGE plpgsql".to_string(),
                "CREATE TABLE a (id INT)".to_string(),
            ],
            vec!["INSERT INTO a VALUES (10)".to_string()],
            vec!["ALTER TABLE a ADD COLUMN name TEXT".to_string()],
        ]
    );
}

#[tokio::test]
async fn empty_script_is_applied_without_a_batch() {
    let dir = scripts(&[("01_empty.sql", "-- nothing yet\n")]);
    let executor = RecordingExecutor::new();

    let states = states(dir.path(), &executor, &MigrationsConfig::default()).await;

    assert_eq!(states, vec![ScriptState::Applied { statements: 0 }]);
    assert!(executor.batches().is_empty());
}
