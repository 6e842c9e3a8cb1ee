//! dbmeta: build, export and migrate PostgreSQL schemas
//!
//! dbmeta creates a database and seeds it from ordered SQL scripts, reads an
//! existing database's catalog back into a portable DDL document, and applies
//! incremental migration scripts to a live database.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

// Re-export main types for easier access
pub use config::{Config, MigrationsConfig};
pub use db::connection::DatabaseConnection;
pub use db::executor::{ScriptExecutor, SqlExecutor};
pub use db::migrations::{apply_scripts, discover_scripts, ApplyReport, MigrationFile, ScriptState};
pub use error::{Error, Result};
pub use schema::analyzer::{MetadataReader, PostgresReader, SchemaAnalyzer};
pub use schema::generator::DdlGenerator;
pub use schema::types::CatalogSnapshot;

/// The main client for running dbmeta operations.
///
/// Each operation opens its own connection and closes it before returning.
pub struct DbMetaClient {
    config: Config,
}

impl DbMetaClient {
    /// Create a new client from configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create database `name` on the configured server and run every script
    /// in `scripts_dir` against it
    pub async fn build_database(&self, name: &str, scripts_dir: &Path) -> Result<ApplyReport> {
        let files = discover_scripts(scripts_dir, &self.config.migrations.extension)?;

        tracing::info!(database = %name, "Creating database");
        let options =
            DatabaseConnection::create_database(&self.config.server, name, &self.config.database)
                .await?;
        let connection = DatabaseConnection::connect(options, &self.config.database).await?;

        let report = self.apply(&connection, &files, &self.build_migrations()).await;
        connection.close().await;
        Ok(report)
    }

    /// Migration settings for `build_database`, which always executes its scripts
    fn build_migrations(&self) -> MigrationsConfig {
        let mut migrations = self.config.migrations.clone();
        if migrations.dry_run {
            tracing::warn!("Ignoring dry_run for build-db; scripts are always executed");
            migrations.dry_run = false;
        }
        migrations
    }

    /// Write the DDL of the database at `connection_string` into `output_dir`
    pub async fn export_scripts(&self, connection_string: &str, output_dir: &Path) -> Result<PathBuf> {
        let connection =
            DatabaseConnection::connect_url(connection_string, &self.config.database).await?;

        let reader = PostgresReader::new(&connection, &self.config.database.schema);
        let result = export_with(reader, output_dir, &self.config.export.file_name).await;
        connection.close().await;
        result
    }

    /// Apply the scripts in `scripts_dir` to the database at `connection_string`
    pub async fn update_database(
        &self,
        connection_string: &str,
        scripts_dir: &Path,
    ) -> Result<ApplyReport> {
        let files = discover_scripts(scripts_dir, &self.config.migrations.extension)?;
        let connection =
            DatabaseConnection::connect_url(connection_string, &self.config.database).await?;

        let report = self
            .apply(&connection, &files, &self.config.migrations)
            .await;
        connection.close().await;
        Ok(report)
    }

    async fn apply(
        &self,
        connection: &DatabaseConnection,
        files: &[MigrationFile],
        migrations: &MigrationsConfig,
    ) -> ApplyReport {
        let executor = SqlExecutor::new(connection, migrations.transaction_per_script);
        let report = apply_scripts(&executor, files, migrations).await;
        tracing::info!(
            scripts = report.outcomes.len(),
            applied = report.applied().count(),
            failed = report.failed().count(),
            "Script run finished"
        );
        report
    }
}

/// Read the catalog through `reader` and write the DDL document.
///
/// Nothing is written unless every catalog section was read.
pub async fn export_with<R: MetadataReader>(
    reader: R,
    output_dir: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let snapshot = SchemaAnalyzer::new(reader).analyze().await?;
    write_document(&snapshot, output_dir, file_name)
}

/// Render `snapshot` and write it to `output_dir/file_name` as UTF-8
pub fn write_document(snapshot: &CatalogSnapshot, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let document = DdlGenerator::new().generate(snapshot);

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    fs::write(&path, document)?;

    tracing::info!(path = %path.display(), "DDL document written");
    Ok(path)
}
