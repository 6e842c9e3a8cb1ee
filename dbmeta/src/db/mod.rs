//! Database module for dbmeta
//!
//! This module handles database connections, script parsing and migrations.

pub mod connection;
pub mod executor;
pub mod migrations;
pub mod parser;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::{ScriptExecutor, SqlExecutor};
pub use migrations::{apply_scripts, discover_scripts, ApplyReport, MigrationFile, ScriptOutcome, ScriptState};
pub use parser::split_statements;
