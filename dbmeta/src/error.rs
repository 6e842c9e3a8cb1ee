//! Error types for dbmeta

use thiserror::Error;

/// Result type for dbmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dbmeta
#[derive(Error, Debug)]
pub enum Error {
    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Schema analysis error: {0}")]
    SchemaAnalysisError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Process exit code for this error: 1 for usage errors, 2 for everything else
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::UsageError(_) => 1,
            _ => 2,
        }
    }

    /// Format error with its source chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Convert Serde JSON errors to dbmeta errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to dbmeta errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
