//! SQL executor
//!
//! This module provides batch execution of parsed scripts.

use async_trait::async_trait;

use crate::db::connection::DatabaseConnection;
use crate::error::Result;

/// Something that can run a parsed script as one batch
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Execute `statements` in order; the first failing statement ends the batch
    async fn execute_batch(&self, statements: &[String]) -> Result<()>;
}

/// SQL executor for running scripts against a live connection
pub struct SqlExecutor<'a> {
    connection: &'a DatabaseConnection,
    transactional: bool,
}

impl<'a> SqlExecutor<'a> {
    /// Create a new SQL executor.
    ///
    /// With `transactional` set, each batch commits or rolls back as a unit.
    pub fn new(connection: &'a DatabaseConnection, transactional: bool) -> Self {
        Self {
            connection,
            transactional,
        }
    }
}

#[async_trait]
impl<'a> ScriptExecutor for SqlExecutor<'a> {
    async fn execute_batch(&self, statements: &[String]) -> Result<()> {
        if self.transactional {
            return self.connection.execute_in_transaction(statements).await;
        }

        for statement in statements {
            self.connection.execute(statement).await?;
        }
        Ok(())
    }
}
