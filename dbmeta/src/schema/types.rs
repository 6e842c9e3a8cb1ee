//! Type definitions for catalog objects
//!
//! These are the portable records every metadata reader produces. They carry
//! rendered type declarations, never raw catalog layouts.

use serde::{Deserialize, Serialize};

/// A named, reusable type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub data_type: String,
}

impl Domain {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
        }
    }
}

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

impl Column {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }
}

/// A table and its columns in declared order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }
}

/// A stored procedure with a non-empty body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProcedure {
    pub name: String,
    pub source: String,
}

impl StoredProcedure {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
        }
    }
}

/// Parameter direction. The declaration order is the catalog's sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterDirection {
    In,
    Out,
}

impl ParameterDirection {
    /// Map a PostgreSQL `proargmodes` entry
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "o" | "t" | "b" => ParameterDirection::Out,
            _ => ParameterDirection::In,
        }
    }
}

/// A stored procedure parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureParameter {
    pub name: String,
    pub direction: ParameterDirection,
    pub data_type: String,
}

impl ProcedureParameter {
    pub fn new(name: &str, direction: ParameterDirection, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            direction,
            data_type: data_type.to_string(),
        }
    }

    pub fn is_out(&self) -> bool {
        self.direction == ParameterDirection::Out
    }
}

/// A procedure together with its ordered parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    pub procedure: StoredProcedure,
    pub parameters: Vec<ProcedureParameter>,
}

impl ProcedureDefinition {
    /// Parameters rendered in the `RETURNS (...)` clause
    pub fn out_parameters(&self) -> impl Iterator<Item = &ProcedureParameter> {
        self.parameters.iter().filter(|p| p.is_out())
    }
}

/// Everything one export run reads from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub domains: Vec<Domain>,
    pub tables: Vec<Table>,
    pub procedures: Vec<ProcedureDefinition>,
}
