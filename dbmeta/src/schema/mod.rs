//! Schema module for dbmeta
//!
//! This module handles catalog introspection, type mapping and DDL generation.

pub mod analyzer;
pub mod generator;
pub mod typemap;
pub mod types;

// Re-export key types
pub use analyzer::{MetadataReader, PostgresReader, SchemaAnalyzer};
pub use generator::DdlGenerator;
pub use typemap::map_type;
pub use types::{
    CatalogSnapshot, Column, Domain, ParameterDirection, ProcedureDefinition,
    ProcedureParameter, StoredProcedure, Table,
};
