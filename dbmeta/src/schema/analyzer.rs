//! Catalog metadata reader
//!
//! This module reads domains, tables, columns, stored procedures and procedure
//! parameters from the system catalog and assembles them into a
//! [`CatalogSnapshot`].

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::typemap::{declared_length, map_type};
use crate::schema::types::{
    CatalogSnapshot, Column, Domain, ParameterDirection, ProcedureDefinition,
    ProcedureParameter, StoredProcedure, Table,
};

/// Read-only access to an engine's catalog
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// User-defined domains ordered by name
    async fn list_domains(&self) -> Result<Vec<Domain>>;

    /// Names of user tables, in a stable order
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of `table` in declared position order
    async fn list_columns(&self, table: &str) -> Result<Vec<Column>>;

    /// Procedures with a non-empty body, ordered by name
    async fn list_stored_procedures(&self) -> Result<Vec<StoredProcedure>>;

    /// Parameters of `procedure`, grouped by direction then by number
    async fn list_procedure_parameters(&self, procedure: &str) -> Result<Vec<ProcedureParameter>>;
}

/// Drives a [`MetadataReader`] to build a complete snapshot
pub struct SchemaAnalyzer<R> {
    reader: R,
}

impl<R: MetadataReader> SchemaAnalyzer<R> {
    /// Create a new schema analyzer
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read every section of the catalog.
    ///
    /// Queries run one after another and the first failure aborts the whole
    /// snapshot.
    pub async fn analyze(&self) -> Result<CatalogSnapshot> {
        let domains = self.reader.list_domains().await?;
        tracing::debug!(count = domains.len(), "Read domains");

        let mut tables = Vec::new();
        for name in self.reader.list_tables().await? {
            let columns = self.reader.list_columns(&name).await?;
            tracing::debug!(table = %name, columns = columns.len(), "Read table");
            tables.push(Table { name, columns });
        }

        let mut procedures = Vec::new();
        for procedure in self.reader.list_stored_procedures().await? {
            let parameters = self.reader.list_procedure_parameters(&procedure.name).await?;
            tracing::debug!(
                procedure = %procedure.name,
                parameters = parameters.len(),
                "Read stored procedure"
            );
            procedures.push(ProcedureDefinition {
                procedure,
                parameters,
            });
        }

        tracing::info!(
            domains = domains.len(),
            tables = tables.len(),
            procedures = procedures.len(),
            "Catalog snapshot complete"
        );

        Ok(CatalogSnapshot {
            domains,
            tables,
            procedures,
        })
    }
}

// Row types for catalog queries

#[derive(Debug, Clone, FromRow)]
pub struct DomainRow {
    pub name: String,
    pub type_code: i32,
    pub type_modifier: i32,
}

#[derive(Debug, Clone, FromRow)]
struct TableRow {
    name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ColumnRow {
    pub name: String,
    pub position: i32,
    pub type_code: i32,
    pub type_modifier: i32,
    pub not_null: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProcedureRow {
    pub name: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParameterRow {
    pub name: String,
    /// `proargmodes` entry: i, o, b, v or t
    pub direction: String,
    pub number: i32,
    pub type_code: i32,
    pub type_modifier: i32,
}

pub fn domains_from_rows(rows: Vec<DomainRow>) -> Vec<Domain> {
    rows.into_iter()
        .map(|row| Domain {
            name: row.name,
            data_type: map_type(row.type_code, declared_length(row.type_modifier)),
        })
        .collect()
}

/// Convert column rows, ordering them by declared position
pub fn columns_from_rows(mut rows: Vec<ColumnRow>) -> Vec<Column> {
    rows.sort_by_key(|row| row.position);
    rows.into_iter()
        .map(|row| Column {
            name: row.name,
            data_type: map_type(row.type_code, declared_length(row.type_modifier)),
            is_nullable: !row.not_null,
        })
        .collect()
}

/// Convert procedure rows, trimming bodies and dropping empty ones
pub fn procedures_from_rows(rows: Vec<ProcedureRow>) -> Vec<StoredProcedure> {
    rows.into_iter()
        .filter_map(|row| {
            let source = row.source?.trim().to_string();
            if row.name.is_empty() || source.is_empty() {
                return None;
            }
            Some(StoredProcedure {
                name: row.name,
                source,
            })
        })
        .collect()
}

/// Convert parameter rows, ordering them by direction and then by number
pub fn parameters_from_rows(rows: Vec<ParameterRow>) -> Vec<ProcedureParameter> {
    let mut parameters: Vec<_> = rows
        .into_iter()
        .map(|row| {
            let direction = ParameterDirection::from_mode(&row.direction);
            (direction, row)
        })
        .collect();
    parameters.sort_by_key(|(direction, row)| (*direction, row.number));

    parameters
        .into_iter()
        .map(|(direction, row)| ProcedureParameter {
            name: row.name,
            direction,
            data_type: map_type(row.type_code, declared_length(row.type_modifier)),
        })
        .collect()
}

fn catalog_error(what: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::SchemaAnalysisError(format!("Failed to read {}: {}", what, e))
}

/// PostgreSQL catalog reader
pub struct PostgresReader<'a> {
    pool: &'a PgPool,
    schema: String,
}

impl<'a> PostgresReader<'a> {
    pub fn new(connection: &'a DatabaseConnection, schema: &str) -> Self {
        Self {
            pool: connection.pool(),
            schema: schema.to_string(),
        }
    }
}

#[async_trait]
impl<'a> MetadataReader for PostgresReader<'a> {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        let sql = r#"
            SELECT
                t.typname::text AS name,
                t.typbasetype::int4 AS type_code,
                t.typtypmod AS type_modifier
            FROM pg_type t
            JOIN pg_namespace n ON n.oid = t.typnamespace
            WHERE t.typtype = 'd'
              AND n.nspname = $1
              AND t.typname NOT LIKE 'pg\_%'
            ORDER BY t.typname
        "#;

        let rows = sqlx::query_as::<_, DomainRow>(sql)
            .bind(&self.schema)
            .fetch_all(self.pool)
            .await
            .map_err(catalog_error("domains"))?;

        Ok(domains_from_rows(rows))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT c.relname::text AS name
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('r', 'p')
              AND n.nspname = $1
            ORDER BY c.relname
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(&self.schema)
            .fetch_all(self.pool)
            .await
            .map_err(catalog_error("tables"))?;

        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        // Domain-typed columns render their base type
        let sql = r#"
            SELECT
                a.attname::text AS name,
                a.attnum::int4 AS position,
                (CASE WHEN t.typtype = 'd' THEN t.typbasetype ELSE t.oid END)::int4 AS type_code,
                (CASE WHEN t.typtype = 'd' THEN t.typtypmod ELSE a.atttypmod END) AS type_modifier,
                a.attnotnull AS not_null
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_type t ON t.oid = a.atttypid
            WHERE n.nspname = $1
              AND c.relname = $2
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(catalog_error("columns"))?;

        Ok(columns_from_rows(rows))
    }

    async fn list_stored_procedures(&self) -> Result<Vec<StoredProcedure>> {
        // Overloads collapse to the oldest definition
        let sql = r#"
            SELECT DISTINCT ON (p.proname)
                p.proname::text AS name,
                p.prosrc AS source
            FROM pg_proc p
            JOIN pg_namespace n ON n.oid = p.pronamespace
            JOIN pg_language l ON l.oid = p.prolang
            WHERE n.nspname = $1
              AND p.prokind IN ('f', 'p')
              AND l.lanname NOT IN ('c', 'internal')
            ORDER BY p.proname, p.oid
        "#;

        let rows = sqlx::query_as::<_, ProcedureRow>(sql)
            .bind(&self.schema)
            .fetch_all(self.pool)
            .await
            .map_err(catalog_error("stored procedures"))?;

        Ok(procedures_from_rows(rows))
    }

    async fn list_procedure_parameters(&self, procedure: &str) -> Result<Vec<ProcedureParameter>> {
        let sql = r##"
            SELECT
                COALESCE(NULLIF(args.name, ''), '$' || args.number::text) AS name,
                args.mode::text AS direction,
                args.number::int4 AS number,
                (CASE WHEN t.typtype = 'd' THEN t.typbasetype ELSE t.oid END)::int4 AS type_code,
                (CASE WHEN t.typtype = 'd' THEN t.typtypmod ELSE -1 END) AS type_modifier
            FROM (
                SELECT p.oid
                FROM pg_proc p
                JOIN pg_namespace n ON n.oid = p.pronamespace
                JOIN pg_language l ON l.oid = p.prolang
                WHERE n.nspname = $1
                  AND p.proname = $2
                  AND p.prokind IN ('f', 'p')
                  AND l.lanname NOT IN ('c', 'internal')
                ORDER BY p.oid
                LIMIT 1
            ) target
            JOIN pg_proc p ON p.oid = target.oid
            CROSS JOIN LATERAL unnest(
                COALESCE(p.proallargtypes, p.proargtypes::oid[]),
                COALESCE(p.proargmodes, array_fill('i'::"char", ARRAY[p.pronargs::int4])),
                COALESCE(p.proargnames, array_fill(''::text, ARRAY[p.pronargs::int4]))
            ) WITH ORDINALITY AS args(type_oid, mode, name, number)
            JOIN pg_type t ON t.oid = args.type_oid
            ORDER BY
                CASE WHEN args.mode IN ('o', 't', 'b') THEN 1 ELSE 0 END,
                args.number
        "##;

        let rows = sqlx::query_as::<_, ParameterRow>(sql)
            .bind(&self.schema)
            .bind(procedure)
            .fetch_all(self.pool)
            .await
            .map_err(catalog_error("procedure parameters"))?;

        Ok(parameters_from_rows(rows))
    }
}
