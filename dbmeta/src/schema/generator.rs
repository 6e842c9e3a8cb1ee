//! DDL generator
//!
//! This module renders a [`CatalogSnapshot`] as a single DDL document. Every
//! renderer returns its own fragment; [`DdlGenerator::generate`] concatenates
//! them in section order: domains, tables, stored procedures.

use crate::schema::types::{CatalogSnapshot, Column, Domain, ProcedureDefinition, Table};

const BANNER_RULE: &str = "-- =======================================";

/// DDL document generator
#[derive(Debug, Default, Clone, Copy)]
pub struct DdlGenerator;

impl DdlGenerator {
    /// Create a new DDL generator
    pub fn new() -> Self {
        Self
    }

    /// Render the full document
    pub fn generate(&self, snapshot: &CatalogSnapshot) -> String {
        let mut fragments = Vec::new();
        fragments.extend(snapshot.domains.iter().map(|d| self.render_domain(d)));
        fragments.extend(snapshot.tables.iter().map(|t| self.render_table(t)));
        fragments.extend(
            snapshot
                .procedures
                .iter()
                .filter_map(|p| self.render_procedure(p)),
        );

        fragments.concat()
    }

    /// Render a `CREATE DOMAIN` block
    pub fn render_domain(&self, domain: &Domain) -> String {
        let mut sql = banner("DOMAIN", &domain.name);
        sql.push_str(&format!("CREATE DOMAIN {} AS {};\n\n", domain.name, domain.data_type));
        sql
    }

    /// Render a `CREATE TABLE` block
    pub fn render_table(&self, table: &Table) -> String {
        let mut sql = banner("TABLE", &table.name);
        sql.push_str(&format!("CREATE TABLE {} (\n", table.name));

        let column_defs: Vec<String> = table.columns.iter().map(column_definition).collect();
        if !column_defs.is_empty() {
            sql.push_str(&column_defs.join(",\n"));
            sql.push('\n');
        }

        sql.push_str(");\n\n");
        sql
    }

    /// Render a `CREATE PROCEDURE` block.
    ///
    /// Only procedures with at least one OUT parameter have a returning
    /// signature; every other procedure yields `None`.
    pub fn render_procedure(&self, definition: &ProcedureDefinition) -> Option<String> {
        let returns: Vec<String> = definition
            .out_parameters()
            .map(|p| format!("    {} {}", p.name, p.data_type))
            .collect();
        if returns.is_empty() {
            return None;
        }

        let procedure = &definition.procedure;
        let mut sql = banner("STOREDPROCEDURE", &procedure.name);
        sql.push_str(&format!("CREATE PROCEDURE {}\n", procedure.name));
        sql.push_str("RETURNS (\n");
        sql.push_str(&returns.join(",\n"));
        sql.push_str("\n)\n");
        sql.push_str("AS\n");
        sql.push_str(&format!("{};\n\n", procedure.source));
        Some(sql)
    }
}

fn banner(kind: &str, name: &str) -> String {
    format!("{}\n-- {}: {}\n{}\n", BANNER_RULE, kind, name, BANNER_RULE)
}

fn column_definition(column: &Column) -> String {
    let not_null = if column.is_nullable { "" } else { " NOT NULL" };
    format!("    {} {}{}", column.name, column.data_type, not_null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ParameterDirection, ProcedureParameter, StoredProcedure};
    use pretty_assertions::assert_eq;

    fn customers() -> Table {
        let mut table = Table::new("customers");
        table.add_column(Column::new("id", "INTEGER").nullable(false));
        table.add_column(Column::new("name", "VARCHAR(100)").nullable(false));
        table.add_column(Column::new("born_on", "DATE"));
        table
    }

    fn procedure(out: usize, inputs: usize) -> ProcedureDefinition {
        let mut parameters = Vec::new();
        for i in 0..inputs {
            parameters.push(ProcedureParameter::new(&format!("in_{}", i), ParameterDirection::In, "INTEGER"));
        }
        for i in 0..out {
            parameters.push(ProcedureParameter::new(&format!("out_{}", i), ParameterDirection::Out, "BIGINT"));
        }
        ProcedureDefinition {
            procedure: StoredProcedure::new("order_totals", "BEGIN\n  SUSPEND;\nEND"),
            parameters,
        }
    }

    #[test]
    fn domain_block() {
        let sql = DdlGenerator::new().render_domain(&Domain::new("email", "VARCHAR(320)"));
        assert_eq!(
            sql,
            "-- =======================================\n\
             -- DOMAIN: email\n\
             -- =======================================\n\
             CREATE DOMAIN email AS VARCHAR(320);\n\n"
        );
    }

    #[test]
    fn table_block() {
        let sql = DdlGenerator::new().render_table(&customers());
        assert_eq!(
            sql,
            "-- =======================================\n\
             -- TABLE: customers\n\
             -- =======================================\n\
             CREATE TABLE customers (\n\
             \x20   id INTEGER NOT NULL,\n\
             \x20   name VARCHAR(100) NOT NULL,\n\
             \x20   born_on DATE\n\
             );\n\n"
        );
    }

    #[test]
    fn table_commas_separate_columns_only() {
        for n in 1..=5 {
            let mut table = Table::new("wide");
            for i in 0..n {
                table.add_column(Column::new(&format!("c{}", i), "INTEGER"));
            }
            let sql = DdlGenerator::new().render_table(&table);
            assert_eq!(sql.matches(',').count(), n - 1);
            assert!(!sql.contains(",\n);"));
        }
    }

    #[test]
    fn table_without_columns_still_closes() {
        let sql = DdlGenerator::new().render_table(&Table::new("empty"));
        assert!(sql.ends_with("CREATE TABLE empty (\n);\n\n"));
    }

    #[test]
    fn procedure_without_out_parameters_is_skipped() {
        assert_eq!(DdlGenerator::new().render_procedure(&procedure(0, 2)), None);
    }

    #[test]
    fn procedure_returns_lists_each_out_parameter() {
        let sql = DdlGenerator::new().render_procedure(&procedure(3, 2)).unwrap();
        assert_eq!(sql.matches("CREATE PROCEDURE").count(), 1);

        let returns = sql
            .split("RETURNS (\n")
            .nth(1)
            .and_then(|rest| rest.split("\n)\n").next())
            .unwrap();
        assert_eq!(returns.lines().count(), 3);
        assert!(!returns.ends_with(','));
        assert!(!sql.contains("in_0"));
        assert!(sql.ends_with("AS\nBEGIN\n  SUSPEND;\nEND;\n\n"));
    }

    #[test]
    fn sections_follow_fixed_order() {
        let snapshot = CatalogSnapshot {
            domains: vec![Domain::new("email", "VARCHAR(320)")],
            tables: vec![customers()],
            procedures: vec![procedure(1, 0), {
                let mut silent = procedure(0, 1);
                silent.procedure.name = "log_event".into();
                silent
            }],
        };

        let sql = DdlGenerator::new().generate(&snapshot);
        let domain = sql.find("CREATE DOMAIN").unwrap();
        let table = sql.find("CREATE TABLE").unwrap();
        let procedure = sql.find("CREATE PROCEDURE").unwrap();
        assert!(domain < table && table < procedure);
        assert!(!sql.contains("log_event"));
    }

    #[test]
    fn empty_snapshot_renders_empty_document() {
        assert_eq!(DdlGenerator::new().generate(&CatalogSnapshot::default()), "");
    }
}
