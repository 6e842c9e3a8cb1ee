//! Type mapping from catalog type codes to SQL type declarations.
//!
//! Codes are PostgreSQL type OIDs. Domains and domain-typed columns are resolved
//! to their base type before they reach this module.

/// Rendering used for every code outside the known set.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

pub const BOOL: i32 = 16;
pub const INT8: i32 = 20;
pub const INT2: i32 = 21;
pub const INT4: i32 = 23;
pub const TEXT: i32 = 25;
pub const FLOAT4: i32 = 700;
pub const FLOAT8: i32 = 701;
pub const BPCHAR: i32 = 1042;
pub const VARCHAR: i32 = 1043;
pub const DATE: i32 = 1082;
pub const TIME: i32 = 1083;
pub const TIMESTAMP: i32 = 1114;
pub const TIMESTAMPTZ: i32 = 1184;
pub const NUMERIC: i32 = 1700;

/// Every code [`map_type`] renders as something other than [`UNKNOWN_TYPE`].
pub const KNOWN_CODES: [i32; 14] = [
    INT2, INT4, INT8, FLOAT4, FLOAT8, BPCHAR, VARCHAR, DATE, TIME, TIMESTAMP, BOOL, TEXT,
    NUMERIC, TIMESTAMPTZ,
];

/// Map a type code and declared length to a SQL type declaration.
///
/// The length only matters for character types; a non-positive length means
/// the column is unbounded and renders without a length.
pub fn map_type(code: i32, length: i32) -> String {
    match code {
        INT2 => "SMALLINT".to_string(),
        INT4 => "INTEGER".to_string(),
        INT8 => "BIGINT".to_string(),
        FLOAT4 => "FLOAT".to_string(),
        FLOAT8 => "DOUBLE PRECISION".to_string(),
        BPCHAR => with_length("CHAR", length),
        VARCHAR => with_length("VARCHAR", length),
        DATE => "DATE".to_string(),
        TIME => "TIME".to_string(),
        TIMESTAMP => "TIMESTAMP".to_string(),
        BOOL => "BOOLEAN".to_string(),
        TEXT => "TEXT".to_string(),
        NUMERIC => "NUMERIC".to_string(),
        TIMESTAMPTZ => "TIMESTAMP WITH TIME ZONE".to_string(),
        _ => UNKNOWN_TYPE.to_string(),
    }
}

/// Declared character length encoded in a PostgreSQL type modifier.
///
/// `atttypmod` stores the length plus the 4-byte varlena header, or -1 when
/// no length was declared.
pub fn declared_length(type_modifier: i32) -> i32 {
    if type_modifier >= 4 {
        type_modifier - 4
    } else {
        0
    }
}

fn with_length(name: &str, length: i32) -> String {
    if length > 0 {
        format!("{}({})", name, length)
    } else {
        name.to_string()
    }
}
