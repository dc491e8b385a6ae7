//! Core data model types for loading.
//!
//! A run is described by a [`TypeSpec`] (one [`FieldType`] code per header column) and a
//! schema-qualified [`TableName`]. Each data record is coerced into typed [`Value`]s, one per
//! non-skip [`ColumnSpec`].

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::LoadError;

/// Per-column type code.
///
/// Each variant has a one-character wire code, a value parser and (for most variants) a
/// schema type used when creating the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Column is read but neither loaded nor created (`' '`).
    Skip,
    /// 64-bit signed integer (`i`).
    Integer,
    /// Trimmed text (`s`).
    String,
    /// 64-bit float; comma decimal separators are accepted (`f`).
    Float,
    /// Reserved money code (`m`). Not supported for table creation or value coercion.
    Money,
    /// Calendar date (`d`).
    Date,
    /// Date and time with seconds (`t`).
    Timestamp,
    /// Date and time without seconds (`w`).
    TimestampWithoutSeconds,
}

impl FieldType {
    /// All codes, in wire-code order.
    pub const ALL: [FieldType; 8] = [
        FieldType::Skip,
        FieldType::Integer,
        FieldType::String,
        FieldType::Float,
        FieldType::Money,
        FieldType::Date,
        FieldType::Timestamp,
        FieldType::TimestampWithoutSeconds,
    ];

    /// Decode a one-character type code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            ' ' => Some(FieldType::Skip),
            'i' => Some(FieldType::Integer),
            's' => Some(FieldType::String),
            'f' => Some(FieldType::Float),
            'm' => Some(FieldType::Money),
            'd' => Some(FieldType::Date),
            't' => Some(FieldType::Timestamp),
            'w' => Some(FieldType::TimestampWithoutSeconds),
            _ => None,
        }
    }

    /// The one-character code for this type.
    pub fn code(self) -> char {
        match self {
            FieldType::Skip => ' ',
            FieldType::Integer => 'i',
            FieldType::String => 's',
            FieldType::Float => 'f',
            FieldType::Money => 'm',
            FieldType::Date => 'd',
            FieldType::Timestamp => 't',
            FieldType::TimestampWithoutSeconds => 'w',
        }
    }

    pub fn is_skip(self) -> bool {
        self == FieldType::Skip
    }

    /// Schema type used when creating the destination table.
    ///
    /// Returns `None` for [`FieldType::Skip`] (not part of the schema) and for
    /// [`FieldType::Money`] (no supported schema type).
    pub fn sql_type(self) -> Option<&'static str> {
        match self {
            FieldType::Integer => Some("bigint"),
            FieldType::String => Some("nvarchar(255)"),
            FieldType::Float => Some("float"),
            FieldType::Date => Some("date"),
            FieldType::Timestamp | FieldType::TimestampWithoutSeconds => Some("datetime2"),
            FieldType::Skip | FieldType::Money => None,
        }
    }

    /// Parse a raw field into a typed value.
    ///
    /// Text that is empty after trimming is [`Value::Null`] for every type. On failure the
    /// returned message describes why the text was rejected.
    pub fn parse(self, raw: &str, formats: &TemporalFormats) -> Result<Value, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            FieldType::String => Ok(Value::Utf8(trimmed.to_owned())),
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| e.to_string()),
            FieldType::Float => trimmed
                .replace(',', ".")
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|e| e.to_string()),
            FieldType::Date => NaiveDate::parse_from_str(trimmed, &formats.date)
                .map(Value::Date)
                .map_err(|e| format!("{e} (format '{}')", formats.date)),
            FieldType::Timestamp => NaiveDateTime::parse_from_str(trimmed, &formats.timestamp)
                .map(Value::Timestamp)
                .map_err(|e| format!("{e} (format '{}')", formats.timestamp)),
            FieldType::TimestampWithoutSeconds => {
                NaiveDateTime::parse_from_str(trimmed, &formats.timestamp_without_seconds)
                    .map(Value::Timestamp)
                    .map_err(|e| format!("{e} (format '{}')", formats.timestamp_without_seconds))
            }
            FieldType::Money => Err("money values are not supported".to_string()),
            FieldType::Skip => Err("skipped columns are never parsed".to_string()),
        }
    }
}

/// The run's type specification: one [`FieldType`] per header column, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSpec {
    fields: Vec<FieldType>,
}

impl TypeSpec {
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    /// Number of codes (equals the expected field count of every record).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Number of codes that participate in the destination row.
    pub fn loaded_len(&self) -> usize {
        self.fields.iter().filter(|f| !f.is_skip()).count()
    }
}

impl FromStr for TypeSpec {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(LoadError::config("type specification is empty"));
        }
        let fields = s
            .chars()
            .enumerate()
            .map(|(i, c)| {
                FieldType::from_code(c).ok_or_else(|| {
                    LoadError::config(format!("unknown format code '{c}' at position {}", i + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            write!(f, "{}", field.code())?;
        }
        Ok(())
    }
}

/// A header column paired with its type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Zero-based position in the source record.
    pub position: usize,
    pub field_type: FieldType,
    /// Header name, used as the destination column name unless resolved from the table.
    pub name: String,
}

impl ColumnSpec {
    pub fn new(position: usize, field_type: FieldType, name: impl Into<String>) -> Self {
        Self {
            position,
            field_type,
            name: name.into(),
        }
    }
}

/// A single typed value sent to the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time (no time zone).
    Timestamp(NaiveDateTime),
}

/// Coerced values for one record, one per non-skip column, in column order.
pub type TypedRow = Vec<Value>;

/// chrono format strings for date and timestamp columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalFormats {
    /// Format for `d` columns.
    pub date: String,
    /// Format for `t` columns.
    pub timestamp: String,
    /// Format for `w` columns.
    pub timestamp_without_seconds: String,
}

impl Default for TemporalFormats {
    fn default() -> Self {
        Self {
            date: "%d.%m.%Y".to_string(),
            timestamp: "%d.%m.%Y %H:%M:%S".to_string(),
            timestamp_without_seconds: "%d.%m.%Y %H:%M".to_string(),
        }
    }
}

/// Destination table identifier in `schema.name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl FromStr for TableName {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('.').collect::<Vec<_>>().as_slice() {
            [schema, name] if !schema.is_empty() && !name.is_empty() => {
                Ok(Self::new(*schema, *name))
            }
            _ => Err(LoadError::config(format!(
                "table name must be in schema.name format (got '{s}')"
            ))),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_round_trips() {
        for ft in FieldType::ALL {
            assert_eq!(FieldType::from_code(ft.code()), Some(ft));
        }
        assert_eq!(FieldType::from_code('x'), None);
    }

    #[test]
    fn empty_text_is_null_for_every_loaded_type() {
        let formats = TemporalFormats::default();
        for ft in FieldType::ALL.into_iter().filter(|f| !f.is_skip()) {
            assert_eq!(ft.parse("   ", &formats), Ok(Value::Null), "{ft:?}");
            assert_eq!(ft.parse("", &formats), Ok(Value::Null), "{ft:?}");
        }
    }

    #[test]
    fn parses_values_with_default_formats() {
        let formats = TemporalFormats::default();
        assert_eq!(FieldType::Integer.parse(" -42 ", &formats), Ok(Value::Int64(-42)));
        assert_eq!(FieldType::Float.parse("10,5", &formats), Ok(Value::Float64(10.5)));
        assert_eq!(FieldType::Float.parse("20.0", &formats), Ok(Value::Float64(20.0)));
        assert_eq!(
            FieldType::String.parse("  Alice ", &formats),
            Ok(Value::Utf8("Alice".to_string()))
        );

        let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
        assert_eq!(FieldType::Date.parse("14.03.2021", &formats), Ok(Value::Date(date)));
        assert_eq!(
            FieldType::Timestamp.parse("14.03.2021 15:09:26", &formats),
            Ok(Value::Timestamp(date.and_hms_opt(15, 9, 26).unwrap()))
        );
        assert_eq!(
            FieldType::TimestampWithoutSeconds.parse("14.03.2021 15:09", &formats),
            Ok(Value::Timestamp(date.and_hms_opt(15, 9, 0).unwrap()))
        );
    }

    #[test]
    fn custom_date_format_is_honoured() {
        let formats = TemporalFormats {
            date: "%Y-%m-%d".to_string(),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        assert_eq!(FieldType::Date.parse("2020-01-31", &formats), Ok(Value::Date(date)));
        assert!(FieldType::Date.parse("31.01.2020", &formats).is_err());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let formats = TemporalFormats::default();
        assert!(FieldType::Integer.parse("12a", &formats).is_err());
        assert!(FieldType::Integer.parse("1.5", &formats).is_err());
        assert!(FieldType::Float.parse("abc", &formats).is_err());
        assert!(FieldType::Date.parse("2021-03-14", &formats).is_err());
        assert!(FieldType::Timestamp.parse("14.03.2021 15:09", &formats).is_err());
        assert!(FieldType::Money.parse("12.50", &formats).is_err());
    }

    #[test]
    fn money_and_skip_have_no_schema_type() {
        assert_eq!(FieldType::Money.sql_type(), None);
        assert_eq!(FieldType::Skip.sql_type(), None);
        assert_eq!(FieldType::Integer.sql_type(), Some("bigint"));
        assert_eq!(FieldType::TimestampWithoutSeconds.sql_type(), Some("datetime2"));
    }

    #[test]
    fn type_spec_parses_and_displays() {
        let spec: TypeSpec = "is f".parse().unwrap();
        assert_eq!(spec.len(), 4);
        assert_eq!(spec.loaded_len(), 3);
        assert_eq!(spec.to_string(), "is f");

        let err = "isx".parse::<TypeSpec>().unwrap_err();
        assert!(err.to_string().contains("unknown format code 'x' at position 3"));
        assert!("".parse::<TypeSpec>().is_err());
    }

    #[test]
    fn table_name_requires_schema_and_name() {
        let t: TableName = "dbo.people".parse().unwrap();
        assert_eq!(t, TableName::new("dbo", "people"));
        assert_eq!(t.to_string(), "dbo.people");

        for bad in ["people", "a.b.c", ".people", "dbo."] {
            assert!(bad.parse::<TableName>().is_err(), "{bad}");
        }
    }
}
