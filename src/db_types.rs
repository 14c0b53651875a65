use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Name of the implicit first column every table carries.
pub const ID_COLUMN: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    #[serde(rename = "str")]
    Text,
    Bool,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Text => "str",
            ColumnType::Bool => "bool",
        }
    }

    /// Exact runtime type match: a bool is never an int and vice versa.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (value, self),
            (Value::Int(_), ColumnType::Int)
                | (Value::Text(_), ColumnType::Text)
                | (Value::Bool(_), ColumnType::Bool)
        )
    }
}

impl FromStr for ColumnType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" => Ok(ColumnType::Int),
            "str" => Ok(ColumnType::Text),
            "bool" => Ok(ColumnType::Bool),
            other => Err(DbError::InvalidType {
                found: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar. `Null` and `Overflow` only ever come out of the value
/// parser; no column accepts them, so they are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    /// An integer literal outside the `i64` range, kept as written.
    #[serde(skip)]
    Overflow(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "str",
            Value::Overflow(_) => "out-of-range int",
        }
    }

    /// Native ordering between values of the same runtime type.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) | Value::Overflow(s) => f.write_str(s),
        }
    }
}

/// A column definition, persisted as `name:type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column {
    pub name: String,
    pub col_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
        }
    }

    pub fn id() -> Self {
        Self::new(ID_COLUMN, ColumnType::Int)
    }

    /// Parses an `identifier:type` spec; the type is case-insensitive.
    pub fn parse(spec: &str) -> Result<Self, DbError> {
        let Some((name, ty)) = spec.split_once(':') else {
            return Err(DbError::Format(format!(
                "{}. Expected 'name:type'.",
                spec
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Format(format!(
                "{}. Column name is empty.",
                spec
            )));
        }
        Ok(Self::new(name, ty.trim().parse()?))
    }
}

impl TryFrom<String> for Column {
    type Error = DbError;

    fn try_from(spec: String) -> Result<Self, Self::Error> {
        Column::parse(&spec)
    }
}

impl From<Column> for String {
    fn from(column: Column) -> Self {
        column.to_string()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.col_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    /// Always starts with `ID:int`.
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// The caller-supplied columns, i.e. everything after `ID`.
    pub fn data_columns(&self) -> &[Column] {
        match self.columns.first() {
            Some(first) if first.name == ID_COLUMN => &self.columns[1..],
            _ => &self.columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn describe_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One row: column name to value, always holding `ID`.
pub type Record = BTreeMap<String, Value>;

/// Column name to expected value; several keys are an implicit AND.
pub type Predicate = BTreeMap<String, Value>;

pub fn record_id(record: &Record) -> Option<i64> {
    match record.get(ID_COLUMN) {
        Some(Value::Int(id)) => Some(*id),
        _ => None,
    }
}
