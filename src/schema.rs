use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::db_types::{Column, ID_COLUMN, TableSchema};
use crate::error::DbError;

/// Table name to ordered column definitions, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaStore {
    tables: Vec<TableSchema>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Same as [`SchemaStore::get`] but a missing table is an error.
    pub fn require(&self, name: &str) -> Result<&TableSchema, DbError> {
        self.get(name)
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Registers a table from `name:type` specs, prepending `ID:int`.
    /// Returns the confirmation message.
    pub fn create_table<S: AsRef<str>>(
        &mut self,
        name: &str,
        column_specs: &[S],
    ) -> Result<String, DbError> {
        if self.contains(name) {
            return Err(DbError::DuplicateTable(name.to_string()));
        }
        validate_table_name(name)?;

        let mut columns = vec![Column::id()];
        let mut seen = HashSet::from([ID_COLUMN.to_string()]);
        for spec in column_specs {
            let column = Column::parse(spec.as_ref())?;
            if !seen.insert(column.name.clone()) {
                return Err(DbError::Format(format!(
                    "{}. Column \"{}\" is defined twice.",
                    spec.as_ref(),
                    column.name
                )));
            }
            columns.push(column);
        }

        let schema = TableSchema::new(name, columns);
        let message = format!(
            "Table \"{}\" created with columns: {}",
            name,
            schema.describe_columns()
        );
        self.tables.push(schema);
        Ok(message)
    }

    /// Removes the schema entry. The caller discards the records.
    pub fn drop_table(&mut self, name: &str) -> Result<TableSchema, DbError> {
        let index = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))?;
        Ok(self.tables.remove(index))
    }

    pub fn list_tables(&self) -> String {
        if self.tables.is_empty() {
            return "No tables in the database.".to_string();
        }
        self.tables
            .iter()
            .map(|t| format!("- {}", t.name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn get_table_info(&self, name: &str) -> Result<&TableSchema, DbError> {
        self.require(name)
    }
}

/// Table names double as storage keys, so they stay path-safe.
fn validate_table_name(name: &str) -> Result<(), DbError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DbError::Format(format!(
            "{}. Table names may only contain letters, digits, '_' and '-'.",
            name
        )))
    }
}

#[derive(Serialize)]
struct TableEntryRef<'a> {
    columns: &'a [Column],
}

#[derive(Deserialize)]
struct TableEntry {
    columns: Vec<Column>,
}

impl Serialize for SchemaStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.tables.iter().map(|t| {
            (
                &t.name,
                TableEntryRef {
                    columns: &t.columns,
                },
            )
        }))
    }
}

impl<'de> Deserialize<'de> for SchemaStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StoreVisitor;

        impl<'de> Visitor<'de> for StoreVisitor {
            type Value = SchemaStore;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of table names to column lists")
            }

            // map order is creation order
            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SchemaStore, A::Error> {
                let mut store = SchemaStore::new();
                while let Some((name, entry)) = map.next_entry::<String, TableEntry>()? {
                    store.tables.push(TableSchema::new(name, entry.columns));
                }
                Ok(store)
            }
        }

        deserializer.deserialize_map(StoreVisitor)
    }
}
