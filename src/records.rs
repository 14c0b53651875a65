use crate::db_types::{ID_COLUMN, Predicate, Record, Value, record_id};
use crate::error::{DbError, Result};
use crate::parser::CompareOp;
use crate::schema::SchemaStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Inserted {
    pub record: Record,
    pub message: String,
}

/// Next ID is one past the largest stored ID, or 1 for an empty table.
/// `None` once the largest ID is `i64::MAX`.
pub fn next_id(records: &[Record]) -> Option<i64> {
    records
        .iter()
        .filter_map(record_id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
}

/// Validates `values` positionally against the table's non-ID columns
/// and appends the new record. Nothing is appended on error.
pub fn insert(
    schemas: &SchemaStore,
    table: &str,
    records: &mut Vec<Record>,
    values: Vec<Value>,
) -> Result<Inserted> {
    let schema = schemas.require(table)?;
    let columns = schema.data_columns();

    if values.len() != columns.len() {
        return Err(DbError::Arity {
            expected: columns.len(),
            got: values.len(),
        });
    }

    if let Some((column, value)) = columns
        .iter()
        .zip(&values)
        .find(|(column, value)| !column.col_type.accepts(value))
    {
        return Err(DbError::TypeMismatch {
            column: column.name.clone(),
            expected: column.col_type.to_string(),
            found: value.type_name().to_string(),
        });
    }

    let id = next_id(records).ok_or_else(|| DbError::IdsExhausted(table.to_string()))?;
    let mut record = Record::from([(ID_COLUMN.to_string(), Value::Int(id))]);
    record.extend(columns.iter().map(|c| c.name.clone()).zip(values));
    records.push(record.clone());

    Ok(Inserted {
        record,
        message: format!("Record with ID={} added to table \"{}\".", id, table),
    })
}

/// Every predicate key must be present and equal; an empty predicate
/// matches everything.
pub fn matches(record: &Record, predicate: &Predicate) -> bool {
    predicate
        .iter()
        .all(|(column, expected)| record.get(column) == Some(expected))
}

/// Returns owned copies, so the result never aliases stored records.
pub fn select(records: &[Record], predicate: Option<&Predicate>) -> Vec<Record> {
    match predicate {
        None => records.to_vec(),
        Some(predicate) => records
            .iter()
            .filter(|r| matches(r, predicate))
            .cloned()
            .collect(),
    }
}

/// Ad-hoc single column filter. Records missing the column, holding
/// null, or holding a type the operator cannot order are excluded.
pub fn filter_with_operator(
    records: &[Record],
    column: &str,
    op: CompareOp,
    value: &Value,
) -> Vec<Record> {
    records
        .iter()
        .filter(|r| match r.get(column) {
            None | Some(Value::Null) => false,
            Some(stored) => op.matches(stored, value),
        })
        .cloned()
        .collect()
}

/// Overwrites the assigned columns of every matching record in place.
/// An empty predicate matches nothing here. Values are not checked
/// against the schema.
pub fn update(records: &mut [Record], assignments: &Predicate, predicate: &Predicate) -> usize {
    if predicate.is_empty() {
        return 0;
    }
    let mut touched = 0;
    for record in records.iter_mut().filter(|r| matches(r, predicate)) {
        for (column, value) in assignments {
            record.insert(column.clone(), value.clone());
        }
        touched += 1;
    }
    touched
}

/// Removes matching records, keeping survivors in order. An empty
/// predicate truncates the table.
pub fn delete(records: &mut Vec<Record>, predicate: &Predicate) -> usize {
    let before = records.len();
    if predicate.is_empty() {
        records.clear();
    } else {
        records.retain(|r| !matches(r, predicate));
    }
    before - records.len()
}
