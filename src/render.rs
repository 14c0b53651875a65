use comfy_table::Table;

use crate::db_types::{Record, TableSchema};

pub const NO_RECORDS: &str = "No records found.";

/// Outer border and a rule under the header, no rules between rows.
const GRID: &str = "||--+-++|    ++++++";

/// Renders records as a bordered grid, columns in schema order. Missing
/// fields are left blank.
pub fn render(records: &[Record], schema: &TableSchema) -> String {
    if records.is_empty() {
        return NO_RECORDS.to_string();
    }

    let header = schema.column_names();
    let mut table = Table::new();
    table.load_preset(GRID).set_header(header.clone());
    for record in records {
        table.add_row(
            header
                .iter()
                .map(|column| record.get(*column).map(|v| v.to_string()).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    table.to_string()
}
