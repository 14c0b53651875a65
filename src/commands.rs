use std::fmt;

use crate::db_types::{Predicate, Record, TableSchema, Value};
use crate::parser::Condition;
use crate::protocol::{
    USAGE_CREATE_TABLE, USAGE_DELETE, USAGE_DROP_TABLE, USAGE_INFO, USAGE_INSERT, USAGE_SELECT,
    USAGE_UPDATE,
};
use crate::render;

#[derive(Debug, Clone, PartialEq)]
pub enum DbCommand {
    Exit,
    Help,
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    ListTables,
    DropTable {
        table: String,
    },
    Info {
        table: String,
    },
    Insert {
        table: String,
        values: Vec<Value>,
    },
    Select {
        table: String,
        condition: Option<Condition>,
    },
    Update {
        table: String,
        assignments: Predicate,
        predicate: Predicate,
    },
    Delete {
        table: String,
        predicate: Predicate,
    },
}

impl DbCommand {
    /// Commands that write to storage when they succeed.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            DbCommand::CreateTable { .. }
                | DbCommand::DropTable { .. }
                | DbCommand::Insert { .. }
                | DbCommand::Update { .. }
                | DbCommand::Delete { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbResult {
    Exit,
    Message(String),
    Rows {
        schema: TableSchema,
        records: Vec<Record>,
    },
}

impl fmt::Display for DbResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbResult::Exit => f.write_str("Exiting..."),
            DbResult::Message(message) => f.write_str(message),
            DbResult::Rows { schema, records } => f.write_str(&render::render(records, schema)),
        }
    }
}

pub fn help_text() -> String {
    let lines = [
        "***Record operations***".to_string(),
        format!("  {:<72} add a record", USAGE_INSERT),
        format!("  {:<72} read records", USAGE_SELECT),
        format!("  {:<72} update records", USAGE_UPDATE),
        format!("  {:<72} delete records", USAGE_DELETE),
        format!("  {:<72} show table details", USAGE_INFO),
        String::new(),
        "***Table management***".to_string(),
        format!("  {:<72} create a table", USAGE_CREATE_TABLE),
        format!("  {:<72} list all tables", "list_tables"),
        format!("  {:<72} drop a table", USAGE_DROP_TABLE),
        String::new(),
        "***General***".to_string(),
        format!("  {:<72} leave the program", "exit"),
        format!("  {:<72} show this help", "help"),
        String::new(),
        "Column types: int, str, bool. Operators in select: =, !=, >, <, >=, <=".to_string(),
    ];
    lines.join("\n")
}
