use crate::commands::{DbCommand, DbResult, help_text};
use crate::db_types::{ID_COLUMN, Predicate, Record, TableSchema, Value};
use crate::error::{DbError, Result};
use crate::parser::Condition;
use crate::records;
use crate::schema::SchemaStore;
use crate::storage::{Key, Storage, load_json, save_json};

pub const CANCELLED: &str = "Operation cancelled.";
pub const NO_MATCHES: &str = "No matching records found.";

/// Asked before destructive commands run.
pub trait Confirm {
    fn confirm(&mut self, action: &str) -> bool;
}

/// Answers every confirmation the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _action: &str) -> bool {
        self.0
    }
}

/// One user session: the storage collaborator plus the confirmation
/// step. Each command reloads what it needs and writes the full
/// replacement back only on success.
pub struct Database<S: Storage> {
    storage: S,
    confirm: Box<dyn Confirm>,
}

impl<S: Storage> Database<S> {
    pub fn new(storage: S, confirm: Box<dyn Confirm>) -> Self {
        Self { storage, confirm }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn schemas(&self) -> SchemaStore {
        load_json(&self.storage, &Key::Schema)
    }

    pub fn records(&self, table: &str) -> Vec<Record> {
        load_json(&self.storage, &Key::Table(table.to_string()))
    }

    fn save_schemas(&mut self, schemas: &SchemaStore) -> Result<()> {
        Ok(save_json(&mut self.storage, &Key::Schema, schemas)?)
    }

    fn save_records(&mut self, table: &str, records: &[Record]) -> Result<()> {
        Ok(save_json(
            &mut self.storage,
            &Key::Table(table.to_string()),
            records,
        )?)
    }

    pub fn execute(&mut self, cmd: DbCommand) -> Result<DbResult> {
        match cmd {
            DbCommand::Exit => Ok(DbResult::Exit),
            DbCommand::Help => Ok(DbResult::Message(help_text())),
            DbCommand::CreateTable { table, columns } => self.create_table(&table, &columns),
            DbCommand::ListTables => Ok(DbResult::Message(self.schemas().list_tables())),
            DbCommand::DropTable { table } => self.drop_table(&table),
            DbCommand::Info { table } => self.info(&table),
            DbCommand::Insert { table, values } => self.insert(&table, values),
            DbCommand::Select { table, condition } => self.select(&table, condition),
            DbCommand::Update {
                table,
                assignments,
                predicate,
            } => self.update(&table, assignments, predicate),
            DbCommand::Delete { table, predicate } => self.delete(&table, predicate),
        }
    }

    fn create_table(&mut self, table: &str, columns: &[String]) -> Result<DbResult> {
        let mut schemas = self.schemas();
        let message = schemas.create_table(table, columns)?;
        self.save_schemas(&schemas)?;
        log::info!("created table {}", table);
        Ok(DbResult::Message(message))
    }

    fn drop_table(&mut self, table: &str) -> Result<DbResult> {
        let mut schemas = self.schemas();
        schemas.require(table)?;
        if !self
            .confirm
            .confirm(&format!("drop table \"{}\" and all its records", table))
        {
            return Ok(DbResult::Message(CANCELLED.to_string()));
        }

        schemas.drop_table(table)?;
        self.save_schemas(&schemas)?;
        self.storage.remove(&Key::Table(table.to_string()))?;
        log::info!("dropped table {}", table);
        Ok(DbResult::Message(format!("Table \"{}\" dropped.", table)))
    }

    fn info(&self, table: &str) -> Result<DbResult> {
        let schemas = self.schemas();
        let schema = schemas.get_table_info(table)?;
        let count = self.records(table).len();
        Ok(DbResult::Message(format!(
            "Table: {}\nColumns: {}\nRecords: {}",
            schema.name,
            schema.describe_columns(),
            count
        )))
    }

    fn insert(&mut self, table: &str, values: Vec<Value>) -> Result<DbResult> {
        let schemas = self.schemas();
        schemas.require(table)?;
        let mut records = self.records(table);
        let inserted = records::insert(&schemas, table, &mut records, values)?;
        self.save_records(table, &records)?;
        log::info!("inserted {:?} into {}", inserted.record, table);
        Ok(DbResult::Message(inserted.message))
    }

    fn select(&self, table: &str, condition: Option<Condition>) -> Result<DbResult> {
        let schemas = self.schemas();
        let schema = schemas.require(table)?.clone();
        let stored = self.records(table);
        let records = match condition {
            None => records::select(&stored, None),
            Some(Condition::Equals(predicate)) => records::select(&stored, Some(&predicate)),
            Some(Condition::Compare { column, op, value }) => {
                records::filter_with_operator(&stored, &column, op, &value)
            }
        };
        Ok(DbResult::Rows { schema, records })
    }

    fn update(
        &mut self,
        table: &str,
        assignments: Predicate,
        predicate: Predicate,
    ) -> Result<DbResult> {
        let schemas = self.schemas();
        check_assignments(schemas.require(table)?, &assignments)?;

        let mut records = self.records(table);
        let count = records::update(&mut records, &assignments, &predicate);
        if count == 0 {
            return Ok(DbResult::Message(NO_MATCHES.to_string()));
        }
        self.save_records(table, &records)?;
        log::info!("updated {} record(s) in {}", count, table);
        Ok(DbResult::Message(format!(
            "Updated {} record(s) in table \"{}\".",
            count, table
        )))
    }

    fn delete(&mut self, table: &str, predicate: Predicate) -> Result<DbResult> {
        self.schemas().require(table)?;
        let action = if predicate.is_empty() {
            format!("delete every record in \"{}\"", table)
        } else {
            format!("delete matching records from \"{}\"", table)
        };
        if !self.confirm.confirm(&action) {
            return Ok(DbResult::Message(CANCELLED.to_string()));
        }

        let mut records = self.records(table);
        let count = records::delete(&mut records, &predicate);
        if count == 0 {
            return Ok(DbResult::Message(NO_MATCHES.to_string()));
        }
        self.save_records(table, &records)?;
        log::info!("deleted {} record(s) from {}", count, table);
        Ok(DbResult::Message(format!(
            "Deleted {} record(s) from table \"{}\".",
            count, table
        )))
    }
}

/// SET values must name a declared, non-ID column and match its type.
fn check_assignments(schema: &TableSchema, assignments: &Predicate) -> Result<()> {
    for (column, value) in assignments {
        if column == ID_COLUMN {
            return Err(DbError::Format(format!(
                "{} is assigned automatically and cannot be updated.",
                ID_COLUMN
            )));
        }
        let declared = schema.column(column).ok_or_else(|| DbError::UnknownColumn {
            table: schema.name.clone(),
            column: column.clone(),
        })?;
        if !declared.col_type.accepts(value) {
            return Err(DbError::TypeMismatch {
                column: column.clone(),
                expected: declared.col_type.to_string(),
                found: value.type_name().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::protocol::parse_command;
    use crate::storage::MemoryStore;

    fn db() -> Database<MemoryStore> {
        Database::new(MemoryStore::new(), Box::new(AutoConfirm(true)))
    }

    fn run<S: Storage>(db: &mut Database<S>, line: &str) -> Result<DbResult> {
        let cmd = parse_command(line)?.expect("non-blank command");
        db.execute(cmd)
    }

    fn message<S: Storage>(db: &mut Database<S>, line: &str) -> String {
        run(db, line).unwrap().to_string()
    }

    #[test]
    fn failed_create_persists_nothing() {
        let mut db = db();
        assert!(matches!(
            run(&mut db, "create_table users name"),
            Err(DbError::Format(_))
        ));
        assert!(!db.storage().contains(&Key::Schema));
    }

    #[test]
    fn insert_into_unknown_table_fails() {
        let mut db = db();
        assert!(matches!(
            run(&mut db, "insert into ghosts values (1)"),
            Err(DbError::UnknownTable(_))
        ));
    }

    #[test]
    fn update_checks_assignments_against_schema() {
        let mut db = db();
        message(&mut db, "create_table users name:str age:int");
        message(&mut db, "insert into users values (\"Ann\", 30)");

        assert!(matches!(
            run(&mut db, "update users set age = \"old\" where name = \"Ann\""),
            Err(DbError::TypeMismatch { .. })
        ));
        assert!(matches!(
            run(&mut db, "update users set height = 3 where name = \"Ann\""),
            Err(DbError::UnknownColumn { .. })
        ));
        assert!(matches!(
            run(&mut db, "update users set ID = 9 where name = \"Ann\""),
            Err(DbError::Format(_))
        ));
        assert_eq!(db.records("users")[0].get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn oversized_integer_is_rejected_by_every_column() {
        let mut db = db();
        message(&mut db, "create_table t s:str");
        match run(&mut db, "insert into t values (99999999999999999999)") {
            Err(DbError::TypeMismatch { found, .. }) => assert_eq!(found, "out-of-range int"),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
        message(&mut db, "insert into t values ('x')");
        assert!(matches!(
            run(&mut db, "update t set s = 99999999999999999999 where ID = 1"),
            Err(DbError::TypeMismatch { .. })
        ));
        assert_eq!(db.records("t").len(), 1);
    }

    #[test]
    fn insert_after_the_largest_id_fails_cleanly() {
        let mut db = db();
        message(&mut db, "create_table t a:int");
        db.storage
            .save(&Key::Table("t".into()), br#"[{"ID":9223372036854775807,"a":1}]"#)
            .unwrap();
        assert!(matches!(
            run(&mut db, "insert into t values (2)"),
            Err(DbError::IdsExhausted(_))
        ));
        assert_eq!(db.records("t").len(), 1);
    }

    #[test]
    fn update_without_matches_saves_nothing() {
        let mut db = db();
        message(&mut db, "create_table users name:str age:int");
        message(&mut db, "insert into users values (\"Ann\", 30)");
        let before = db.storage().load(&Key::Table("users".into())).unwrap();

        assert_eq!(
            message(&mut db, "update users set age = 1 where name = \"Nobody\""),
            NO_MATCHES
        );
        assert_eq!(
            db.storage().load(&Key::Table("users".into())).unwrap(),
            before
        );
    }

    #[test]
    fn declined_confirmation_keeps_data() {
        let mut db = Database::new(MemoryStore::new(), Box::new(AutoConfirm(false)));
        message(&mut db, "create_table users name:str");
        message(&mut db, "insert into users values (\"Ann\")");

        assert_eq!(message(&mut db, "delete from users"), CANCELLED);
        assert_eq!(message(&mut db, "drop_table users"), CANCELLED);
        assert_eq!(db.records("users").len(), 1);
        assert!(db.schemas().contains("users"));
    }

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Confirm for Recorder {
        fn confirm(&mut self, action: &str) -> bool {
            self.0.borrow_mut().push(action.to_string());
            true
        }
    }

    #[test]
    fn confirmation_is_asked_only_after_checks_pass() {
        let asked = Rc::new(RefCell::new(Vec::new()));
        let mut db = Database::new(MemoryStore::new(), Box::new(Recorder(asked.clone())));
        assert!(run(&mut db, "drop_table ghosts").is_err());
        assert!(run(&mut db, "delete from ghosts where ID = 1").is_err());
        assert!(asked.borrow().is_empty());

        message(&mut db, "create_table users name:str");
        message(&mut db, "delete from users where ID = 1");
        assert_eq!(
            asked.borrow().as_slice(),
            ["delete matching records from \"users\"".to_string()]
        );
    }

    #[test]
    fn drop_table_discards_records_document() {
        let mut db = db();
        message(&mut db, "create_table users name:str");
        message(&mut db, "insert into users values (\"Ann\")");
        assert!(db.storage().contains(&Key::Table("users".into())));

        assert_eq!(message(&mut db, "drop_table users"), "Table \"users\" dropped.");
        assert!(!db.storage().contains(&Key::Table("users".into())));
        assert_eq!(message(&mut db, "list_tables"), "No tables in the database.");
    }

    #[test]
    fn info_reports_columns_and_count() {
        let mut db = db();
        message(&mut db, "create_table users name:str active:bool");
        message(&mut db, "insert into users values (\"Ann\", true)");
        assert_eq!(
            message(&mut db, "info users"),
            "Table: users\nColumns: ID:int, name:str, active:bool\nRecords: 1"
        );
    }

    #[test]
    fn select_with_comparison_operator() {
        let mut db = db();
        message(&mut db, "create_table users name:str age:int");
        for (name, age) in [("Ann", 30), ("Bob", 17), ("Cid", 45)] {
            message(
                &mut db,
                &format!("insert into users values (\"{}\", {})", name, age),
            );
        }
        match run(&mut db, "select from users where age >= 30").unwrap() {
            DbResult::Rows { records, .. } => {
                let ids: Vec<_> = records.iter().map(|r| r["ID"].clone()).collect();
                assert_eq!(ids, vec![Value::Int(1), Value::Int(3)]);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }
}
