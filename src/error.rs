use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Table \"{0}\" already exists.")]
    DuplicateTable(String),

    #[error("Table \"{0}\" does not exist.")]
    UnknownTable(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Invalid type: {found}. Valid types: int, str, bool")]
    InvalidType { found: String },

    #[error("Expected {expected} values, got {got}.")]
    Arity { expected: usize, got: usize },

    #[error("Invalid type for column {column}: expected {expected}, got {found}.")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Column \"{column}\" does not exist in table \"{table}\".")]
    UnknownColumn { table: String, column: String },

    #[error("Table \"{0}\" has no IDs left to assign.")]
    IdsExhausted(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    UnknownCommand(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("StorageError - I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("StorageError - cannot encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
