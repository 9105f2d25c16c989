use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while loading tables and building the wear reports.
#[derive(Error, Debug)]
pub enum WearError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report file could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from an input table.
    #[error("Table {table} is missing required column \"{column}\"")]
    MissingColumn { table: String, column: String },

    /// A cell of a typed column could not be coerced to that type.
    #[error("Table {table}, row {row}: column \"{column}\" has invalid value {value}")]
    InvalidType {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    /// The input file extension is not one of the supported table formats.
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A spreadsheet workbook could not be opened or read.
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// A spreadsheet report could not be built.
    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
}

/// Convenience alias used throughout the wear crates.
pub type Result<T> = std::result::Result<T, WearError>;
