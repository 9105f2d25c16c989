//! Table loading for the characteristics and chassis usage tables.
//!
//! Reads CSV, JSON-array, JSON Lines or spreadsheet files into a column-named
//! [`RawTable`], checks the required columns and coerces each row into a
//! [`PartCatalogEntry`] or [`UsageRecord`].

use std::collections::HashMap;
use std::io::{BufRead, Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wear_core::data_processors::{CellProcessor, NumericCell};
use wear_core::models::{PartCatalog, PartCatalogEntry, ProportionRule, UsageLedger, UsageRecord};
use wear_core::{Result, WearError};

/// Name used for the characteristics table in errors and logs.
pub const CATALOG_TABLE: &str = "catalog";
/// Name used for the chassis usage table in errors and logs.
pub const LEDGER_TABLE: &str = "ledger";

/// Column headers of the input tables.
pub mod columns {
    pub const CODE: &str = "Código";
    pub const FAMILY: &str = "Família";
    pub const PROPORTION: &str = "Proporção";
    pub const QUANTITY_PER_PROPORTION: &str = "Qtd/proporção";
    pub const DESCRIPTION: &str = "Descrição";
    pub const CHASSIS: &str = "Chassi";
    pub const LINE: &str = "Linha";
    pub const HECTARE: &str = "Hectare";
    pub const CONSUMED: &str = "Qtd consumido";
}

static NULL: Value = Value::Null;

// ── RawTable ──────────────────────────────────────────────────────────────────

/// A loaded table: named columns and untyped cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = columns
            .into_iter()
            .map(|c| c.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Build a table from JSON objects. Columns appear in first-seen order;
    /// keys absent from an object read as null.
    pub fn from_records(name: impl Into<String>, records: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for record in &records {
            for key in record.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = vec![Value::Null; columns.len()];
                for (key, value) in record {
                    if let Some(&i) = positions.get(&key) {
                        row[i] = value;
                    }
                }
                row
            })
            .collect();

        Self::new(name, columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column`, or [`WearError::MissingColumn`].
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| WearError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }
}

// ── Reading files ─────────────────────────────────────────────────────────────

/// Read a table file, choosing the format from its extension
/// (`.csv`, `.json`, `.jsonl` / `.ndjson`, `.xlsx` / `.xlsm` / `.xls` / `.ods`).
pub fn read_table(path: &Path, name: &str) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let open = || {
        std::fs::File::open(path).map_err(|source| WearError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    };

    let table = match extension.as_str() {
        "csv" => read_csv(open()?, name)?,
        "json" => read_json(open()?, name)?,
        "jsonl" | "ndjson" => read_jsonl(std::io::BufReader::new(open()?), name),
        "xlsx" | "xlsm" | "xls" | "ods" => {
            let bytes = std::fs::read(path).map_err(|source| WearError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
            read_workbook(Cursor::new(bytes), name)?
        }
        _ => return Err(WearError::UnsupportedFormat(path.to_path_buf())),
    };

    debug!(
        "Loaded {} table from {}: {} rows, {} columns",
        name,
        path.display(),
        table.len(),
        table.columns().len()
    );

    Ok(table)
}

/// Read a CSV table with a header row. Every cell is kept as text.
pub fn read_csv<R: Read>(reader: R, name: &str) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row: Vec<Value> = record
            .iter()
            .map(|field| Value::String(field.to_string()))
            .collect();
        row.resize(columns.len(), Value::Null);
        rows.push(row);
    }

    Ok(RawTable::new(name, columns, rows))
}

/// Read a JSON array of row objects.
pub fn read_json<R: Read>(reader: R, name: &str) -> Result<RawTable> {
    let records: Vec<Map<String, Value>> = serde_json::from_reader(reader)?;
    Ok(RawTable::from_records(name, records))
}

/// Read JSON Lines, one row object per line. Blank lines and lines that are
/// not JSON objects are skipped.
pub fn read_jsonl<R: BufRead>(reader: R, name: &str) -> RawTable {
    let mut records: Vec<Map<String, Value>> = Vec::new();
    let mut skipped = 0usize;

    for line in reader.lines() {
        let Ok(line) = line else {
            skipped += 1;
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Map<String, Value>>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Skipping malformed {} line: {}", name, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!("{} table: {} lines skipped", name, skipped);
    }

    RawTable::from_records(name, records)
}

/// Read the first sheet of a spreadsheet workbook. The first row holds the
/// headers; empty cells read as null.
pub fn read_workbook<RS: Read + Seek + Clone>(reader: RS, name: &str) -> Result<RawTable> {
    let mut workbook = calamine::open_workbook_auto_from_rs(reader)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        debug!("{} workbook has no sheets", name);
        return Ok(RawTable::new(name, Vec::new(), Vec::new()));
    };
    let range = range?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();

    let rows = rows
        .map(|cells| {
            let mut row: Vec<Value> = cells.iter().map(workbook_cell).collect();
            row.resize(columns.len(), Value::Null);
            row
        })
        .collect();

    Ok(RawTable::new(name, columns, rows))
}

fn workbook_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => serde_json::Number::from_f64(dt.as_f64()).map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}

// ── Typed loaders ─────────────────────────────────────────────────────────────

/// Read and validate the characteristics table.
pub fn load_catalog(path: &Path) -> Result<PartCatalog> {
    parse_catalog(&read_table(path, CATALOG_TABLE)?)
}

/// Read and validate the chassis usage table.
pub fn load_ledger(path: &Path) -> Result<UsageLedger> {
    parse_ledger(&read_table(path, LEDGER_TABLE)?)
}

/// Convert a raw characteristics table into a [`PartCatalog`].
///
/// All required columns are checked before any row is read. Rows with a
/// blank code are skipped.
pub fn parse_catalog(table: &RawTable) -> Result<PartCatalog> {
    let code = table.column_index(columns::CODE)?;
    let family = table.column_index(columns::FAMILY)?;
    let proportion = table.column_index(columns::PROPORTION)?;
    let quantity = table.column_index(columns::QUANTITY_PER_PROPORTION)?;
    let description = table.column_index(columns::DESCRIPTION)?;

    let mut entries: Vec<PartCatalogEntry> = Vec::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let row_no = i + 1;
        let code_text = CellProcessor::text(cell(row, code));
        if code_text.is_empty() {
            debug!("{} row {}: blank code, skipped", table.name(), row_no);
            continue;
        }

        let label = CellProcessor::text(cell(row, proportion));
        let proportion_rule = ProportionRule::from_label(&label).unwrap_or_else(|| {
            if !label.is_empty() {
                warn!(
                    "{} row {}: unrecognised proportion \"{}\", treated as {}",
                    table.name(),
                    row_no,
                    label,
                    ProportionRule::PerUnit
                );
            }
            ProportionRule::PerUnit
        });

        let quantity_per_proportion = match CellProcessor::number(cell(row, quantity)) {
            NumericCell::Number(f) if !f.is_nan() => Some(f),
            NumericCell::Number(_) | NumericCell::Missing => None,
            NumericCell::Invalid => {
                return Err(invalid(table, columns::QUANTITY_PER_PROPORTION, row_no, cell(row, quantity)))
            }
        };

        entries.push(PartCatalogEntry {
            code: code_text,
            family: CellProcessor::text(cell(row, family)),
            proportion_rule,
            quantity_per_proportion,
            description: CellProcessor::text(cell(row, description)),
        });
    }

    Ok(PartCatalog::new(entries))
}

/// Convert a raw chassis usage table into a [`UsageLedger`].
///
/// All required columns are checked before any row is read. Rows with a
/// blank chassis or code are skipped; a blank `Qtd consumido` counts as zero
/// and a blank `Hectare` leaves the record without a usage reading.
pub fn parse_ledger(table: &RawTable) -> Result<UsageLedger> {
    let code = table.column_index(columns::CODE)?;
    let chassis = table.column_index(columns::CHASSIS)?;
    let line = table.column_index(columns::LINE)?;
    let hectare = table.column_index(columns::HECTARE)?;
    let consumed = table.column_index(columns::CONSUMED)?;

    let mut records: Vec<UsageRecord> = Vec::with_capacity(table.len());
    let mut skipped = 0usize;

    for (i, row) in table.rows().iter().enumerate() {
        let row_no = i + 1;
        let chassis_id = CellProcessor::text(cell(row, chassis));
        let code_text = CellProcessor::text(cell(row, code));
        if chassis_id.is_empty() || code_text.is_empty() {
            skipped += 1;
            continue;
        }

        let line_count = CellProcessor::count(cell(row, line))
            .ok_or_else(|| invalid(table, columns::LINE, row_no, cell(row, line)))?;

        let cumulative_usage = match CellProcessor::number(cell(row, hectare)) {
            NumericCell::Number(f) => Some(f),
            NumericCell::Missing => None,
            NumericCell::Invalid => {
                return Err(invalid(table, columns::HECTARE, row_no, cell(row, hectare)))
            }
        };

        let quantity_consumed = match CellProcessor::number(cell(row, consumed)) {
            NumericCell::Number(f) if !f.is_nan() => f,
            NumericCell::Number(_) | NumericCell::Missing => 0.0,
            NumericCell::Invalid => {
                return Err(invalid(table, columns::CONSUMED, row_no, cell(row, consumed)))
            }
        };

        records.push(UsageRecord {
            chassis_id,
            code: code_text,
            line_count,
            cumulative_usage,
            quantity_consumed,
        });
    }

    if skipped > 0 {
        debug!(
            "{}: {} rows without chassis or code skipped",
            table.name(),
            skipped
        );
    }

    Ok(UsageLedger::new(records))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn cell(row: &[Value], index: usize) -> &Value {
    row.get(index).unwrap_or(&NULL)
}

fn invalid(table: &RawTable, column: &str, row: usize, value: &Value) -> WearError {
    WearError::InvalidType {
        table: table.name().to_string(),
        column: column.to_string(),
        row,
        value: value.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
