//! Writing report rows as CSV, JSON or an xlsx workbook.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use wear_core::models::{DurabilityReportRow, RateReportRow};
use wear_core::{Result, WearError};

use crate::analysis::ReportSet;

/// Column headers of the consumption-rate report, in order.
pub const RATE_COLUMNS: [&str; 10] = [
    "Faixa hectare",
    "Qtd chassi",
    "Família",
    "Proporção",
    "Qtd/proporção",
    "Qtd máxima",
    "Código",
    "Descrição",
    "Qtd consumido",
    "% Consumo",
];

/// Column headers of the durability report, in order.
pub const DURABILITY_COLUMNS: [&str; 10] = [
    "Qtd chassi",
    "Família",
    "Proporção",
    "Qtd/proporção",
    "Qtd máxima",
    "Código",
    "Descrição",
    "Qtd consumido",
    "% Consumo",
    "Consumo hectare",
];

const RATE_REPORT_STEM: &str = "Taxa consumo";
const DURABILITY_REPORT_STEM: &str = "Durabilidade";

/// Output encoding of the report files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
    /// One worksheet named after the report.
    Xlsx,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = WearError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            "xlsx" => Ok(ReportFormat::Xlsx),
            other => Err(WearError::Config(format!("unknown report format '{}'", other))),
        }
    }
}

/// File name of the rate report, e.g. `Taxa consumo.csv`.
pub fn rate_report_file_name(format: ReportFormat) -> String {
    format!("{}.{}", RATE_REPORT_STEM, format.extension())
}

/// File name of the durability report, e.g. `Durabilidade.csv`.
pub fn durability_report_file_name(format: ReportFormat) -> String {
    format!("{}.{}", DURABILITY_REPORT_STEM, format.extension())
}

pub fn write_rate_report<W: Write>(writer: W, rows: &[RateReportRow], format: ReportFormat) -> Result<()> {
    write_rows(writer, RATE_REPORT_STEM, &RATE_COLUMNS, rows, format)
}

pub fn write_durability_report<W: Write>(
    writer: W,
    rows: &[DurabilityReportRow],
    format: ReportFormat,
) -> Result<()> {
    write_rows(writer, DURABILITY_REPORT_STEM, &DURABILITY_COLUMNS, rows, format)
}

/// Write both reports of `reports` into `dir`, returning the rate and
/// durability file paths.
pub fn write_reports(dir: &Path, reports: &ReportSet, format: ReportFormat) -> Result<(PathBuf, PathBuf)> {
    let rate_path = dir.join(rate_report_file_name(format));
    let durability_path = dir.join(durability_report_file_name(format));

    write_rate_report(create(&rate_path)?, &reports.rate_rows, format)?;
    write_durability_report(create(&durability_path)?, &reports.durability_rows, format)?;

    info!(
        "Wrote {} rate rows to {} and {} durability rows to {}",
        reports.rate_rows.len(),
        rate_path.display(),
        reports.durability_rows.len(),
        durability_path.display()
    );

    Ok((rate_path, durability_path))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WearError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// The header row is written explicitly so that an empty report still
/// carries its columns.
fn write_rows<W: Write, T: Serialize>(
    writer: W,
    sheet: &str,
    columns: &[&str],
    rows: &[T],
    format: ReportFormat,
) -> Result<()> {
    match format {
        ReportFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
            csv_writer.write_record(columns)?;
            for row in rows {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
        }
        ReportFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        ReportFormat::Xlsx => {
            let mut writer = writer;
            writer.write_all(&workbook_bytes(sheet, columns, rows)?)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Lay the rows out on a single worksheet, numbers as numeric cells and
/// missing values as empty cells.
fn workbook_bytes<T: Serialize>(sheet: &str, columns: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    for (col, header) in columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let row_no = i as u32 + 1;
        let Value::Object(fields) = serde_json::to_value(row)? else {
            continue;
        };
        for (col, header) in columns.iter().enumerate() {
            let col = col as u16;
            match fields.get(*header) {
                Some(Value::Number(n)) => {
                    if let Some(f) = n.as_f64() {
                        worksheet.write_number(row_no, col, f)?;
                    }
                }
                Some(Value::String(text)) => {
                    worksheet.write_string(row_no, col, text.as_str())?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_no, col, *b)?;
                }
                _ => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_workbook;
    use serde_json::json;
    use tempfile::TempDir;
    use wear_core::models::{ProportionRule, UsageRangeBucket};

    fn rate_row() -> RateReportRow {
        RateReportRow {
            bucket: UsageRangeBucket::new(1000, 1000),
            chassis_count: 1,
            family: "F1".to_string(),
            proportion_rule: ProportionRule::PerLine,
            quantity_per_proportion: 2.0,
            max_quantity: 4.0,
            code: "A1".to_string(),
            description: "Part A".to_string(),
            consumed_quantity: 1.0,
            consumption_ratio: 0.25,
        }
    }

    fn durability_row(metric: Option<f64>) -> DurabilityReportRow {
        DurabilityReportRow {
            chassis_count: 1,
            family: "F1".to_string(),
            proportion_rule: ProportionRule::PerUnit,
            quantity_per_proportion: 2.0,
            max_quantity: 2.0,
            code: "A1".to_string(),
            description: "Part A".to_string(),
            consumed_quantity: 2.0,
            consumption_ratio: 1.0,
            usage_per_consumption_unit: metric,
            accumulated_usage: 1500.0,
            total_line_count: 1,
        }
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!(" JSON ".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("xlsx".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert!(matches!("xml".parse::<ReportFormat>(), Err(WearError::Config(_))));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(rate_report_file_name(ReportFormat::Csv), "Taxa consumo.csv");
        assert_eq!(durability_report_file_name(ReportFormat::Json), "Durabilidade.json");
        assert_eq!(rate_report_file_name(ReportFormat::Xlsx), "Taxa consumo.xlsx");
    }

    #[test]
    fn test_rate_csv_columns_and_values() {
        let mut buf = Vec::new();
        write_rate_report(&mut buf, &[rate_row()], ReportFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], RATE_COLUMNS.join(","));
        assert_eq!(lines[1], "1000 – 2000,1,F1,PerLine,2.0,4.0,A1,Part A,1.0,0.25");
    }

    #[test]
    fn test_empty_csv_keeps_header() {
        let mut buf = Vec::new();
        write_durability_report(&mut buf, &[], ReportFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), DURABILITY_COLUMNS.join(","));
    }

    #[test]
    fn test_durability_csv_blank_metric() {
        let mut buf = Vec::new();
        write_durability_report(&mut buf, &[durability_row(None)], ReportFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let last = text.lines().nth(1).unwrap();
        assert!(last.ends_with(",1.0,"), "unexpected row: {}", last);
    }

    #[test]
    fn test_durability_json_shape() {
        let mut buf = Vec::new();
        write_durability_report(&mut buf, &[durability_row(Some(750.0))], ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let rows = value.as_array().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Consumo hectare"], serde_json::json!(750.0));
        assert_eq!(rows[0]["Código"], serde_json::json!("A1"));
        assert!(rows[0].get("accumulated_usage").is_none());
    }

    #[test]
    fn test_write_reports_creates_both_files() {
        let dir = TempDir::new().unwrap();
        let reports = ReportSet {
            rate_rows: vec![rate_row()],
            durability_rows: vec![durability_row(Some(750.0))],
            ..Default::default()
        };

        let (rate_path, durability_path) = write_reports(dir.path(), &reports, ReportFormat::Csv).unwrap();

        assert_eq!(rate_path, dir.path().join("Taxa consumo.csv"));
        assert_eq!(durability_path, dir.path().join("Durabilidade.csv"));
        let rate_text = std::fs::read_to_string(&rate_path).unwrap();
        assert!(rate_text.starts_with("Faixa hectare,"));
        let durability_text = std::fs::read_to_string(&durability_path).unwrap();
        assert!(durability_text.contains("750.0"));
    }

    #[test]
    fn test_write_reports_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = write_reports(&missing, &ReportSet::default(), ReportFormat::Json).unwrap_err();
        assert!(matches!(err, WearError::FileWrite { .. }));
    }

    #[test]
    fn test_rate_xlsx_sheet() {
        let mut buf = Vec::new();
        write_rate_report(&mut buf, &[rate_row()], ReportFormat::Xlsx).unwrap();

        let table = read_workbook(std::io::Cursor::new(buf), "rate").unwrap();
        assert_eq!(table.columns(), &RATE_COLUMNS.map(str::to_string));
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row[0], json!("1000 – 2000"));
        assert_eq!(row[1], json!(1.0));
        assert_eq!(row[3], json!("PerLine"));
        assert_eq!(row[6], json!("A1"));
        assert_eq!(row[9], json!(0.25));
    }

    #[test]
    fn test_durability_xlsx_blank_metric() {
        let mut buf = Vec::new();
        write_durability_report(&mut buf, &[durability_row(None)], ReportFormat::Xlsx).unwrap();

        let table = read_workbook(std::io::Cursor::new(buf), "durability").unwrap();
        assert_eq!(table.columns(), &DURABILITY_COLUMNS.map(str::to_string));
        assert_eq!(table.rows()[0][8], json!(1.0));
        assert_eq!(table.rows()[0][9], Value::Null);
    }

    #[test]
    fn test_write_reports_xlsx_files() {
        let dir = TempDir::new().unwrap();
        let reports = ReportSet {
            rate_rows: vec![rate_row()],
            durability_rows: vec![durability_row(Some(750.0))],
            ..Default::default()
        };

        let (rate_path, durability_path) = write_reports(dir.path(), &reports, ReportFormat::Xlsx).unwrap();

        assert_eq!(rate_path, dir.path().join("Taxa consumo.xlsx"));
        let durability = crate::reader::read_table(&durability_path, "durability").unwrap();
        assert_eq!(durability.rows()[0][9], json!(750.0));
    }
}
