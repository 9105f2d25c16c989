use serde_json::Value;

// ── CellValue ─────────────────────────────────────────────────────────────────

/// Outcome of coercing one table cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    /// The cell holds a number (possibly `NaN`).
    Number(f64),
    /// The cell is null or blank.
    Missing,
    /// The cell holds something that is not a number.
    Invalid,
}

// ── CellProcessor ─────────────────────────────────────────────────────────────

/// Coerces raw table cells, whether read from CSV text or JSON, into the
/// types of the catalog and ledger columns.
pub struct CellProcessor;

impl CellProcessor {
    /// Coerce a cell to a number.
    ///
    /// Handles:
    /// * `null`, blank string → [`NumericCell::Missing`]
    /// * JSON number          → its `f64` value
    /// * numeric string       → parsed `f64`; a single decimal comma is
    ///   accepted when the text has no dot (`"1,5"` → `1.5`)
    /// * anything else        → [`NumericCell::Invalid`]
    pub fn number(value: &Value) -> NumericCell {
        match value {
            Value::Null => NumericCell::Missing,
            Value::Number(n) => n.as_f64().map_or(NumericCell::Invalid, NumericCell::Number),
            Value::String(s) => Self::number_str(s),
            _ => NumericCell::Invalid,
        }
    }

    /// Coerce a cell to a non-negative integer count.
    ///
    /// Integral floats such as `3.0` (spreadsheet exports) are accepted.
    pub fn count(value: &Value) -> Option<u32> {
        if let Some(n) = value.as_u64() {
            return u32::try_from(n).ok();
        }
        match Self::number(value) {
            NumericCell::Number(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => {
                Some(f as u32)
            }
            _ => None,
        }
    }

    /// Render a cell as trimmed text.
    ///
    /// Numbers are rendered without a trailing `.0` so that numeric part
    /// codes read from JSON match their CSV spelling.
    pub fn text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_string()
                } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15) {
                    format!("{}", f as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    fn number_str(s: &str) -> NumericCell {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return NumericCell::Missing;
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return NumericCell::Number(f);
        }
        if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
            if let Ok(f) = trimmed.replace(',', ".").parse::<f64>() {
                return NumericCell::Number(f);
            }
        }
        NumericCell::Invalid
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_from_json_number() {
        assert_eq!(CellProcessor::number(&json!(2)), NumericCell::Number(2.0));
        assert_eq!(CellProcessor::number(&json!(1500.5)), NumericCell::Number(1500.5));
    }

    #[test]
    fn test_number_from_string() {
        assert_eq!(CellProcessor::number(&json!(" 1500 ")), NumericCell::Number(1500.0));
        assert_eq!(CellProcessor::number(&json!("-3.25")), NumericCell::Number(-3.25));
    }

    #[test]
    fn test_number_decimal_comma() {
        assert_eq!(CellProcessor::number(&json!("1,5")), NumericCell::Number(1.5));
        assert_eq!(CellProcessor::number(&json!("1.000,5")), NumericCell::Invalid);
    }

    #[test]
    fn test_number_nan_literal() {
        match CellProcessor::number(&json!("NaN")) {
            NumericCell::Number(f) => assert!(f.is_nan()),
            other => panic!("expected NaN number, got {other:?}"),
        }
    }

    #[test]
    fn test_number_missing() {
        assert_eq!(CellProcessor::number(&Value::Null), NumericCell::Missing);
        assert_eq!(CellProcessor::number(&json!("   ")), NumericCell::Missing);
    }

    #[test]
    fn test_number_invalid() {
        assert_eq!(CellProcessor::number(&json!("dois")), NumericCell::Invalid);
        assert_eq!(CellProcessor::number(&json!(true)), NumericCell::Invalid);
        assert_eq!(CellProcessor::number(&json!([1])), NumericCell::Invalid);
    }

    #[test]
    fn test_count() {
        assert_eq!(CellProcessor::count(&json!(3)), Some(3));
        assert_eq!(CellProcessor::count(&json!("4")), Some(4));
        assert_eq!(CellProcessor::count(&json!(2.0)), Some(2));
        assert_eq!(CellProcessor::count(&json!(0)), Some(0));
    }

    #[test]
    fn test_count_rejects_negative_fractional_and_blank() {
        assert_eq!(CellProcessor::count(&json!(-1)), None);
        assert_eq!(CellProcessor::count(&json!(2.5)), None);
        assert_eq!(CellProcessor::count(&json!("")), None);
        assert_eq!(CellProcessor::count(&Value::Null), None);
    }

    #[test]
    fn test_text() {
        assert_eq!(CellProcessor::text(&json!("  Faca  ")), "Faca");
        assert_eq!(CellProcessor::text(&json!(12345)), "12345");
        assert_eq!(CellProcessor::text(&json!(12345.0)), "12345");
        assert_eq!(CellProcessor::text(&json!(1.5)), "1.5");
        assert_eq!(CellProcessor::text(&Value::Null), "");
    }
}
