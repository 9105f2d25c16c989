use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Width of a usage-range bucket, in hectares, unless configured otherwise.
pub const DEFAULT_BUCKET_WIDTH: u64 = 1000;

/// Catalog rule deciding whether a part's capacity scales with line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProportionRule {
    /// Fixed quantity per chassis, whatever its line count.
    PerUnit,
    /// Quantity per line, multiplied by the chassis's line count.
    PerLine,
}

impl ProportionRule {
    /// Parse a catalog proportion label.
    ///
    /// Returns `None` for labels that are not recognised; callers treat those
    /// as [`ProportionRule::PerUnit`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "linha" | "perline" | "per line" | "line" => Some(ProportionRule::PerLine),
            "unidade" | "perunit" | "per unit" | "unit" | "chassi" => {
                Some(ProportionRule::PerUnit)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProportionRule::PerUnit => "PerUnit",
            ProportionRule::PerLine => "PerLine",
        }
    }
}

impl fmt::Display for ProportionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the characteristics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCatalogEntry {
    /// Unique part code.
    pub code: String,
    /// Part family used for grouping in summaries.
    pub family: String,
    pub proportion_rule: ProportionRule,
    /// Quantity per proportion unit. `None` when the cell was blank, in which
    /// case no capacity can be resolved for the part.
    pub quantity_per_proportion: Option<f64>,
    pub description: String,
}

/// Read-only part reference data keyed by code.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    entries: Vec<PartCatalogEntry>,
    index: HashMap<String, usize>,
}

impl PartCatalog {
    /// Build a catalog from loaded entries. The first entry for a code wins;
    /// later duplicates are logged and ignored.
    pub fn new(entries: Vec<PartCatalogEntry>) -> Self {
        let mut kept: Vec<PartCatalogEntry> = Vec::with_capacity(entries.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(entries.len());

        for entry in entries {
            if index.contains_key(&entry.code) {
                warn!("Duplicate catalog code {} ignored", entry.code);
                continue;
            }
            index.insert(entry.code.clone(), kept.len());
            kept.push(entry);
        }

        Self {
            entries: kept,
            index,
        }
    }

    pub fn get(&self, code: &str) -> Option<&PartCatalogEntry> {
        self.index.get(code).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartCatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One observation from the chassis usage table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub chassis_id: String,
    /// Part code; may be absent from the catalog.
    pub code: String,
    /// Number of lines on the chassis.
    pub line_count: u32,
    /// Accumulated hectares at observation time. `None` when the cell was
    /// blank.
    pub cumulative_usage: Option<f64>,
    pub quantity_consumed: f64,
}

impl UsageRecord {
    /// The usage reading when it is a finite number.
    pub fn valid_usage(&self) -> Option<f64> {
        self.cumulative_usage.filter(|u| u.is_finite())
    }
}

/// All usage observations of a run.
#[derive(Debug, Clone, Default)]
pub struct UsageLedger {
    pub records: Vec<UsageRecord>,
}

impl UsageLedger {
    pub fn new(records: Vec<UsageRecord>) -> Self {
        Self { records }
    }

    /// Highest finite usage reading in the ledger.
    pub fn max_usage(&self) -> Option<f64> {
        self.records
            .iter()
            .filter_map(UsageRecord::valid_usage)
            .fold(None, |acc: Option<f64>, u| Some(acc.map_or(u, |m| m.max(u))))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Half-open usage interval `[start, start + width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageRangeBucket {
    pub start: u64,
    pub width: u64,
}

impl UsageRangeBucket {
    pub fn new(start: u64, width: u64) -> Self {
        Self { start, width }
    }

    /// Exclusive upper bound, saturating at `u64::MAX`.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.width)
    }

    pub fn contains(&self, usage: f64) -> bool {
        usage >= self.start as f64 && usage < self.end() as f64
    }

    /// Display label, e.g. `"1000 – 2000"`.
    pub fn label(&self) -> String {
        format!("{} – {}", self.start, self.end())
    }
}

impl fmt::Display for UsageRangeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for UsageRangeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Capacity of one chassis for one part.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFact {
    pub chassis_id: String,
    pub code: String,
    pub line_count: u32,
    pub quantity_per_chassis: f64,
}

/// One row of the consumption-rate report. Field order is the export column
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateReportRow {
    #[serde(rename = "Faixa hectare")]
    pub bucket: UsageRangeBucket,
    /// Distinct chassis observed in the bucket for this code.
    #[serde(rename = "Qtd chassi")]
    pub chassis_count: usize,
    #[serde(rename = "Família")]
    pub family: String,
    #[serde(rename = "Proporção")]
    pub proportion_rule: ProportionRule,
    #[serde(rename = "Qtd/proporção")]
    pub quantity_per_proportion: f64,
    #[serde(rename = "Qtd máxima")]
    pub max_quantity: f64,
    #[serde(rename = "Código")]
    pub code: String,
    #[serde(rename = "Descrição")]
    pub description: String,
    #[serde(rename = "Qtd consumido")]
    pub consumed_quantity: f64,
    /// `consumed_quantity / max_quantity`, rounded to 2 decimals.
    #[serde(rename = "% Consumo")]
    pub consumption_ratio: f64,
}

/// One row of the durability report. Field order is the export column order;
/// the skipped fields are kept for callers but not exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurabilityReportRow {
    #[serde(rename = "Qtd chassi")]
    pub chassis_count: usize,
    #[serde(rename = "Família")]
    pub family: String,
    #[serde(rename = "Proporção")]
    pub proportion_rule: ProportionRule,
    #[serde(rename = "Qtd/proporção")]
    pub quantity_per_proportion: f64,
    #[serde(rename = "Qtd máxima")]
    pub max_quantity: f64,
    #[serde(rename = "Código")]
    pub code: String,
    #[serde(rename = "Descrição")]
    pub description: String,
    #[serde(rename = "Qtd consumido")]
    pub consumed_quantity: f64,
    #[serde(rename = "% Consumo")]
    pub consumption_ratio: f64,
    /// `(accumulated_usage / ratio) / max_quantity` with the unrounded ratio.
    /// `None` when that quotient is not finite.
    #[serde(rename = "Consumo hectare")]
    pub usage_per_consumption_unit: Option<f64>,
    /// Sum over linked chassis of each chassis's highest usage reading.
    #[serde(skip)]
    pub accumulated_usage: f64,
    #[serde(skip)]
    pub total_line_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, family: &str) -> PartCatalogEntry {
        PartCatalogEntry {
            code: code.to_string(),
            family: family.to_string(),
            proportion_rule: ProportionRule::PerUnit,
            quantity_per_proportion: Some(1.0),
            description: String::new(),
        }
    }

    fn record(chassis: &str, usage: Option<f64>) -> UsageRecord {
        UsageRecord {
            chassis_id: chassis.to_string(),
            code: "A1".to_string(),
            line_count: 1,
            cumulative_usage: usage,
            quantity_consumed: 0.0,
        }
    }

    #[test]
    fn test_proportion_rule_from_label() {
        assert_eq!(ProportionRule::from_label("Linha"), Some(ProportionRule::PerLine));
        assert_eq!(ProportionRule::from_label(" PerLine "), Some(ProportionRule::PerLine));
        assert_eq!(ProportionRule::from_label("PerUnit"), Some(ProportionRule::PerUnit));
        assert_eq!(ProportionRule::from_label("Unidade"), Some(ProportionRule::PerUnit));
        assert_eq!(ProportionRule::from_label("kit"), None);
    }

    #[test]
    fn test_catalog_first_duplicate_wins() {
        let catalog = PartCatalog::new(vec![entry("A1", "F1"), entry("A1", "F2"), entry("B2", "F3")]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("A1").unwrap().family, "F1");
        assert_eq!(catalog.get("B2").unwrap().family, "F3");
        assert!(catalog.get("C3").is_none());
    }

    #[test]
    fn test_ledger_max_usage_ignores_missing_and_nan() {
        let ledger = UsageLedger::new(vec![
            record("C1", Some(500.0)),
            record("C1", None),
            record("C2", Some(f64::NAN)),
            record("C2", Some(1500.0)),
        ]);
        assert_eq!(ledger.max_usage(), Some(1500.0));
    }

    #[test]
    fn test_ledger_max_usage_empty() {
        assert_eq!(UsageLedger::default().max_usage(), None);
        let ledger = UsageLedger::new(vec![record("C1", None)]);
        assert_eq!(ledger.max_usage(), None);
    }

    #[test]
    fn test_bucket_bounds_and_label() {
        let bucket = UsageRangeBucket::new(1000, 1000);
        assert_eq!(bucket.end(), 2000);
        assert_eq!(bucket.label(), "1000 – 2000");
        assert!(bucket.contains(1000.0));
        assert!(bucket.contains(1999.99));
        assert!(!bucket.contains(2000.0));
        assert!(!bucket.contains(999.0));
    }

    #[test]
    fn test_bucket_end_saturates() {
        let bucket = UsageRangeBucket::new(u64::MAX - 10, 1000);
        assert_eq!(bucket.end(), u64::MAX);
    }

    #[test]
    fn test_bucket_serializes_as_label() {
        let json = serde_json::to_string(&UsageRangeBucket::new(0, 1000)).unwrap();
        assert_eq!(json, "\"0 – 1000\"");
    }

    #[test]
    fn test_durability_row_skips_internal_fields() {
        let row = DurabilityReportRow {
            chassis_count: 1,
            family: "F1".to_string(),
            proportion_rule: ProportionRule::PerUnit,
            quantity_per_proportion: 2.0,
            max_quantity: 2.0,
            code: "A1".to_string(),
            description: "Part A".to_string(),
            consumed_quantity: 2.0,
            consumption_ratio: 1.0,
            usage_per_consumption_unit: Some(750.0),
            accumulated_usage: 1500.0,
            total_line_count: 1,
        };
        let value = serde_json::to_value(&row).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 10);
        assert_eq!(obj["Consumo hectare"], serde_json::json!(750.0));
        assert_eq!(obj["Proporção"], serde_json::json!("PerUnit"));
    }
}
