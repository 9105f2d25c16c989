//! Filtered views of the reports for interactive summaries.
//!
//! The filter and both summaries work on the exported rows only; nothing
//! here feeds back into the aggregation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use wear_core::calculations::round_report_value;
use wear_core::models::{DurabilityReportRow, ProportionRule, RateReportRow, UsageRangeBucket};

/// Catalog attributes shared by both report kinds.
pub trait PartRow {
    fn code(&self) -> &str;
    fn family(&self) -> &str;
    fn proportion_rule(&self) -> ProportionRule;
    fn description(&self) -> &str;

    /// `"<code> – <description>"`.
    fn part_label(&self) -> String {
        format!("{} – {}", self.code(), self.description())
    }
}

impl PartRow for RateReportRow {
    fn code(&self) -> &str {
        &self.code
    }
    fn family(&self) -> &str {
        &self.family
    }
    fn proportion_rule(&self) -> ProportionRule {
        self.proportion_rule
    }
    fn description(&self) -> &str {
        &self.description
    }
}

impl PartRow for DurabilityReportRow {
    fn code(&self) -> &str {
        &self.code
    }
    fn family(&self) -> &str {
        &self.family
    }
    fn proportion_rule(&self) -> ProportionRule {
        self.proportion_rule
    }
    fn description(&self) -> &str {
        &self.description
    }
}

// ── ReportFilter ──────────────────────────────────────────────────────────────

/// Row filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    /// Matched as a substring of the code, after trimming.
    pub code_substring: Option<String>,
    pub family: Option<String>,
    pub proportion_rule: Option<ProportionRule>,
}

impl ReportFilter {
    /// Build a filter, treating blank text as unset.
    pub fn new(code: Option<&str>, family: Option<&str>, proportion_rule: Option<ProportionRule>) -> Self {
        let non_blank = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            code_substring: non_blank(code),
            family: non_blank(family),
            proportion_rule,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_substring.is_none() && self.family.is_none() && self.proportion_rule.is_none()
    }

    pub fn matches<R: PartRow>(&self, row: &R) -> bool {
        if let Some(code) = &self.code_substring {
            if !row.code().contains(code.as_str()) {
                return false;
            }
        }
        if let Some(family) = &self.family {
            if row.family() != family.as_str() {
                return false;
            }
        }
        if let Some(rule) = self.proportion_rule {
            if row.proportion_rule() != rule {
                return false;
            }
        }
        true
    }

    /// Rows that pass the filter, in their original order.
    pub fn apply<'r, R: PartRow>(&self, rows: &'r [R]) -> Vec<&'r R> {
        rows.iter().filter(|row| self.matches(*row)).collect()
    }

    /// Summaries group by family until one family is selected.
    pub fn chart_axis(&self) -> ChartAxis {
        if self.family.is_some() {
            ChartAxis::Part
        } else {
            ChartAxis::Family
        }
    }
}

/// Distinct families present in `rows`, sorted.
pub fn family_options<R: PartRow>(rows: &[R]) -> Vec<String> {
    rows.iter()
        .map(|r| r.family())
        .filter(|f| !f.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct proportion rules present in `rows`, sorted.
pub fn proportion_options<R: PartRow>(rows: &[R]) -> Vec<ProportionRule> {
    rows.iter()
        .map(|r| r.proportion_rule())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ── Summaries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartAxis {
    Family,
    Part,
}

impl ChartAxis {
    fn label<R: PartRow>(self, row: &R) -> String {
        match self {
            ChartAxis::Family => row.family().to_string(),
            ChartAxis::Part => row.part_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    /// `None` when no row behind the point has the metric.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub bucket: UsageRangeBucket,
    pub label: String,
    /// Consumption ratio in percent.
    pub value: f64,
}

/// Hectares per consumption unit, per family (mean) or per part.
///
/// Points come out highest first; points without a value come last, in
/// input order for parts and by name for families.
pub fn durability_chart(rows: &[&DurabilityReportRow], axis: ChartAxis) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = match axis {
        ChartAxis::Part => rows
            .iter()
            .map(|row| ChartPoint {
                label: axis.label(*row),
                value: row.usage_per_consumption_unit,
            })
            .collect(),
        ChartAxis::Family => {
            let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
            for row in rows {
                let entry = sums.entry(row.family.as_str()).or_insert((0.0, 0));
                if let Some(value) = row.usage_per_consumption_unit {
                    entry.0 += value;
                    entry.1 += 1;
                }
            }
            sums.into_iter()
                .map(|(family, (sum, count))| ChartPoint {
                    label: family.to_string(),
                    value: (count > 0).then(|| round_report_value(sum / count as f64)),
                })
                .collect()
        }
    };

    // Stable sort keeps the input order among the valueless points.
    points.sort_by(|a, b| match (a.value, b.value) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    points
}

/// Consumption percentage per (bucket, label), ordered by bucket then label.
///
/// On the family axis, parts of the same family in the same bucket are
/// averaged.
pub fn rate_heatmap(rows: &[&RateReportRow], axis: ChartAxis) -> Vec<HeatmapCell> {
    let mut cells: BTreeMap<(UsageRangeBucket, String), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = cells.entry((row.bucket, axis.label(*row))).or_insert((0.0, 0));
        entry.0 += row.consumption_ratio * 100.0;
        entry.1 += 1;
    }

    cells
        .into_iter()
        .map(|((bucket, label), (sum, count))| HeatmapCell {
            bucket,
            label,
            value: round_report_value(sum / count as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(bucket_start: u64, code: &str, family: &str, ratio: f64) -> RateReportRow {
        RateReportRow {
            bucket: UsageRangeBucket::new(bucket_start, 1000),
            chassis_count: 1,
            family: family.to_string(),
            proportion_rule: ProportionRule::PerUnit,
            quantity_per_proportion: 1.0,
            max_quantity: 1.0,
            code: code.to_string(),
            description: format!("Desc {}", code),
            consumed_quantity: ratio,
            consumption_ratio: ratio,
        }
    }

    fn durability(code: &str, family: &str, rule: ProportionRule, metric: Option<f64>) -> DurabilityReportRow {
        DurabilityReportRow {
            chassis_count: 1,
            family: family.to_string(),
            proportion_rule: rule,
            quantity_per_proportion: 1.0,
            max_quantity: 1.0,
            code: code.to_string(),
            description: format!("Desc {}", code),
            consumed_quantity: 1.0,
            consumption_ratio: 1.0,
            usage_per_consumption_unit: metric,
            accumulated_usage: 0.0,
            total_line_count: 1,
        }
    }

    fn sample_durability() -> Vec<DurabilityReportRow> {
        vec![
            durability("A10", "Discos", ProportionRule::PerLine, Some(300.0)),
            durability("A11", "Discos", ProportionRule::PerUnit, Some(100.0)),
            durability("B20", "Correntes", ProportionRule::PerUnit, Some(500.0)),
            durability("C30", "Correntes", ProportionRule::PerUnit, None),
        ]
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let rows = sample_durability();
        let filter = ReportFilter::new(Some("  "), None, None);
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&rows).len(), 4);
        assert_eq!(filter.chart_axis(), ChartAxis::Family);
    }

    #[test]
    fn test_code_filter_is_trimmed_substring() {
        let rows = sample_durability();
        let filter = ReportFilter::new(Some(" A1 "), None, None);
        let codes: Vec<&str> = filter.apply(&rows).into_iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["A10", "A11"]);
    }

    #[test]
    fn test_family_and_proportion_are_exact() {
        let rows = sample_durability();
        let filter = ReportFilter::new(None, Some("Discos"), Some(ProportionRule::PerUnit));
        let codes: Vec<&str> = filter.apply(&rows).into_iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["A11"]);
        assert_eq!(filter.chart_axis(), ChartAxis::Part);

        let partial = ReportFilter::new(None, Some("Disco"), None);
        assert!(partial.apply(&rows).is_empty());
    }

    #[test]
    fn test_options_are_sorted_and_distinct() {
        let rows = sample_durability();
        assert_eq!(family_options(&rows), vec!["Correntes", "Discos"]);
        assert_eq!(
            proportion_options(&rows),
            vec![ProportionRule::PerUnit, ProportionRule::PerLine]
        );
    }

    #[test]
    fn test_durability_chart_by_family() {
        let rows = sample_durability();
        let selected: Vec<&DurabilityReportRow> = rows.iter().collect();
        let points = durability_chart(&selected, ChartAxis::Family);

        assert_eq!(
            points,
            vec![
                ChartPoint { label: "Correntes".to_string(), value: Some(500.0) },
                ChartPoint { label: "Discos".to_string(), value: Some(200.0) },
            ]
        );
    }

    #[test]
    fn test_durability_chart_by_part() {
        let rows = sample_durability();
        let filter = ReportFilter::new(None, Some("Discos"), None);
        let points = durability_chart(&filter.apply(&rows), filter.chart_axis());

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, "A10 – Desc A10");
        assert_eq!(points[0].value, Some(300.0));
        assert_eq!(points[1].label, "A11 – Desc A11");
    }

    #[test]
    fn test_durability_chart_puts_missing_metric_last() {
        let rows = vec![
            durability("A10", "Discos", ProportionRule::PerUnit, None),
            durability("A11", "Discos", ProportionRule::PerUnit, Some(100.0)),
            durability("A12", "Discos", ProportionRule::PerUnit, Some(400.0)),
            durability("A13", "Discos", ProportionRule::PerUnit, None),
        ];
        let selected: Vec<&DurabilityReportRow> = rows.iter().collect();
        let points = durability_chart(&selected, ChartAxis::Part);

        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["A12 – Desc A12", "A11 – Desc A11", "A10 – Desc A10", "A13 – Desc A13"]);
        assert_eq!(points[2].value, None);
        assert_eq!(points[3].value, None);
    }

    #[test]
    fn test_durability_chart_family_without_metric() {
        let rows = vec![
            durability("A10", "Discos", ProportionRule::PerUnit, Some(100.0)),
            durability("B20", "Correntes", ProportionRule::PerUnit, None),
        ];
        let selected: Vec<&DurabilityReportRow> = rows.iter().collect();
        let points = durability_chart(&selected, ChartAxis::Family);

        assert_eq!(
            points,
            vec![
                ChartPoint { label: "Discos".to_string(), value: Some(100.0) },
                ChartPoint { label: "Correntes".to_string(), value: None },
            ]
        );
    }

    #[test]
    fn test_rate_heatmap_averages_family_cells() {
        let rows = vec![
            rate(0, "A10", "Discos", 0.5),
            rate(0, "A11", "Discos", 0.25),
            rate(1000, "A10", "Discos", 1.0),
        ];
        let selected: Vec<&RateReportRow> = rows.iter().collect();
        let cells = rate_heatmap(&selected, ChartAxis::Family);

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].bucket.start, 0);
        assert_eq!(cells[0].label, "Discos");
        assert_eq!(cells[0].value, 37.5);
        assert_eq!(cells[1].bucket.start, 1000);
        assert_eq!(cells[1].value, 100.0);
    }

    #[test]
    fn test_rate_heatmap_by_part() {
        let rows = vec![rate(0, "A10", "Discos", 0.5), rate(0, "A11", "Discos", 0.29)];
        let selected: Vec<&RateReportRow> = rows.iter().collect();
        let cells = rate_heatmap(&selected, ChartAxis::Part);

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].label, "A10 – Desc A10");
        assert_eq!(cells[0].value, 50.0);
        assert_eq!(cells[1].value, 29.0);
    }
}
