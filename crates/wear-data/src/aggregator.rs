//! Consumption-rate and durability aggregation.
//!
//! Both aggregators take immutable inputs and return freshly built report
//! rows; they share only the read-only catalog.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;
use wear_core::calculations::{defined_ratio, round_report_value, usage_per_consumption_unit};
use wear_core::models::{
    DurabilityReportRow, PartCatalog, RateReportRow, UsageLedger, UsageRangeBucket,
};

use crate::bucketizer::Bucketing;
use crate::capacity::{CapacityKey, CapacityResolver};

// ── GroupStats ────────────────────────────────────────────────────────────────

/// Running totals for one (bucket, code) or one code group.
#[derive(Debug, Clone, Default)]
struct GroupStats<'a> {
    /// Distinct (chassis, code, line count) keys seen in the group.
    capacity_keys: BTreeSet<CapacityKey<'a>>,
    /// Distinct chassis seen in the group.
    chassis: BTreeSet<&'a str>,
    consumed: f64,
}

impl<'a> GroupStats<'a> {
    fn add(&mut self, chassis_id: &'a str, code: &'a str, line_count: u32, consumed: f64) {
        self.capacity_keys.insert(CapacityKey {
            chassis_id,
            code,
            line_count,
        });
        self.chassis.insert(chassis_id);
        self.consumed += consumed;
    }
}

// ── ConsumptionRateAggregator ─────────────────────────────────────────────────

/// Rate report rows plus what was left out building them.
#[derive(Debug, Clone, Default)]
pub struct RateReport {
    pub rows: Vec<RateReportRow>,
    /// Capacity keys whose code could not be joined with the catalog.
    pub unresolved_capacity: usize,
    /// (bucket, code) groups dropped for an unresolved join or an undefined
    /// ratio.
    pub dropped: usize,
}

/// Builds the consumption-rate report: per (bucket, code), consumed quantity
/// against the maximum capacity of the chassis observed in that bucket.
#[derive(Debug, Clone, Copy)]
pub struct ConsumptionRateAggregator<'c> {
    catalog: &'c PartCatalog,
}

impl<'c> ConsumptionRateAggregator<'c> {
    pub fn new(catalog: &'c PartCatalog) -> Self {
        Self { catalog }
    }

    /// Aggregate bucketed records.
    ///
    /// Rows come out ordered by bucket, then code.
    pub fn aggregate(&self, bucketing: &Bucketing<'_>) -> RateReport {
        let mut groups: BTreeMap<(UsageRangeBucket, &str), GroupStats<'_>> = BTreeMap::new();
        for item in &bucketing.records {
            let record = item.record;
            groups
                .entry((item.bucket, record.code.as_str()))
                .or_default()
                .add(
                    &record.chassis_id,
                    &record.code,
                    record.line_count,
                    record.quantity_consumed,
                );
        }

        let resolver = CapacityResolver::new(self.catalog);
        let mut report = RateReport::default();

        for ((bucket, code), group) in groups {
            let Some(entry) = self.catalog.get(code) else {
                report.unresolved_capacity += group.capacity_keys.len();
                report.dropped += 1;
                continue;
            };

            let capacity = resolver.resolve_all(group.capacity_keys.iter().copied());
            report.unresolved_capacity += capacity.unresolved;

            let Some(quantity_per_proportion) = entry.quantity_per_proportion else {
                report.dropped += 1;
                continue;
            };

            let max_quantity: f64 = capacity.facts.iter().map(|f| f.quantity_per_chassis).sum();
            let Some(ratio) = defined_ratio(group.consumed, max_quantity) else {
                debug!("Rate {} / {}: undefined ratio, dropped", bucket, code);
                report.dropped += 1;
                continue;
            };

            report.rows.push(RateReportRow {
                bucket,
                chassis_count: group.chassis.len(),
                family: entry.family.clone(),
                proportion_rule: entry.proportion_rule,
                quantity_per_proportion,
                max_quantity,
                code: code.to_string(),
                description: entry.description.clone(),
                consumed_quantity: group.consumed,
                consumption_ratio: round_report_value(ratio),
            });
        }

        debug!(
            "Rate report: {} rows, {} dropped, {} unresolved capacity keys",
            report.rows.len(),
            report.dropped,
            report.unresolved_capacity
        );

        report
    }
}

// ── DurabilityAggregator ──────────────────────────────────────────────────────

/// Durability report rows plus what was left out building them.
#[derive(Debug, Clone, Default)]
pub struct DurabilityReport {
    pub rows: Vec<DurabilityReportRow>,
    /// Capacity keys whose code could not be joined with the catalog.
    pub unresolved_capacity: usize,
    /// Codes dropped for an unresolved join, an undefined ratio or no usage
    /// reading on any linked chassis.
    pub dropped: usize,
}

/// Builds the durability report: per code over the whole ledger, lifetime
/// consumption against lifetime capacity and accumulated usage.
#[derive(Debug, Clone, Copy)]
pub struct DurabilityAggregator<'c> {
    catalog: &'c PartCatalog,
}

impl<'c> DurabilityAggregator<'c> {
    pub fn new(catalog: &'c PartCatalog) -> Self {
        Self { catalog }
    }

    /// Aggregate the whole ledger, without bucketing.
    ///
    /// Rows come out ordered by code.
    pub fn aggregate(&self, ledger: &UsageLedger) -> DurabilityReport {
        let mut groups: BTreeMap<&str, GroupStats<'_>> = BTreeMap::new();
        for record in &ledger.records {
            groups.entry(record.code.as_str()).or_default().add(
                &record.chassis_id,
                &record.code,
                record.line_count,
                record.quantity_consumed,
            );
        }

        let lifetime_usage = Self::lifetime_usage(ledger);
        let resolver = CapacityResolver::new(self.catalog);
        let mut report = DurabilityReport::default();

        for (code, group) in groups {
            let Some(entry) = self.catalog.get(code) else {
                report.unresolved_capacity += group.capacity_keys.len();
                report.dropped += 1;
                continue;
            };

            let capacity = resolver.resolve_all(group.capacity_keys.iter().copied());
            report.unresolved_capacity += capacity.unresolved;

            let Some(quantity_per_proportion) = entry.quantity_per_proportion else {
                report.dropped += 1;
                continue;
            };

            let max_quantity: f64 = capacity.facts.iter().map(|f| f.quantity_per_chassis).sum();
            let total_line_count: u64 = group
                .capacity_keys
                .iter()
                .map(|k| u64::from(k.line_count))
                .sum();

            let Some(accumulated_usage) = Self::accumulated_usage(&group.chassis, &lifetime_usage)
            else {
                debug!("Durability {}: no usage readings, dropped", code);
                report.dropped += 1;
                continue;
            };

            let Some(ratio) = defined_ratio(group.consumed, max_quantity) else {
                debug!("Durability {}: undefined ratio, dropped", code);
                report.dropped += 1;
                continue;
            };

            report.rows.push(DurabilityReportRow {
                chassis_count: group.chassis.len(),
                family: entry.family.clone(),
                proportion_rule: entry.proportion_rule,
                quantity_per_proportion,
                max_quantity,
                code: code.to_string(),
                description: entry.description.clone(),
                consumed_quantity: group.consumed,
                // Derive from the unrounded ratio, then round each independently.
                usage_per_consumption_unit: usage_per_consumption_unit(
                    accumulated_usage,
                    ratio,
                    max_quantity,
                )
                .map(round_report_value),
                consumption_ratio: round_report_value(ratio),
                accumulated_usage,
                total_line_count,
            });
        }

        debug!(
            "Durability report: {} rows, {} dropped, {} unresolved capacity keys",
            report.rows.len(),
            report.dropped,
            report.unresolved_capacity
        );

        report
    }

    /// Highest usage reading of every chassis, across all its records.
    fn lifetime_usage(ledger: &UsageLedger) -> HashMap<&str, f64> {
        let mut max_by_chassis: HashMap<&str, f64> = HashMap::new();
        for record in &ledger.records {
            if let Some(usage) = record.valid_usage() {
                max_by_chassis
                    .entry(record.chassis_id.as_str())
                    .and_modify(|m| *m = m.max(usage))
                    .or_insert(usage);
            }
        }
        max_by_chassis
    }

    /// Sum of the lifetime usage of `chassis`. `None` when none of them has a
    /// reading.
    fn accumulated_usage(chassis: &BTreeSet<&str>, lifetime_usage: &HashMap<&str, f64>) -> Option<f64> {
        chassis
            .iter()
            .filter_map(|c| lifetime_usage.get(c).copied())
            .fold(None, |acc: Option<f64>, u| Some(acc.unwrap_or(0.0) + u))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
