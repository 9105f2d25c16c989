use crate::formatting::round_half_even;
use crate::models::ProportionRule;

/// Decimal places kept on reported ratios and derived metrics.
pub const REPORT_DECIMALS: u32 = 2;

impl ProportionRule {
    /// Maximum quantity of a part one chassis can hold.
    pub fn quantity_per_chassis(self, quantity_per_proportion: f64, line_count: u32) -> f64 {
        match self {
            ProportionRule::PerLine => quantity_per_proportion * f64::from(line_count),
            ProportionRule::PerUnit => quantity_per_proportion,
        }
    }
}

// ── Undefined-ratio policy ────────────────────────────────────────────────────

/// Drop rows with undefined ratio.
///
/// Returns `numerator / denominator` only when the denominator is finite and
/// non-zero and the quotient is finite. Rows for which this returns `None`
/// are removed from the report, never reported as zero.
pub fn defined_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if !denominator.is_finite() || denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

/// Hectares sustained per unit of capacity at the observed wear rate:
/// `(accumulated_usage / ratio) / max_quantity`.
///
/// `ratio` must be the unrounded consumption ratio. The division order is
/// part of the report definition; folding it into a single quotient changes
/// the rounded results. Returns `None` when the result is not finite.
pub fn usage_per_consumption_unit(accumulated_usage: f64, ratio: f64, max_quantity: f64) -> Option<f64> {
    let value = (accumulated_usage / ratio) / max_quantity;
    value.is_finite().then_some(value)
}

/// Round a reported figure to [`REPORT_DECIMALS`].
pub fn round_report_value(value: f64) -> f64 {
    round_half_even(value, REPORT_DECIMALS)
}
