mod bootstrap;

use anyhow::Result;
use wear_core::formatting::{format_optional, format_ratio_percent};
use wear_core::models::ProportionRule;
use wear_core::settings::Settings;
use wear_data::analysis::{analyze_files, ReportOptions, ReportSet};
use wear_data::export::{write_reports, ReportFormat};
use wear_data::presenter::{durability_chart, rate_heatmap, ChartAxis, ReportFilter};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories(&settings.output_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Wear Report v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.clear && settings.catalog.is_none() && settings.ledger.is_none() {
        println!("Saved configuration cleared.");
        return Ok(());
    }

    let (catalog_path, ledger_path) = settings.input_paths()?;
    let format: ReportFormat = settings.format.parse()?;
    let options = ReportOptions {
        bucket_width: settings.bucket_width,
    };

    tracing::info!(
        "Catalog: {}, Ledger: {}, Bucket width: {}",
        catalog_path.display(),
        ledger_path.display(),
        options.bucket_width
    );

    let reports = analyze_files(catalog_path, ledger_path, &options)?;
    let (rate_path, durability_path) = write_reports(&settings.output_dir, &reports, format)?;

    println!(
        "{} rate rows -> {}",
        reports.rate_rows.len(),
        rate_path.display()
    );
    println!(
        "{} durability rows -> {}",
        reports.durability_rows.len(),
        durability_path.display()
    );
    print_exclusions(&reports);

    if settings.has_filters() {
        let filter = ReportFilter::new(
            settings.code.as_deref(),
            settings.family.as_deref(),
            settings.proportion.as_deref().and_then(ProportionRule::from_label),
        );
        print_summary(&filter, &reports);
    }

    Ok(())
}

fn print_exclusions(reports: &ReportSet) {
    let meta = &reports.metadata;
    if meta.unbucketed_records + meta.rate_rows_dropped + meta.durability_rows_dropped == 0 {
        return;
    }
    println!(
        "Left out: {} records without hectare reading, {} rate groups, {} durability codes",
        meta.unbucketed_records, meta.rate_rows_dropped, meta.durability_rows_dropped
    );
}

/// Print the filtered heatmap cells and durability ranking.
fn print_summary(filter: &ReportFilter, reports: &ReportSet) {
    let axis = filter.chart_axis();
    let axis_name = match axis {
        ChartAxis::Family => "Família",
        ChartAxis::Part => "Peça",
    };

    let rate_rows = filter.apply(&reports.rate_rows);
    let durability_rows = filter.apply(&reports.durability_rows);

    println!();
    println!("% Consumo por faixa de hectare ({})", axis_name);
    if rate_rows.is_empty() {
        println!("  (no matching rows)");
    }
    for cell in rate_heatmap(&rate_rows, axis) {
        println!(
            "  {:<16} {:<40} {:>10}",
            cell.bucket.label(),
            cell.label,
            format_ratio_percent(cell.value / 100.0)
        );
    }

    println!();
    println!("Consumo hectare ({})", axis_name);
    if durability_rows.is_empty() {
        println!("  (no matching rows)");
    }
    for point in durability_chart(&durability_rows, axis) {
        println!("  {:<40} {:>14}", point.label, format_optional(point.value, 2));
    }
}
