use std::path::PathBuf;

use tracing::info;

use crate::config::{PipelineConfig, Settings};
use crate::data;
use crate::error::Result;
use crate::portfolio::{self, PerformanceSummary};
use crate::processing;
use crate::table::{CorrelationTable, PriceTable, RawPriceTable, ReturnsTable};
use crate::utils::write_table;
use crate::visualization;

/// Everything one run produced, in the order it was produced.
#[derive(Debug)]
pub struct PipelineOutputs {
    pub raw_prices: RawPriceTable,
    pub prices: PriceTable,
    pub returns: ReturnsTable,
    pub summary: PerformanceSummary,
    pub correlation: CorrelationTable,
    pub files: Vec<PathBuf>,
}

/// Runs fetch, clean, returns, analysis, persistence and charts in sequence.
/// The first failing stage aborts the run; files already written stay.
pub async fn run(config: &PipelineConfig, settings: &Settings) -> Result<PipelineOutputs> {
    let output = &settings.output;
    let mut files = Vec::new();

    // Step 1: Download raw data
    let raw_prices = data::fetch_data(settings, &config.tickers, config.start, config.end).await?;
    let raw_path = settings.output_path(&output.raw_prices);
    write_table(&raw_prices, &raw_path)?;
    files.push(raw_path);

    // Step 2: Clean data + compute returns
    info!("Cleaning data...");
    let prices = processing::clean(&raw_prices);
    info!("Data cleaned successfully.");

    info!("Calculating daily returns...");
    let returns = processing::compute_returns(&prices);
    info!("Daily returns computed.");

    // Step 3: Analysis
    info!("Analyzing stock performance...");
    let summary = portfolio::analyze(&returns);
    info!("Performance analysis completed.");

    info!("Computing correlation matrix...");
    let correlation = portfolio::correlate(&returns);
    info!("Correlation matrix computed.");

    // Step 4: Save analysis results
    let summary_path = settings.output_path(&output.summary);
    write_table(summary.table(), &summary_path)?;
    files.push(summary_path);

    let correlation_path = settings.output_path(&output.correlation);
    write_table(&correlation, &correlation_path)?;
    files.push(correlation_path);

    // Step 5: Visualization
    if output.charts {
        let prices_chart = settings.output_path(&output.prices_chart);
        visualization::plot_prices(&prices, &prices_chart)?;
        files.push(prices_chart);

        let returns_chart = settings.output_path(&output.returns_chart);
        visualization::plot_return_distribution(&returns, &returns_chart)?;
        files.push(returns_chart);

        let correlation_chart = settings.output_path(&output.correlation_chart);
        visualization::plot_correlation_heatmap(&correlation, &correlation_chart)?;
        files.push(correlation_chart);
    }

    Ok(PipelineOutputs {
        raw_prices,
        prices,
        returns,
        summary,
        correlation,
        files,
    })
}
