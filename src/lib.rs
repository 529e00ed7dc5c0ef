//! Equity screening pipeline: download adjusted closes, clean them, derive
//! daily returns, summarise risk and return per ticker, correlate tickers,
//! write the tables to CSV and chart them.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod portfolio;
pub mod processing;
pub mod table;
pub mod utils;
pub mod visualization;

pub mod prelude {
    pub use crate::config::{Broker, DataSource, PipelineConfig, Settings};
    pub use crate::data::{fetch_data, to_price_table, HistoricalData, Record};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{run, PipelineOutputs};
    pub use crate::portfolio::{analyze, correlate, Performance, PerformanceSummary};
    pub use crate::processing::{clean, compute_returns};
    pub use crate::table::{
        is_undefined, CorrelationTable, LabeledTable, PriceTable, RawPriceTable, ReturnsTable,
    };
    pub use crate::utils::{read_table, write_table};
    pub use crate::visualization::{
        plot_correlation_heatmap, plot_prices, plot_return_distribution,
    };
}
