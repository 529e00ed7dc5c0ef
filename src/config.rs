use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use config::{Config, File};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::parse_date;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: General,
    pub data_api: DataAPI,
    pub output: Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Api,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Broker {
    Yahoo,
    AlphaVantage,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct General {
    pub data_source: DataSource,
    // Wide CSV (Date,SYM1,SYM2,...) read when data_source = "csv"
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DataAPI {
    pub source: Broker,
    pub api_key: String,
    pub base_url: Option<String>,
    pub tickers: Vec<String>,
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    pub raw_prices: String,
    pub summary: String,
    pub correlation: String,
    pub prices_chart: String,
    pub returns_chart: String,
    pub correlation_chart: String,
    // Headless runs (CI, tests) can skip the PNGs.
    pub charts: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            data_source: DataSource::Api,
            data_file: PathBuf::from("data/prices.csv"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for DataAPI {
    fn default() -> Self {
        Self {
            source: Broker::Yahoo,
            api_key: String::new(),
            base_url: None,
            tickers: ["AAPL", "MSFT", "GOOGL", "AMZN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start_date: "2022-01-01".to_string(),
            end_date: None,
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            raw_prices: "raw_prices.csv".to_string(),
            summary: "summary.csv".to_string(),
            correlation: "correlation.csv".to_string(),
            prices_chart: "prices.png".to_string(),
            returns_chart: "return_distribution.png".to_string(),
            correlation_chart: "correlation_heatmap.png".to_string(),
            charts: true,
        }
    }
}

/// Validated, immutable parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    /// `None` means "today" at fetch time.
    pub end: Option<NaiveDate>,
}

impl Settings {
    /// Loads `config.toml` (optional) from the working directory, then `APP__*`
    /// environment overrides, after reading `.env`.
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            // Retrieve the api key from .env
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut tickers: Vec<String> = Vec::new();
        for ticker in &self.data_api.tickers {
            let ticker = ticker.trim();
            if ticker.is_empty() {
                return Err(Error::Config("ticker symbols must not be blank".into()));
            }
            if !tickers.iter().any(|t| t == ticker) {
                tickers.push(ticker.to_string());
            }
        }
        if tickers.is_empty() {
            return Err(Error::Config("at least one ticker is required".into()));
        }

        let start = parse_config_date("start_date", &self.data_api.start_date)?;
        let end = self
            .data_api
            .end_date
            .as_deref()
            .map(|d| parse_config_date("end_date", d))
            .transpose()?;
        if let Some(end) = end {
            if start >= end {
                return Err(Error::Config(format!(
                    "start_date {start} must be before end_date {end}"
                )));
            }
        }

        Ok(PipelineConfig {
            tickers,
            start,
            end,
        })
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.general.output_dir.join(file_name)
    }
}

fn parse_config_date(key: &str, value: &str) -> Result<NaiveDate> {
    parse_date(value.trim())
        .map_err(|e| Error::Config(format!("{key} {value:?} is not YYYY-MM-DD: {e}")))
}
