pub mod alphavantage;
pub mod yahoo;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;

use crate::config::{Broker, DataAPI};
use crate::error::{Error, Result};

use super::HistoricalData;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fetches every ticker from the configured broker, one request per ticker,
/// in request order. A single attempt each; failures are surfaced as-is.
pub async fn fetch_data(
    api: &DataAPI,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoricalData> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::unavailable(None, format!("failed to build HTTP client: {e}")))?;

    match api.source {
        Broker::Yahoo => {
            let base_url = api.base_url.as_deref().unwrap_or(yahoo::BASE_URL);
            yahoo::fetch_data(&client, base_url, tickers, start, end).await
        }
        Broker::AlphaVantage => {
            if api.api_key.is_empty() {
                return Err(Error::Config(
                    "the alphavantage source needs data_api.api_key".into(),
                ));
            }
            let base_url = api.base_url.as_deref().unwrap_or(alphavantage::BASE_URL);
            alphavantage::fetch_data(&client, base_url, &api.api_key, tickers, start, end).await
        }
    }
}
