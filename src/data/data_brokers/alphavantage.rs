use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::data::{HistoricalData, Record};
use crate::error::{Error, Result};
use crate::utils::parse_date;

pub const BASE_URL: &str = "https://www.alphavantage.co";

const TIME_SERIES_KEY: &str = "Time Series (Daily)";
const ADJUSTED_CLOSE_KEY: &str = "5. adjusted close";

/// Extracts adjusted closes in `[start, end)` from a daily-adjusted payload.
///
/// `Ok(None)` means Alpha Vantage rejected the symbol.
pub(crate) fn parse_series(
    symbol: &str,
    json_val: &Value,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<HistoricalData>> {
    if json_val.get("Error Message").is_some() {
        return Ok(None);
    }
    // Rate limit and premium-endpoint notices arrive as 200s.
    if let Some(note) = json_val.get("Note").or_else(|| json_val.get("Information")) {
        return Err(Error::unavailable(
            Some(symbol),
            note.as_str().unwrap_or("provider notice").to_string(),
        ));
    }

    let series_obj = json_val[TIME_SERIES_KEY].as_object().ok_or_else(|| {
        Error::unavailable(Some(symbol), "could not parse time series JSON from Alpha Vantage")
    })?;

    let mut records = Vec::new();
    for (date_str, values) in series_obj {
        let Ok(current_date) = parse_date(date_str) else {
            continue;
        };
        if current_date < start || current_date >= end {
            continue;
        }

        let close_val = values[ADJUSTED_CLOSE_KEY]
            .as_str()
            .ok_or_else(|| Error::unavailable(Some(symbol), "missing adjusted close value"))?;
        let price = close_val.parse::<f64>().map_err(|e| {
            Error::unavailable(Some(symbol), format!("bad adjusted close {close_val:?}: {e}"))
        })?;

        records.push(Record {
            date: current_date,
            asset: symbol.to_string(),
            price,
        });
    }
    records.sort_by_key(|r| r.date);
    Ok(Some(records))
}

pub async fn fetch_data(
    client: &Client,
    base_url: &str,
    api_key: &str,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoricalData> {
    let mut all_records = Vec::new();

    for ticker in tickers {
        let url = format!(
            "{base_url}/query?function=TIME_SERIES_DAILY_ADJUSTED&symbol={ticker}&outputsize=full&apikey={api_key}"
        );

        let unavailable =
            |e: reqwest::Error| Error::unavailable(Some(ticker.as_str()), e.to_string());
        let resp = client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?;
        let json_val: Value = resp.json().await.map_err(unavailable)?;

        match parse_series(ticker, &json_val, start, end)? {
            Some(mut records) => all_records.append(&mut records),
            None => warn!("Alpha Vantage rejected symbol {}", ticker),
        }
    }

    Ok(all_records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn reads_adjusted_close_within_range() {
        let payload = json!({
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-01-04": {"4. close": "161.10", "5. adjusted close": "155.20"},
                "2024-01-03": {"4. close": "160.10", "5. adjusted close": "154.24"},
                "2024-01-02": {"4. close": "158.60", "5. adjusted close": "152.79"}
            }
        });

        let records = parse_series("IBM", &payload, date(2), date(4)).unwrap().unwrap();
        let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![152.79, 154.24]);
        assert_eq!(records[0].date, date(2));
    }

    #[test]
    fn error_message_means_unknown_symbol() {
        let payload = json!({"Error Message": "Invalid API call."});
        assert!(parse_series("ZZZZ", &payload, date(1), date(5)).unwrap().is_none());
    }

    #[test]
    fn rate_limit_note_is_unavailable() {
        let payload = json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."});
        let err = parse_series("IBM", &payload, date(1), date(5)).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }
}
