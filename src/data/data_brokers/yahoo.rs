//! Yahoo Finance v8 chart API, daily adjusted closes.

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::data::{HistoricalData, Record};
use crate::error::{Error, Result};

pub const BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<Meta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    // Seconds east of UTC for the listing exchange.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Chart URL covering `[start, end)`: `period2` is midnight UTC of `end`.
fn chart_url(base_url: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp();
    format!(
        "{base_url}/v8/finance/chart/{symbol}\
         ?period1={start_ts}&period2={end_ts}&interval=1d\
         &includeAdjustedClose=true&events=div%2Csplit"
    )
}

/// Turns a chart response into records within `[start, end)`.
///
/// `Ok(None)` means Yahoo does not know the symbol.
pub(crate) fn parse_chart(
    symbol: &str,
    resp: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<HistoricalData>> {
    let malformed = |reason: &str| Error::unavailable(Some(symbol), reason.to_string());

    if let Some(err) = resp.chart.error {
        if err.code == "Not Found" {
            return Ok(None);
        }
        return Err(malformed(&format!("{}: {}", err.code, err.description)));
    }

    let data = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| malformed("empty chart result"))?;

    // No trading days in range.
    let Some(timestamps) = data.timestamp else {
        return Ok(Some(Vec::new()));
    };

    let offset = data.meta.map_or(0, |m| m.gmtoffset);
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .ok_or_else(|| malformed("no adjusted close series"))?;
    if adj_closes.len() != timestamps.len() {
        return Err(malformed(&format!(
            "{} timestamps but {} adjusted closes",
            timestamps.len(),
            adj_closes.len()
        )));
    }

    let mut records = Vec::with_capacity(timestamps.len());
    for (ts, adj_close) in timestamps.into_iter().zip(adj_closes) {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| malformed(&format!("invalid timestamp {ts}")))?;
        if date < start || date >= end {
            continue;
        }
        // Null closes (halts, partial days) stay missing.
        if let Some(price) = adj_close {
            records.push(Record {
                date,
                asset: symbol.to_string(),
                price,
            });
        }
    }
    Ok(Some(records))
}

pub async fn fetch_data(
    client: &Client,
    base_url: &str,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoricalData> {
    let mut all_records = Vec::new();

    for ticker in tickers {
        let url = chart_url(base_url, ticker, start, end);
        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::unavailable(Some(ticker.as_str()), e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Yahoo Finance does not know {}", ticker);
            continue;
        }
        if !status.is_success() {
            return Err(Error::unavailable(Some(ticker.as_str()), format!("HTTP {status}")));
        }

        let chart: ChartResponse = resp.json().await.map_err(|e| {
            Error::unavailable(Some(ticker.as_str()), format!("unreadable response: {e}"))
        })?;

        match parse_chart(ticker, chart, start, end)? {
            Some(mut records) => all_records.append(&mut records),
            None => warn!("Yahoo Finance does not know {}", ticker),
        }
    }

    Ok(all_records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(json: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<HistoricalData>> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("AAPL", resp, start, end)
    }

    #[test]
    fn url_is_half_open_in_utc_seconds() {
        let url = chart_url(BASE_URL, "MSFT", date(2024, 1, 2), date(2024, 1, 5));
        assert!(url.starts_with("https://query2.finance.yahoo.com/v8/finance/chart/MSFT?"));
        assert!(url.contains("period1=1704153600"));
        assert!(url.contains("period2=1704412800"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("includeAdjustedClose=true"));
    }

    #[test]
    fn uses_exchange_local_dates_and_adjusted_closes() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC, New York offset.
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[185.64,184.25]}],
                          "adjclose":[{"adjclose":[184.73,183.35]}]}
        }],"error":null}}"#;

        let records = parse(json, date(2024, 1, 1), date(2024, 1, 4)).unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, date(2024, 1, 2));
        assert_eq!(records[0].price, 184.73);
        assert_eq!(records[1].date, date(2024, 1, 3));
    }

    #[test]
    fn end_date_is_excluded_and_nulls_skipped() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"adjclose":[{"adjclose":[184.73,null,180.0]}]}
        }],"error":null}}"#;

        let records = parse(json, date(2024, 1, 2), date(2024, 1, 4)).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2024, 1, 2));
    }

    #[test]
    fn not_found_is_not_an_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse(json, date(2024, 1, 1), date(2024, 2, 1)).unwrap().is_none());
    }

    #[test]
    fn other_provider_errors_are_unavailable() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let err = parse(json, date(2024, 1, 1), date(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { symbol: Some(s), .. } if s == "AAPL"));
    }

    #[test]
    fn empty_range_yields_no_records() {
        let json = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},
            "indicators":{"quote":[{}],"adjclose":[{}]}}],"error":null}}"#;
        let records = parse(json, date(2024, 1, 6), date(2024, 1, 8)).unwrap().unwrap();
        assert!(records.is_empty());
    }
}
