pub mod data_brokers;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::config::{DataSource, Settings};
use crate::error::{Error, Result};
use crate::table::RawPriceTable;
use crate::utils::{parse_date, read_error};

/// One adjusted close for one asset on one trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub asset: String,
    pub price: f64,
}

pub type HistoricalData = Vec<Record>;

/// Reads a wide CSV (`Date,SYM1,SYM2,...`) into HistoricalData, keeping
/// dates in `[start, end)`. Blank cells produce no record.
fn read_csv(path: &Path, start: NaiveDate, end: NaiveDate) -> Result<HistoricalData> {
    let read_err = |e: csv::Error| read_error(path, e);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;
    let headers = rdr.headers().map_err(read_err)?.clone();
    let mut data = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(read_err)?;
        let date_str = record.get(0).unwrap_or_default();
        let date = parse_date(date_str)
            .map_err(|e| Error::InvalidTable(format!("bad date {date_str:?}: {e}")))?;
        if date < start || date >= end {
            continue;
        }
        for (i, asset_name) in headers.iter().enumerate().skip(1) {
            let price_str = record.get(i).unwrap_or_default().trim();
            if price_str.is_empty() {
                continue;
            }
            let price = price_str.parse::<f64>().map_err(|e| {
                Error::InvalidTable(format!("bad price {price_str:?} for {asset_name}: {e}"))
            })?;
            data.push(Record {
                date,
                asset: asset_name.to_string(),
                price,
            });
        }
    }
    Ok(data)
}

/// Pivots long records into a price table: dates ascending, one column per
/// requested ticker in request order. Records for other assets are ignored.
pub fn to_price_table(data: &HistoricalData, tickers: &[String]) -> Result<RawPriceTable> {
    let mut lookup: HashMap<(NaiveDate, &str), f64> = HashMap::new();
    let mut dates = BTreeSet::new();
    for record in data {
        if tickers.iter().any(|t| *t == record.asset) {
            dates.insert(record.date);
            lookup.insert((record.date, record.asset.as_str()), record.price);
        }
    }

    let index: Vec<NaiveDate> = dates.into_iter().collect();
    let rows: Vec<Vec<Option<f64>>> = index
        .iter()
        .map(|date| {
            tickers
                .iter()
                .map(|t| lookup.get(&(*date, t.as_str())).copied())
                .collect::<Vec<_>>()
        })
        .collect();

    RawPriceTable::from_rows(index, tickers.to_vec(), rows)
}

/// Fetches adjusted closes for `tickers` over `[start, end)`.
///
/// `end` defaults to today. Tickers the source knows nothing about become
/// all-missing columns; if none of them is known the call fails.
pub async fn fetch_data(
    settings: &Settings,
    tickers: &[String],
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<RawPriceTable> {
    let end = end.unwrap_or_else(|| Local::now().date_naive());
    info!(
        "Downloading data from {} to {} for: {}",
        start,
        end,
        tickers.join(", ")
    );

    let records = match settings.general.data_source {
        DataSource::Csv => read_csv(&settings.general.data_file, start, end)?,
        DataSource::Api => {
            data_brokers::fetch_data(&settings.data_api, tickers, start, end).await?
        }
    };

    let missing: Vec<&str> = tickers
        .iter()
        .filter(|t| !records.iter().any(|r| r.asset == **t))
        .map(String::as_str)
        .collect();
    if !tickers.is_empty() && missing.len() == tickers.len() {
        return Err(Error::unavailable(
            None,
            format!("no data returned for any of: {}", tickers.join(", ")),
        ));
    }
    for ticker in missing {
        warn!("No data returned for {}; its column will be empty", ticker);
    }

    let table = to_price_table(&records, tickers)?;
    info!("Data download completed.");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn rec(d: u32, asset: &str, price: f64) -> Record {
        Record {
            date: day(d),
            asset: asset.to_string(),
            price,
        }
    }

    #[test]
    fn pivot_outer_joins_dates_in_request_order() {
        let data = vec![
            rec(3, "AAPL", 3.0),
            rec(2, "MSFT", 20.0),
            rec(2, "AAPL", 2.0),
            rec(3, "IGNORED", 9.0),
        ];
        let tickers = vec!["MSFT".to_string(), "AAPL".to_string(), "NOPE".to_string()];
        let table = to_price_table(&data, &tickers).unwrap();

        assert_eq!(table.index(), [day(2), day(3)]);
        assert_eq!(table.columns(), ["MSFT", "AAPL", "NOPE"]);
        assert_eq!(table.get(&day(2), "MSFT"), Some(Some(20.0)));
        assert_eq!(table.get(&day(3), "MSFT"), Some(None));
        assert_eq!(table.get(&day(3), "AAPL"), Some(Some(3.0)));
        assert!(table.column("NOPE").unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn csv_source_applies_half_open_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(
            &path,
            "Date,A,B\n2024-01-01,1,10\n2024-01-02,2,\n2024-01-03,3,30\n2024-01-04,4,40\n",
        )
        .unwrap();

        let data = read_csv(&path, day(2), day(4)).unwrap();
        assert_eq!(data, vec![rec(2, "A", 2.0), rec(3, "A", 3.0), rec(3, "B", 30.0)]);
    }

    #[test]
    fn csv_source_trims_headers_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spaced.csv");
        std::fs::write(&path, "Date, A , B\n2024-01-02, 2 , 20\n").unwrap();

        let data = read_csv(&path, day(1), day(3)).unwrap();
        assert_eq!(data, vec![rec(2, "A", 2.0), rec(2, "B", 20.0)]);
    }

    #[test]
    fn csv_source_missing_file_is_io_failure() {
        let err = read_csv(Path::new("/definitely/not/here.csv"), day(1), day(2)).unwrap_err();
        assert!(matches!(err, Error::IoFailure { .. }));
    }
}
