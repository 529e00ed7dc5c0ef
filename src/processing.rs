use ndarray::{s, Array2};

use crate::table::{Cell, PriceTable, RawPriceTable, ReturnsTable};

/// Drops every row with a missing price, then every column that is all
/// zeros in what is left. A table whose rows all go keeps no columns either.
pub fn clean(raw: &RawPriceTable) -> PriceTable {
    let values = raw.values();

    let rows: Vec<usize> = values
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().all(|cell| !cell.is_missing()))
        .map(|(i, _)| i)
        .collect();

    let cols: Vec<usize> = (0..raw.ncols())
        .filter(|&j| rows.iter().any(|&i| values[[i, j]] != Some(0.0)))
        .collect();

    // Every kept cell is present, so the fallback never applies.
    raw.select(&rows, &cols).map(|cell| cell.unwrap_or(f64::NAN))
}

/// Period-over-period fractional change, `(p[t] - p[t-1]) / p[t-1]`.
///
/// Only the first row is dropped. A zero price at `t-1` yields an infinite
/// or NaN return for `t`, which is kept as is.
pub fn compute_returns(prices: &PriceTable) -> ReturnsTable {
    let columns = prices.columns().to_vec();
    if prices.nrows() < 2 {
        let values = Array2::zeros((0, columns.len()));
        return ReturnsTable::from_parts(Vec::new(), columns, values);
    }

    let values = prices.values();
    let prev = values.slice(s![..-1, ..]);
    let next = values.slice(s![1.., ..]);
    let returns = (&next - &prev) / &prev;

    ReturnsTable::from_parts(prices.index()[1..].to_vec(), columns, returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::is_undefined;
    use chrono::NaiveDate;

    fn days(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn raw(names: &[&str], rows: Vec<Vec<Option<f64>>>) -> RawPriceTable {
        RawPriceTable::from_rows(days(rows.len() as u32), labels(names), rows).unwrap()
    }

    #[test]
    fn drops_rows_with_any_gap() {
        let table = raw(
            &["A", "B"],
            vec![
                vec![Some(1.0), Some(2.0)],
                vec![None, Some(2.5)],
                vec![Some(1.2), Some(f64::NAN)],
                vec![Some(1.3), Some(2.6)],
            ],
        );
        let cleaned = clean(&table);

        assert_eq!(cleaned.index(), [days(4)[0], days(4)[3]]);
        assert_eq!(cleaned.columns(), ["A", "B"]);
        assert_eq!(cleaned.column("B").unwrap().to_vec(), vec![2.0, 2.6]);
    }

    #[test]
    fn drops_all_zero_columns_after_row_drop() {
        let table = raw(
            &["A", "DELISTED", "B"],
            vec![
                vec![Some(1.0), Some(0.0), Some(3.0)],
                vec![Some(1.1), None, Some(3.1)],
                vec![Some(1.2), Some(0.0), Some(0.0)],
            ],
        );
        let cleaned = clean(&table);

        assert_eq!(cleaned.columns(), ["A", "B"]);
        assert_eq!(cleaned.nrows(), 2);
        // A single zero price is not enough to drop a column.
        assert_eq!(cleaned.column("B").unwrap().to_vec(), vec![3.0, 0.0]);
    }

    #[test]
    fn all_missing_cleans_to_nothing() {
        let table = raw(&["A", "B"], vec![vec![None, None], vec![None, Some(1.0)]]);
        let cleaned = clean(&table);

        assert_eq!(cleaned.nrows(), 0);
        assert_eq!(cleaned.ncols(), 0);
        assert!(compute_returns(&cleaned).is_empty());
    }

    #[test]
    fn clean_is_idempotent() {
        let table = raw(
            &["A", "Z", "B"],
            vec![
                vec![Some(5.0), Some(0.0), None],
                vec![Some(5.5), Some(0.0), Some(9.0)],
                vec![Some(5.1), Some(0.0), Some(9.2)],
            ],
        );
        let once = clean(&table);
        let twice = clean(&once.to_raw());
        assert_eq!(once, twice);
    }

    #[test]
    fn returns_drop_only_the_first_row() {
        let prices = PriceTable::from_rows(
            days(3),
            labels(&["A", "B"]),
            vec![vec![100.0, 50.0], vec![110.0, 40.0], vec![99.0, 50.0]],
        )
        .unwrap();
        let returns = compute_returns(&prices);

        assert_eq!(returns.index(), &days(3)[1..]);
        assert_eq!(returns.columns(), prices.columns());
        let a = returns.column("A").unwrap();
        assert!((a[0] - 0.10).abs() < 1e-12);
        assert!((a[1] + 0.10).abs() < 1e-12);
        let b = returns.column("B").unwrap();
        assert!((b[0] + 0.20).abs() < 1e-12);
        assert!((b[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_price_gives_undefined_return_not_a_dropped_row() {
        let prices = PriceTable::from_rows(
            days(4),
            labels(&["A", "B"]),
            vec![
                vec![1.0, 2.0],
                vec![0.0, 2.0],
                vec![3.0, 2.0],
                vec![0.0, 0.0],
            ],
        )
        .unwrap();
        let returns = compute_returns(&prices);

        assert_eq!(returns.nrows(), 3);
        let a = returns.column("A").unwrap();
        assert_eq!(a[0], -1.0);
        assert_eq!(a[1], f64::INFINITY);
        assert_eq!(a[2], -1.0);
        assert!(is_undefined(a[1]));
        assert_eq!(returns.column("B").unwrap()[2], -1.0);
    }

    #[test]
    fn single_row_has_no_returns_but_keeps_columns() {
        let prices =
            PriceTable::from_rows(days(1), labels(&["A"]), vec![vec![10.0]]).unwrap();
        let returns = compute_returns(&prices);
        assert_eq!(returns.nrows(), 0);
        assert_eq!(returns.columns(), ["A"]);
    }
}
