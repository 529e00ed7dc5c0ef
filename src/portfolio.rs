use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};
use crate::table::{CorrelationTable, LabeledTable, ReturnsTable};

/// Trading days per year used to annualise daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

pub const ANNUAL_RETURN: &str = "Annual Return";
pub const VOLATILITY: &str = "Volatility";
pub const SHARPE_RATIO: &str = "Sharpe Ratio";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub annual_return: f64,
    pub volatility: f64,
    /// Non-finite when volatility is zero.
    pub sharpe_ratio: f64,
}

impl Performance {
    pub fn from_daily(returns: ArrayView1<'_, f64>) -> Self {
        let annual_return = mean(returns) * TRADING_DAYS;
        let volatility = sample_std(returns) * TRADING_DAYS.sqrt();
        Self {
            annual_return,
            volatility,
            sharpe_ratio: annual_return / volatility,
        }
    }
}

/// Per-ticker performance, one row per ticker and exactly the columns
/// `Annual Return`, `Volatility`, `Sharpe Ratio`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    table: LabeledTable<String, f64>,
}

impl PerformanceSummary {
    /// Wraps a reloaded table, checking it has the summary columns.
    pub fn from_table(table: LabeledTable<String, f64>) -> Result<Self> {
        if table.columns() != summary_columns().as_slice() {
            return Err(Error::InvalidTable(format!(
                "summary columns must be {:?}, found {:?}",
                summary_columns(),
                table.columns()
            )));
        }
        Ok(Self { table })
    }

    pub fn get(&self, ticker: &str) -> Option<Performance> {
        let i = self.table.index().iter().position(|t| t == ticker)?;
        let row = self.table.values().row(i);
        Some(Performance {
            annual_return: row[0],
            volatility: row[1],
            sharpe_ratio: row[2],
        })
    }

    pub fn tickers(&self) -> &[String] {
        self.table.index()
    }

    pub fn table(&self) -> &LabeledTable<String, f64> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn summary_columns() -> Vec<String> {
    [ANNUAL_RETURN, VOLATILITY, SHARPE_RATIO]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Annual return, volatility and Sharpe ratio for every column.
pub fn analyze(returns: &ReturnsTable) -> PerformanceSummary {
    let values = returns.values();
    let mut cells = Array2::zeros((returns.ncols(), 3));
    for j in 0..returns.ncols() {
        let p = Performance::from_daily(values.column(j));
        cells[[j, 0]] = p.annual_return;
        cells[[j, 1]] = p.volatility;
        cells[[j, 2]] = p.sharpe_ratio;
    }

    let table = LabeledTable::from_parts(returns.columns().to_vec(), summary_columns(), cells);
    PerformanceSummary { table }
}

/// Pearson correlation of every pair of columns.
///
/// The diagonal is exactly 1 and `corr[i][j]` is the same value as
/// `corr[j][i]`. Pairs involving a constant or non-finite series are NaN.
pub fn correlate(returns: &ReturnsTable) -> CorrelationTable {
    let n = returns.ncols();
    let values = returns.values();
    let mut corr = Array2::from_elem((n, n), f64::NAN);

    for i in 0..n {
        corr[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(values.column(i), values.column(j));
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }

    let labels = returns.columns().to_vec();
    LabeledTable::from_parts(labels.clone(), labels, corr)
}

fn mean(xs: ArrayView1<'_, f64>) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.sum() / xs.len() as f64
}

/// Sample standard deviation (divisor n-1). A series of identical values is
/// exactly 0 regardless of rounding in the mean.
fn sample_std(xs: ArrayView1<'_, f64>) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }
    if is_flat(xs) {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|&x| (x - m).powi(2)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// True when every value equals the first.
fn is_flat(xs: ArrayView1<'_, f64>) -> bool {
    xs.first().map_or(true, |&first| xs.iter().all(|&x| x == first))
}

fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    let n = x.len();
    // The mean of a flat series can be off by an ulp, which would leave a
    // tiny non-zero variance behind.
    if n < 2 || is_flat(x) || is_flat(y) {
        return f64::NAN;
    }
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}
