//! Labeled tables: a row index, ordered column labels and a dense value grid.
//!
//! Every table in the pipeline is one of these. Construction checks the
//! structural invariants (shape, unique labels, ascending dates) so the stages
//! downstream never have to.

use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Label type for the rows of a table.
pub trait RowLabel: Clone + Ord + Hash + Display + FromStr {
    /// Header written above the index column.
    const HEADER: &'static str;
    /// Whether the index must be strictly ascending (time series).
    const ASCENDING: bool;
}

impl RowLabel for NaiveDate {
    const HEADER: &'static str = "Date";
    const ASCENDING: bool = true;
}

impl RowLabel for String {
    const HEADER: &'static str = "Ticker";
    const ASCENDING: bool = false;
}

/// A single value in a table and its delimited-text form.
pub trait Cell: Copy + Default + PartialEq + Debug {
    fn is_missing(&self) -> bool;
    fn to_field(&self) -> String;
    /// `None` when the field cannot be parsed.
    fn from_field(field: &str) -> Option<Self>;
}

impl Cell for f64 {
    fn is_missing(&self) -> bool {
        false
    }

    // Display gives the shortest round-tripping form and NaN / inf / -inf.
    fn to_field(&self) -> String {
        self.to_string()
    }

    fn from_field(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return Some(f64::NAN);
        }
        field.parse().ok()
    }
}

/// Raw provider cell: `None` (or a NaN the provider sent) is a missing price.
impl Cell for Option<f64> {
    fn is_missing(&self) -> bool {
        self.map_or(true, f64::is_nan)
    }

    fn to_field(&self) -> String {
        match self {
            Some(v) if !v.is_nan() => v.to_string(),
            _ => String::new(),
        }
    }

    fn from_field(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return Some(None);
        }
        field.parse::<f64>().ok().map(Some)
    }
}

/// True for results of undefined arithmetic (zero-price returns,
/// zero-volatility Sharpe ratios, correlations of constant series).
pub fn is_undefined(value: f64) -> bool {
    !value.is_finite()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable<R, T> {
    index: Vec<R>,
    columns: Vec<String>,
    values: Array2<T>,
}

/// Adjusted closes as delivered by a provider, possibly with gaps.
pub type RawPriceTable = LabeledTable<NaiveDate, Option<f64>>;
/// Cleaned adjusted closes: no missing cells, no all-zero column.
pub type PriceTable = LabeledTable<NaiveDate, f64>;
/// Period-over-period fractional changes.
pub type ReturnsTable = LabeledTable<NaiveDate, f64>;
/// Pairwise Pearson correlations, ticker × ticker.
pub type CorrelationTable = LabeledTable<String, f64>;

impl<R: RowLabel, T: Cell> LabeledTable<R, T> {
    pub fn new(index: Vec<R>, columns: Vec<String>, values: Array2<T>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != index.len() || cols != columns.len() {
            return Err(Error::InvalidTable(format!(
                "values are {}x{} but labels describe {}x{}",
                rows,
                cols,
                index.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(Error::InvalidTable(format!("duplicate column label {dup}")));
        }

        if R::ASCENDING {
            if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
                return Err(Error::InvalidTable(format!(
                    "row index must be strictly ascending, found {} before {}",
                    pair[0], pair[1]
                )));
            }
        } else {
            let mut seen = HashSet::new();
            if let Some(dup) = index.iter().find(|r| !seen.insert(*r)) {
                return Err(Error::InvalidTable(format!("duplicate row label {dup}")));
            }
        }

        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// Builds a table from row-major cells.
    pub fn from_rows(index: Vec<R>, columns: Vec<String>, rows: Vec<Vec<T>>) -> Result<Self> {
        let width = columns.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(Error::InvalidTable(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                width
            )));
        }
        let height = rows.len();
        let flat: Vec<T> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| Error::InvalidTable(e.to_string()))?;
        Self::new(index, columns, values)
    }

    /// For stages whose output labels are taken from an already valid table.
    pub(crate) fn from_parts(index: Vec<R>, columns: Vec<String>, values: Array2<T>) -> Self {
        debug_assert_eq!(values.dim(), (index.len(), columns.len()));
        Self {
            index,
            columns,
            values,
        }
    }

    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
            values: Array2::default((0, 0)),
        }
    }

    pub fn index(&self) -> &[R] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<T> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// No rows or no columns: nothing to analyse or draw.
    pub fn is_empty(&self) -> bool {
        self.nrows() == 0 || self.ncols() == 0
    }

    pub fn column_position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn column(&self, label: &str) -> Option<ArrayView1<'_, T>> {
        self.column_position(label).map(|i| self.values.column(i))
    }

    pub fn get(&self, row: &R, column: &str) -> Option<T> {
        let i = self.index.iter().position(|r| r == row)?;
        let j = self.column_position(column)?;
        Some(self.values[[i, j]])
    }

    /// Keeps the given row and column positions, in the given order.
    pub(crate) fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        let values = self.values.select(Axis(0), rows).select(Axis(1), cols);
        Self {
            index: rows.iter().map(|&i| self.index[i].clone()).collect(),
            columns: cols.iter().map(|&j| self.columns[j].clone()).collect(),
            values,
        }
    }

    pub fn map<U: Cell>(&self, f: impl FnMut(T) -> U) -> LabeledTable<R, U> {
        LabeledTable {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self.values.mapv(f),
        }
    }
}

impl PriceTable {
    /// Lifts a cleaned table back into the raw representation.
    pub fn to_raw(&self) -> RawPriceTable {
        self.map(Some)
    }
}
