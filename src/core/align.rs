use crate::types::{SarError, SarResult};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// An irregularly-sampled displacement series: date-unique, sorted ascending,
/// gaps allowed. GPS series are near-daily; InSAR series sample at epoch
/// dates only.
#[derive(Debug, Clone, PartialEq)]
pub struct DateSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DateSeries {
    /// Build a series from (date, value) pairs, normalizing order.
    /// Duplicate dates are a data error.
    pub fn new(mut pairs: Vec<(NaiveDate, f64)>) -> SarResult<Self> {
        pairs.sort_by_key(|(d, _)| *d);
        for pair in pairs.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SarError::InvalidParameter(format!(
                    "duplicate date {} in series",
                    pair[0].0
                )));
            }
        }
        let (dates, values) = pairs.into_iter().unzip();
        Ok(Self { dates, values })
    }

    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> SarResult<Self> {
        if dates.len() != values.len() {
            return Err(SarError::InvalidParameter(format!(
                "series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        Self::new(dates.into_iter().zip(values).collect())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Value at an exact date, if sampled there
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| self.values[idx])
    }
}

/// Every calendar day from `start` through `end`, inclusive
pub fn daily_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        out.push(day);
        day += Duration::days(1);
    }
    out
}

/// The continuous daily axis spanning all input series: min to max date
/// across every series, one row per calendar day, no gaps. Which series
/// defines each extreme does not matter.
pub fn daily_axis(series_list: &[&DateSeries]) -> SarResult<Vec<NaiveDate>> {
    let min = series_list.iter().filter_map(|s| s.min_date()).min();
    let max = series_list.iter().filter_map(|s| s.max_date()).max();
    match (min, max) {
        (Some(min), Some(max)) => Ok(daily_range(min, max)),
        _ => Err(SarError::InsufficientData(
            "cannot build a date axis from empty series".to_string(),
        )),
    }
}

/// A date-indexed table of named, independently-nullable columns. The date
/// axis is always a regular daily grid; source data missing on a day shows
/// up as `None`, never as a dropped row.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl JoinedTable {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: BTreeMap::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Insert a column that is already aligned to this table's date axis
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) -> SarResult<()> {
        if values.len() != self.dates.len() {
            return Err(SarError::InvalidShape(format!(
                "column {} has {} rows, table has {}",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Option<f64>>> {
        self.columns.remove(name)
    }

    /// Left-outer merge of a series onto this table's date axis, returning a
    /// new table. Rows are never dropped; dates the series does not sample
    /// become nulls.
    pub fn merge_series(&self, name: &str, series: &DateSeries) -> SarResult<JoinedTable> {
        let values = self.dates.iter().map(|d| series.get(*d)).collect();
        let mut out = self.clone();
        out.set_column(name, values)?;
        Ok(out)
    }

    /// Left-outer merge of every column of `other` onto this table's axis,
    /// returning a new table. Unmatched dates in `other` yield nulls;
    /// rows of `self` are never dropped.
    pub fn merge_table(&self, other: &JoinedTable) -> JoinedTable {
        let mut out = self.clone();
        for (name, values) in &other.columns {
            let by_date: BTreeMap<NaiveDate, Option<f64>> = other
                .dates
                .iter()
                .copied()
                .zip(values.iter().copied())
                .collect();
            let aligned = out
                .dates
                .iter()
                .map(|d| by_date.get(d).copied().flatten())
                .collect();
            out.columns.insert(name.clone(), aligned);
        }
        out
    }
}
