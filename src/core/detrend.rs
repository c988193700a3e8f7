use crate::core::align::DateSeries;
use crate::types::{SarError, SarResult};
use chrono::{Datelike, NaiveDate};

/// A degree-1 least-squares fit over date ordinals (days from CE).
///
/// Used to detrend a gapped series and to predict cumulative end-of-series
/// displacement, so evaluating outside the fitted range is expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearModel {
    /// Evaluate the fitted line at one date
    pub fn predict(&self, date: NaiveDate) -> f64 {
        self.slope * ordinal(date) + self.intercept
    }

    /// Evaluate the fitted line at every date of an index, extrapolating
    /// freely at the tails
    pub fn predict_all(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates.iter().map(|d| self.predict(*d)).collect()
    }
}

fn ordinal(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Ordinary least squares on the non-null points of a date-indexed column.
///
/// Fewer than 2 usable points cannot define a line and fail with
/// `InsufficientData`.
pub fn fit(dates: &[NaiveDate], values: &[Option<f64>]) -> SarResult<LinearModel> {
    let points: Vec<(f64, f64)> = dates
        .iter()
        .zip(values)
        .filter_map(|(d, v)| v.map(|v| (ordinal(*d), v)))
        .collect();
    if points.len() < 2 {
        return Err(SarError::InsufficientData(format!(
            "need at least 2 non-null points to fit a line, got {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in &points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        return Err(SarError::InsufficientData(
            "all points share one date, slope is undefined".to_string(),
        ));
    }
    let slope = sxy / sxx;
    Ok(LinearModel {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Fit a fully-sampled series (no nulls by construction)
pub fn fit_series(series: &DateSeries) -> SarResult<LinearModel> {
    let values: Vec<Option<f64>> = series.values().iter().map(|v| Some(*v)).collect();
    fit(series.dates(), &values)
}

/// The fitted line evaluated over the full date index, nulls included
pub fn fit_date_series(dates: &[NaiveDate], values: &[Option<f64>]) -> SarResult<Vec<f64>> {
    Ok(fit(dates, values)?.predict_all(dates))
}

/// Standard deviation of (observed - predicted) over the non-null points
pub fn residual_std(dates: &[NaiveDate], values: &[Option<f64>]) -> SarResult<f64> {
    let model = fit(dates, values)?;
    let residuals: Vec<f64> = dates
        .iter()
        .zip(values)
        .filter_map(|(d, v)| v.map(|v| v - model.predict(*d)))
        .collect();
    Ok(std_dev(&residuals))
}

/// Detrended scatter of a column: the linear component is removed first, so
/// a steadily-moving station still reports a small value
pub fn flat_std(dates: &[NaiveDate], values: &[Option<f64>]) -> SarResult<f64> {
    residual_std(dates, values)
}

/// Cumulative displacement estimate: the fitted line at the last date of the
/// index, extrapolated if the tail is null
pub fn fitted_final_value(dates: &[NaiveDate], values: &[Option<f64>]) -> SarResult<f64> {
    let last = dates.last().ok_or_else(|| {
        SarError::InsufficientData("empty date index".to_string())
    })?;
    Ok(fit(dates, values)?.predict(*last))
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}
