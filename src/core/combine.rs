use crate::core::align::{daily_range, DateSeries, JoinedTable};
use crate::types::{SarError, SarResult};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Column suffixes for the two series families of one station
pub const GPS_SUFFIX: &str = "_gps";
pub const INSAR_SUFFIX: &str = "_insar";

/// Knobs for assembling the joined GPS/InSAR table
#[derive(Debug, Clone)]
pub struct CombineParams {
    /// Subtract this station's columns from every column of the same family
    pub reference_station: Option<String>,
    /// Drop a station when more than this fraction of its GPS rows are null
    pub gps_nan_threshold: f64,
    /// Moving-average window (days) applied to each GPS series, if any
    pub days_smooth_gps: Option<usize>,
    /// Moving-average window (days) applied to each InSAR series, if any
    pub days_smooth_insar: Option<usize>,
}

impl Default for CombineParams {
    fn default() -> Self {
        Self {
            reference_station: None,
            gps_nan_threshold: 0.4,
            days_smooth_gps: None,
            days_smooth_insar: None,
        }
    }
}

/// Builds the final joined table from named GPS and InSAR series: merge onto
/// a common daily axis bounded by the InSAR date range, optionally center on
/// a reference station, then prune stations with unusable coverage.
pub struct SeriesCombiner {
    params: CombineParams,
}

impl SeriesCombiner {
    pub fn new(params: CombineParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(CombineParams::default())
    }

    /// Run loaders over a station list, excluding stations whose source
    /// fails (missing network data, cache corruption) instead of aborting
    /// the whole run.
    pub fn collect_series<F>(station_names: &[String], mut loader: F) -> Vec<(String, DateSeries)>
    where
        F: FnMut(&str) -> SarResult<DateSeries>,
    {
        let mut out = Vec::with_capacity(station_names.len());
        for name in station_names {
            match loader(name) {
                Ok(series) => out.push((name.clone(), series)),
                Err(e) => log::warn!("excluding station {}: {}", name, e),
            }
        }
        out
    }

    /// Assemble the joined table. `gps` and `insar` pair station names with
    /// their displacement series; both families of columns are named
    /// `<station>_gps` / `<station>_insar`.
    pub fn combine(
        &self,
        gps: &[(String, DateSeries)],
        insar: &[(String, DateSeries)],
    ) -> SarResult<JoinedTable> {
        let insar_table = self.build_insar_table(insar)?;
        let gps_table = self.build_gps_table(gps)?;

        // The InSAR stack defines the reference date range: constrain the
        // final daily axis to its min/max and let GPS nulls fall outside
        let (start, end) = date_span(insar_table.dates())?;
        let mut table = JoinedTable::new(daily_range(start, end))
            .merge_table(&insar_table)
            .merge_table(&gps_table);

        if let Some(reference) = &self.params.reference_station {
            subtract_reference(&mut table, reference)?;
        }
        remove_bad_cols(&mut table, self.params.gps_nan_threshold);
        Ok(table)
    }

    /// One row per InSAR epoch date (union across stations), stations joined
    /// on exact dates
    fn build_insar_table(&self, insar: &[(String, DateSeries)]) -> SarResult<JoinedTable> {
        let epochs: BTreeSet<NaiveDate> = insar
            .iter()
            .flat_map(|(_, s)| s.dates().iter().copied())
            .collect();
        if epochs.is_empty() {
            return Err(SarError::InsufficientData(
                "no InSAR epochs to combine".to_string(),
            ));
        }
        let mut table = JoinedTable::new(epochs.into_iter().collect());
        for (name, series) in insar {
            let smoothed = smooth(series, self.params.days_smooth_insar)?;
            table = table.merge_series(&format!("{}{}", name, INSAR_SUFFIX), &smoothed)?;
        }
        Ok(table)
    }

    /// One row per calendar day spanning every GPS series, each station
    /// left-joined so its gap days become nulls
    fn build_gps_table(&self, gps: &[(String, DateSeries)]) -> SarResult<JoinedTable> {
        let series_refs: Vec<&DateSeries> = gps.iter().map(|(_, s)| s).collect();
        let axis = crate::core::align::daily_axis(&series_refs)?;
        let mut table = JoinedTable::new(axis);
        for (name, series) in gps {
            let smoothed = smooth(series, self.params.days_smooth_gps)?;
            table = table.merge_series(&format!("{}{}", name, GPS_SUFFIX), &smoothed)?;
        }
        Ok(table)
    }
}

fn date_span(dates: &[NaiveDate]) -> SarResult<(NaiveDate, NaiveDate)> {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(SarError::InsufficientData("empty date axis".to_string())),
    }
}

fn smooth(series: &DateSeries, window: Option<usize>) -> SarResult<DateSeries> {
    match window {
        None | Some(0) | Some(1) => Ok(series.clone()),
        Some(w) => DateSeries::from_parts(
            series.dates().to_vec(),
            moving_average(series.values(), w),
        ),
    }
}

/// Centered running mean with replicated edges, same length as the input
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let n = values.len() as isize;
    let half = (window / 2) as isize;
    let offsets: Vec<isize> = (-half..window as isize - half).collect();
    (0..n)
        .map(|i| {
            let sum: f64 = offsets
                .iter()
                .map(|off| values[(i + off).clamp(0, n - 1) as usize])
                .sum();
            sum / window as f64
        })
        .collect()
}

/// Center every column on the reference station's column of the same family.
/// Both reference columns must exist in the table.
pub fn subtract_reference(table: &mut JoinedTable, reference: &str) -> SarResult<()> {
    let gps_ref_name = format!("{}{}", reference, GPS_SUFFIX);
    let insar_ref_name = format!("{}{}", reference, INSAR_SUFFIX);
    let gps_ref = table
        .column(&gps_ref_name)
        .ok_or_else(|| SarError::UnknownReference(reference.to_string()))?
        .to_vec();
    let insar_ref = table
        .column(&insar_ref_name)
        .ok_or_else(|| SarError::UnknownReference(reference.to_string()))?
        .to_vec();

    let names: Vec<String> = table.column_names().iter().map(|s| s.to_string()).collect();
    for name in names {
        let reference_col = if name.ends_with(GPS_SUFFIX) {
            &gps_ref
        } else if name.ends_with(INSAR_SUFFIX) {
            &insar_ref
        } else {
            continue;
        };
        let col = match table.column(&name) {
            Some(col) => col,
            None => continue,
        };
        let centered: Vec<Option<f64>> = col
            .iter()
            .zip(reference_col)
            .map(|(v, r)| match (v, r) {
                (Some(v), Some(r)) => Some(v - r),
                _ => None,
            })
            .collect();
        table.set_column(&name, centered)?;
    }
    Ok(())
}

/// Drop stations whose coverage cannot support a comparison: a column that
/// is entirely null over the first 10 or last 10 rows kills its station, as
/// does a GPS column with more than `gps_nan_threshold` of its rows null.
/// InSAR columns are expected to be sparse, so their overall null fraction
/// alone never prunes a station.
pub fn remove_bad_cols(table: &mut JoinedTable, gps_nan_threshold: f64) {
    let n_rows = table.n_rows();
    let edge = n_rows.min(10);
    let mut bad_stations: BTreeSet<String> = BTreeSet::new();

    for name in table.column_names() {
        let station = match station_of(name) {
            Some(s) => s,
            None => continue,
        };
        let col = match table.column(name) {
            Some(col) => col,
            None => continue,
        };
        let head_empty = col[..edge].iter().all(|v| v.is_none());
        let tail_empty = col[n_rows - edge..].iter().all(|v| v.is_none());
        let nan_frac =
            col.iter().filter(|v| v.is_none()).count() as f64 / n_rows.max(1) as f64;
        let too_sparse = name.ends_with(GPS_SUFFIX) && nan_frac > gps_nan_threshold;

        if head_empty || tail_empty || too_sparse {
            bad_stations.insert(station.to_string());
        }
    }

    for station in &bad_stations {
        log::info!("removing bad station columns for {}", station);
        table.remove_column(&format!("{}{}", station, GPS_SUFFIX));
        table.remove_column(&format!("{}{}", station, INSAR_SUFFIX));
    }
}

fn station_of(column: &str) -> Option<&str> {
    column
        .strip_suffix(GPS_SUFFIX)
        .or_else(|| column.strip_suffix(INSAR_SUFFIX))
}
