use crate::core::align::DateSeries;
use crate::io::npy;
use crate::types::{SarError, SarResult};
use chrono::NaiveDate;
use ndarray::{Array1, Array3};
use std::fs;
use std::path::{Path, PathBuf};

const STACK_DSET: &str = "stack.npy";
const GEO_DATES_DSET: &str = "geo_dates.txt";
const STATION_DIR: &str = "stations";

/// Directory-backed container for a deformation time-series stack: the 3D
/// stack dataset (`[epoch, rows, cols]`), the epoch date list, and cached
/// per-station 1D series alongside.
///
/// Reads and writes are plain blocking file I/O; concurrent writers against
/// the same store must serialize externally.
pub struct DeformationStore {
    directory: PathBuf,
}

impl DeformationStore {
    /// Open an existing store directory
    pub fn open(directory: &Path) -> SarResult<Self> {
        if !directory.join(STACK_DSET).exists() {
            return Err(SarError::MissingMetadata(directory.to_path_buf()));
        }
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    /// Create a store from a deformation stack and its epoch dates
    pub fn create(
        directory: &Path,
        stack: &Array3<f32>,
        dates: &[NaiveDate],
    ) -> SarResult<Self> {
        if stack.dim().0 != dates.len() {
            return Err(SarError::InvalidShape(format!(
                "stack has {} epochs but {} dates were given",
                stack.dim().0,
                dates.len()
            )));
        }
        fs::create_dir_all(directory)?;
        npy::write_npy(&directory.join(STACK_DSET), stack.view())?;
        let date_lines: Vec<String> = dates.iter().map(|d| d.format("%Y%m%d").to_string()).collect();
        fs::write(directory.join(GEO_DATES_DSET), date_lines.join("\n") + "\n")?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    /// The epoch dates of the stack, in stored order
    pub fn geo_dates(&self) -> SarResult<Vec<NaiveDate>> {
        let text = fs::read_to_string(self.directory.join(GEO_DATES_DSET))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                NaiveDate::parse_from_str(line.trim(), "%Y%m%d")
                    .map_err(|e| SarError::Parse(format!("bad epoch date {:?}: {}", line, e)))
            })
            .collect()
    }

    /// The full 3D deformation stack
    pub fn stack(&self) -> SarResult<Array3<f32>> {
        npy::read_npy_3d(&self.directory.join(STACK_DSET))
    }

    fn station_path(&self, station: &str) -> PathBuf {
        self.directory.join(STATION_DIR).join(format!("{}.npy", station))
    }

    /// Per-epoch mean over a `window x window` pixel block centered on
    /// (row, col), clamped at the stack edges. NaN pixels are ignored;
    /// all-NaN windows yield NaN for that epoch.
    pub fn window_timeseries(
        stack: &Array3<f32>,
        row: usize,
        col: usize,
        window: usize,
    ) -> SarResult<Vec<f64>> {
        if window < 1 {
            return Err(SarError::InvalidParameter(
                "window size must be a positive integer".to_string(),
            ));
        }
        let (epochs, rows, cols) = stack.dim();
        if row >= rows || col >= cols {
            return Err(SarError::InvalidParameter(format!(
                "pixel ({}, {}) outside a {}x{} stack",
                row, col, rows, cols
            )));
        }
        let half = window / 2;
        let row_range = row.saturating_sub(half)..(row + half + 1).min(rows);
        let col_range = col.saturating_sub(half)..(col + half + 1).min(cols);

        let mut out = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for r in row_range.clone() {
                for c in col_range.clone() {
                    let v = stack[[epoch, r, c]];
                    if !v.is_nan() {
                        sum += v as f64;
                        count += 1;
                    }
                }
            }
            out.push(if count > 0 { sum / count as f64 } else { f64::NAN });
        }
        Ok(out)
    }

    /// Raw per-station timeseries, checking the cache first.
    ///
    /// A cache hit returns the stored values verbatim. On a miss the series
    /// is computed from the stack, stored, then returned.
    pub fn station_timeseries(
        &self,
        station: &str,
        row: usize,
        col: usize,
        window: usize,
    ) -> SarResult<Vec<f64>> {
        let cache_path = self.station_path(station);
        if cache_path.exists() {
            log::info!("using cached timeseries for {}", station);
            let cached = npy::read_npy_1d(&cache_path)?;
            return Ok(cached.iter().map(|v| *v as f64).collect());
        }

        log::info!("reading timeseries at {} from the stack", station);
        let stack = self.stack()?;
        let ts = Self::window_timeseries(&stack, row, col, window)?;

        fs::create_dir_all(self.directory.join(STATION_DIR))?;
        let as_f32: Array1<f32> = ts.iter().map(|v| *v as f32).collect();
        npy::write_npy(&cache_path, as_f32.view())?;
        Ok(ts)
    }

    /// The per-station series as a `DateSeries` over the epoch dates.
    /// Epochs whose window was all-NaN are dropped as unsampled.
    pub fn station_series(
        &self,
        station: &str,
        row: usize,
        col: usize,
        window: usize,
    ) -> SarResult<DateSeries> {
        let dates = self.geo_dates()?;
        let values = self.station_timeseries(station, row, col, window)?;
        if dates.len() != values.len() {
            return Err(SarError::InvalidShape(format!(
                "station {} series has {} values but the stack has {} epochs",
                station,
                values.len(),
                dates.len()
            )));
        }
        DateSeries::new(
            dates
                .into_iter()
                .zip(values)
                .filter(|(_, v)| !v.is_nan())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_store(dir: &Path) -> DeformationStore {
        // 3 epochs of a 4x4 stack whose value is epoch * 10 everywhere,
        // except a NaN hole at (1, 1)
        let mut stack = Array3::from_shape_fn((3, 4, 4), |(e, _, _)| (e * 10) as f32);
        for e in 0..3 {
            stack[[e, 1, 1]] = f32::NAN;
        }
        let dates = vec![d(2015, 1, 1), d(2015, 1, 13), d(2015, 1, 25)];
        DeformationStore::create(dir, &stack, &dates).unwrap()
    }

    #[test]
    fn test_geo_dates_round_trip() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        assert_eq!(
            store.geo_dates().unwrap(),
            vec![d(2015, 1, 1), d(2015, 1, 13), d(2015, 1, 25)]
        );
    }

    #[test]
    fn test_window_timeseries_nan_aware() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        let stack = store.stack().unwrap();
        // 3x3 window around (1, 1) has 8 valid pixels, all equal per epoch
        let ts = DeformationStore::window_timeseries(&stack, 1, 1, 3).unwrap();
        assert_eq!(ts.len(), 3);
        assert_relative_eq!(ts[0], 0.0);
        assert_relative_eq!(ts[2], 20.0);
    }

    #[test]
    fn test_station_cache_read_then_write() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());

        let ts = store.station_timeseries("TXKM", 2, 2, 1).unwrap();
        assert_relative_eq!(ts[1], 10.0);
        assert!(dir.path().join("stations/TXKM.npy").exists());

        // Poison the underlying stack; the cache must answer verbatim
        let bigger = Array3::from_elem((3, 4, 4), 999.0f32);
        npy::write_npy(&dir.path().join(STACK_DSET), bigger.view()).unwrap();
        let cached = store.station_timeseries("TXKM", 2, 2, 1).unwrap();
        assert_relative_eq!(cached[1], 10.0);
    }

    #[test]
    fn test_station_series_drops_nan_epochs() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        // Window of 1 on the NaN hole: every epoch is NaN, so no samples
        let series = store.station_series("HOLE", 1, 1, 1).unwrap();
        assert!(series.is_empty());

        let series = store.station_series("GOOD", 0, 0, 1).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(d(2015, 1, 13)), Some(10.0));
    }

    #[test]
    fn test_out_of_bounds_pixel() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());
        let stack = store.stack().unwrap();
        assert!(matches!(
            DeformationStore::window_timeseries(&stack, 10, 0, 1),
            Err(SarError::InvalidParameter(_))
        ));
    }
}
