use crate::core::align::DateSeries;
use crate::types::{EnuSeries, SarError, SarResult, Station};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

/// URL template for 24-hour final GPS solutions in east-north-vertical,
/// parameterized by the 4-letter station name
pub const DEFAULT_BASE_URL: &str =
    "http://geodesy.unr.edu/gps_timeseries/tenv3/NA12/{station}.NA12.tenv3";

/// Explicit configuration for the GPS data source; nothing here is global
/// state, callers construct and pass it
#[derive(Debug, Clone)]
pub struct GpsConfig {
    /// Template URL containing a `{station}` placeholder
    pub base_url: String,
    /// Directory raw station files are cached in, keyed by station name
    pub cache_dir: PathBuf,
    /// Discard samples before Jan 1 of this year
    pub start_year: Option<i32>,
    /// Discard samples after Jan 1 of this year
    pub end_year: Option<i32>,
    /// Scale meters to centimeters
    pub to_cm: bool,
}

impl Default for GpsConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("sarlink")
            .join("gps");
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir,
            start_year: Some(2014),
            end_year: None,
            to_cm: true,
        }
    }
}

impl GpsConfig {
    pub fn station_url(&self, station: &str) -> String {
        self.base_url.replace("{station}", station)
    }

    pub fn station_cache_file(&self, station: &str) -> PathBuf {
        let filename = self
            .station_url(station)
            .rsplit('/')
            .next()
            .unwrap_or(station)
            .to_string();
        self.cache_dir.join(filename)
    }
}

/// Read the station catalog CSV with name/lat/lon/alt columns. A leading
/// header row is tolerated and skipped.
pub fn read_station_catalog(path: &std::path::Path) -> SarResult<Vec<Station>> {
    log::info!("reading station catalog from {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| SarError::Parse(format!("{}: {}", path.display(), e)))?;

    let mut stations = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SarError::Parse(e.to_string()))?;
        if record.len() < 4 {
            return Err(SarError::Parse(format!(
                "station catalog row {} has {} fields, need name,lat,lon,alt",
                idx,
                record.len()
            )));
        }
        let parsed = (
            record[1].parse::<f64>(),
            record[2].parse::<f64>(),
            record[3].parse::<f64>(),
        );
        match parsed {
            (Ok(lat), Ok(lon), Ok(alt)) => stations.push(Station {
                name: record[0].to_string(),
                lat,
                lon,
                alt,
            }),
            _ if idx == 0 => continue, // header row
            _ => {
                return Err(SarError::Parse(format!(
                    "bad station catalog row {}: {:?}",
                    idx, record
                )))
            }
        }
    }
    Ok(stations)
}

/// The (lon, lat) of a named station from the catalog
pub fn station_lonlat(catalog: &[Station], name: &str) -> SarResult<(f64, f64)> {
    catalog
        .iter()
        .find(|s| s.name == name)
        .map(|s| (s.lon, s.lat))
        .ok_or_else(|| {
            SarError::InvalidParameter(format!("station {} not in the catalog", name))
        })
}

/// Fetch the raw tenv3 file for one station and persist it verbatim to the
/// cache directory. One blocking request, no retry.
pub fn download_station_data(config: &GpsConfig, station: &str) -> SarResult<PathBuf> {
    let url = config.station_url(station);
    log::info!("downloading {} from {}", station, url);
    let response = reqwest::blocking::get(&url)?.error_for_status()?;
    let text = response.text()?;

    fs::create_dir_all(&config.cache_dir)?;
    let path = config.station_cache_file(station);
    log::info!("saving to {}", path.display());
    fs::write(&path, text)?;
    Ok(path)
}

/// Load one station's east/north/up series, downloading into the cache when
/// missing. Values are cleaned per the config: year range applied, scaled to
/// cm, and centered on the mean of the first 10 samples.
pub fn load_station_enu(
    config: &GpsConfig,
    station: &str,
    download_if_missing: bool,
) -> SarResult<EnuSeries> {
    let path = config.station_cache_file(station);
    if !path.exists() {
        log::warn!("{} does not exist", path.display());
        if !download_if_missing {
            return Err(SarError::MissingMetadata(path));
        }
        download_station_data(config, station)?;
    }
    let text = fs::read_to_string(&path)?;
    let raw = parse_tenv3(&text)?;
    Ok(clean_enu(raw, config))
}

/// Parse whitespace-delimited tenv3 text: a header row naming the columns,
/// then one row per day with a `YYMMMDD` date code and east/north/up in
/// meters.
pub fn parse_tenv3(text: &str) -> SarResult<EnuSeries> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| SarError::Parse("empty tenv3 file".to_string()))?;
    let names: Vec<&str> = header.split_whitespace().collect();

    let col = |wanted: &str| -> SarResult<usize> {
        names
            .iter()
            .position(|n| n.trim_matches('_').trim_end_matches("(m)").trim_matches('_') == wanted)
            .ok_or_else(|| SarError::Parse(format!("tenv3 header missing column {}", wanted)))
    };
    let date_idx = col("YYMMMDD")?;
    let east_idx = col("east")?;
    let north_idx = col("north")?;
    let up_idx = col("up")?;

    let mut out = EnuSeries {
        dates: Vec::new(),
        east: Vec::new(),
        north: Vec::new(),
        up: Vec::new(),
    };
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let needed = [date_idx, east_idx, north_idx, up_idx];
        if let Some(&max) = needed.iter().max() {
            if fields.len() <= max {
                return Err(SarError::Parse(format!(
                    "tenv3 line {} has only {} fields",
                    lineno + 2,
                    fields.len()
                )));
            }
        }
        let date = NaiveDate::parse_from_str(fields[date_idx], "%y%b%d")
            .map_err(|e| SarError::Parse(format!("bad date {:?}: {}", fields[date_idx], e)))?;
        let value = |idx: usize| -> SarResult<f64> {
            fields[idx]
                .parse::<f64>()
                .map_err(|_| SarError::Parse(format!("bad value {:?}", fields[idx])))
        };
        out.dates.push(date);
        out.east.push(value(east_idx)?);
        out.north.push(value(north_idx)?);
        out.up.push(value(up_idx)?);
    }
    Ok(out)
}

fn clean_enu(mut enu: EnuSeries, config: &GpsConfig) -> EnuSeries {
    if let Some(cutoff) = config.start_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)) {
        retain_range(&mut enu, |d| d >= cutoff);
    }
    if let Some(cutoff) = config.end_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)) {
        retain_range(&mut enu, |d| d <= cutoff);
    }
    if config.to_cm {
        for vals in [&mut enu.east, &mut enu.north, &mut enu.up] {
            for v in vals.iter_mut() {
                *v *= 100.0;
            }
        }
    }
    // Center each component on the mean of its first 10 samples
    for vals in [&mut enu.east, &mut enu.north, &mut enu.up] {
        let n = vals.len().min(10);
        if n > 0 {
            let start_val = vals[..n].iter().sum::<f64>() / n as f64;
            for v in vals.iter_mut() {
                *v -= start_val;
            }
        }
    }
    enu
}

fn retain_range<F: Fn(NaiveDate) -> bool>(enu: &mut EnuSeries, keep: F) {
    let mask: Vec<bool> = enu.dates.iter().map(|d| keep(*d)).collect();
    let apply = |vals: &mut Vec<f64>, mask: &[bool]| {
        let mut idx = 0;
        vals.retain(|_| {
            let keep = mask[idx];
            idx += 1;
            keep
        });
    };
    apply(&mut enu.east, &mask);
    apply(&mut enu.north, &mask);
    apply(&mut enu.up, &mask);
    let mut idx = 0;
    enu.dates.retain(|_| {
        let keep = mask[idx];
        idx += 1;
        keep
    });
}

/// The ENU component families a caller can extract as a single series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnuComponent {
    East,
    North,
    Up,
}

impl EnuSeries {
    pub fn component(&self, which: EnuComponent) -> SarResult<DateSeries> {
        let values = match which {
            EnuComponent::East => &self.east,
            EnuComponent::North => &self.north,
            EnuComponent::Up => &self.up,
        };
        DateSeries::from_parts(self.dates.clone(), values.clone())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TENV3: &str = "\
site YYMMMDD yyyy.yyyy __MJD week d reflon _e0(m) __east(m) ____n0(m) _north(m) u0(m) ____up(m)
TXKM 14JAN01 2014.0000 56658 1773 3 262.2 -632 0.000000 3749 0.000000 -21 0.000000
TXKM 14JAN02 2014.0027 56659 1773 4 262.2 -632 0.010000 3749 0.020000 -21 0.003000
TXKM 14JAN03 2014.0055 56660 1773 5 262.2 -632 0.020000 3749 0.040000 -21 0.006000
";

    #[test]
    fn test_parse_tenv3_columns() {
        let enu = parse_tenv3(TENV3).unwrap();
        assert_eq!(enu.len(), 3);
        assert_eq!(
            enu.dates[0],
            NaiveDate::from_ymd_opt(2014, 1, 1).unwrap()
        );
        assert_eq!(enu.east, vec![0.0, 0.01, 0.02]);
        assert_eq!(enu.north, vec![0.0, 0.02, 0.04]);
        assert_eq!(enu.up, vec![0.0, 0.003, 0.006]);
    }

    #[test]
    fn test_clean_scales_and_centers() {
        let raw = parse_tenv3(TENV3).unwrap();
        let config = GpsConfig {
            to_cm: true,
            start_year: None,
            ..Default::default()
        };
        let enu = clean_enu(raw, &config);
        // cm scaling, then centered on the mean of the (3) samples
        assert!((enu.east[0] - (-1.0)).abs() < 1e-9);
        assert!((enu.east[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_start_year_filter() {
        let text = TENV3.replace("14JAN01", "12JAN01");
        let raw = parse_tenv3(&text).unwrap();
        let config = GpsConfig {
            start_year: Some(2014),
            to_cm: false,
            ..Default::default()
        };
        let enu = clean_enu(raw, &config);
        assert_eq!(enu.len(), 2);
        assert_eq!(
            enu.dates[0],
            NaiveDate::from_ymd_opt(2014, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_component_extraction() {
        let enu = parse_tenv3(TENV3).unwrap();
        let up = enu.component(EnuComponent::Up).unwrap();
        assert_eq!(up.len(), 3);
        assert_eq!(
            up.get(NaiveDate::from_ymd_opt(2014, 1, 3).unwrap()),
            Some(0.006)
        );
    }

    #[test]
    fn test_catalog_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.csv");
        fs::write(&path, "name,lat,lon,alt\nTXKM,31.1,-103.2,875.0\nNMHB,32.0,-104.0,900.0\n")
            .unwrap();
        let catalog = read_station_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].name, "TXKM");
        assert_eq!(station_lonlat(&catalog, "NMHB").unwrap(), (-104.0, 32.0));
        assert!(station_lonlat(&catalog, "ZZZZ").is_err());
    }

    #[test]
    fn test_cache_file_name_from_url() {
        let config = GpsConfig::default();
        let path = config.station_cache_file("TXKM");
        assert!(path.ends_with("TXKM.NA12.tenv3"), "{:?}", path);
    }

    #[test]
    fn test_load_missing_without_download() {
        let dir = tempdir().unwrap();
        let config = GpsConfig {
            cache_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(load_station_enu(&config, "TXKM", false).is_err());
    }
}
