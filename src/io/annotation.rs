use crate::types::{AnnInfo, SarResult};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Cross-polarization products are complex; co-pol power products are real.
/// See the UAVSAR PolSAR format description.
pub const COMPLEX_POLS: [&str; 3] = ["HHHV", "HHVV", "HVVV"];
pub const REAL_POLS: [&str; 3] = ["HHHH", "HVHV", "VVVV"];

/// True if the filename carries one of the complex polarization tokens
pub fn has_complex_pol(filename: &str) -> bool {
    COMPLEX_POLS.iter().any(|pol| filename.contains(pol))
}

/// A candidate annotation flavor. Parsers are tried in a fixed order and the
/// first one that understands the text wins; none succeeding leaves the
/// metadata unresolved for the caller to report.
trait AnnParser {
    fn parse(&self, text: &str, data_filename: &str) -> Option<AnnInfo>;
}

/// PolSAR-style annotations: `<product>.set_rows (pixels) = 61349` lines,
/// keyed by the data file's extension (`slc`, `mlc`, `grd`, ...).
struct PolsarAnnParser;

impl AnnParser for PolsarAnnParser {
    fn parse(&self, text: &str, data_filename: &str) -> Option<AnnInfo> {
        let ext = Path::new(data_filename)
            .extension()
            .and_then(|e| e.to_str())?;
        // Power products key their size under `<ext>_pwr`
        for prefix in [ext.to_string(), format!("{}_pwr", ext)] {
            let rows = ann_value(text, &format!(r"{}\.set_rows", regex::escape(&prefix)));
            let cols = ann_value(text, &format!(r"{}\.set_cols", regex::escape(&prefix)));
            if let (Some(rows), Some(cols)) = (rows, cols) {
                return Some(AnnInfo { rows, cols });
            }
        }
        None
    }
}

/// Interferometric (ground-projected) annotations: sizes live under
/// `Ground Range Data Latitude Lines` / `... Longitude Samples`.
struct InterferogramAnnParser;

impl AnnParser for InterferogramAnnParser {
    fn parse(&self, text: &str, _data_filename: &str) -> Option<AnnInfo> {
        let rows = ann_value(text, r"Ground Range Data Latitude Lines")?;
        let cols = ann_value(text, r"Ground Range Data Longitude Samples")?;
        Some(AnnInfo { rows, cols })
    }
}

fn ann_value(text: &str, key_pattern: &str) -> Option<usize> {
    // Lines look like: `key (units) = 12345 ; comment`
    let re = Regex::new(&format!(r"(?m)^\s*{}[^=\n]*=\s*(\d+)", key_pattern)).ok()?;
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Parse annotation text for the sizing of `data_filename`, trying each known
/// flavor in order. Returns `None` when no parser matches; the dispatcher
/// turns that into `MissingMetadata` if no other source resolves.
pub fn parse_ann_text(text: &str, data_filename: &str) -> Option<AnnInfo> {
    let parsers: [&dyn AnnParser; 2] = [&PolsarAnnParser, &InterferogramAnnParser];
    for parser in parsers {
        if let Some(info) = parser.parse(text, data_filename) {
            return Some(info);
        }
    }
    log::debug!("no annotation flavor matched for {}", data_filename);
    None
}

/// Load and parse the `.ann` file next to `data_path` (same stem, `.ann`
/// extension). Missing or unparseable annotations resolve to `Ok(None)`;
/// an unreadable file that exists is an I/O error.
pub fn find_ann_info(data_path: &Path) -> SarResult<Option<AnnInfo>> {
    let ann_path = data_path.with_extension("ann");
    if !ann_path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&ann_path)?;
    let filename = data_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(parse_ann_text(&text, filename))
}
