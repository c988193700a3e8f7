use crate::types::{RscData, SarError, SarResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parse a `.rsc` sidecar resource descriptor.
///
/// The format is whitespace-separated `KEY value` lines, e.g.
///
/// ```text
/// WIDTH         368
/// FILE_LENGTH   448
/// X_FIRST       -155.676388889
/// X_STEP        0.000138888888
/// ```
///
/// `WIDTH` and `FILE_LENGTH` are required; the geo-grid keys are optional.
pub fn load_rsc(path: &Path) -> SarResult<RscData> {
    let text = fs::read_to_string(path)?;
    parse_rsc(&text).map_err(|e| SarError::Parse(format!("{}: {}", path.display(), e)))
}

/// Parse rsc key-value text that has already been read
pub fn parse_rsc(text: &str) -> Result<RscData, String> {
    let mut kv = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let key = match parts.next() {
            Some(k) => k.to_uppercase(),
            None => continue,
        };
        let value = parts.next().unwrap_or("").to_string();
        kv.insert(key, value);
    }

    let width = required_usize(&kv, "WIDTH")?;
    let file_length = required_usize(&kv, "FILE_LENGTH")?;

    Ok(RscData {
        width,
        file_length,
        x_first: optional_f64(&kv, "X_FIRST")?,
        y_first: optional_f64(&kv, "Y_FIRST")?,
        x_step: optional_f64(&kv, "X_STEP")?,
        y_step: optional_f64(&kv, "Y_STEP")?,
    })
}

fn required_usize(kv: &HashMap<String, String>, key: &str) -> Result<usize, String> {
    let raw = kv.get(key).ok_or_else(|| format!("missing key {}", key))?;
    raw.parse::<usize>()
        .map_err(|_| format!("bad value for {}: {}", key, raw))
}

fn optional_f64(kv: &HashMap<String, String>, key: &str) -> Result<Option<f64>, String> {
    match kv.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("bad value for {}: {}", key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rsc_full() {
        let text = "\
WIDTH         368
FILE_LENGTH   448
X_FIRST       -155.676388889
Y_FIRST       19.5755555567
X_STEP        0.000138888888
Y_STEP        -0.000138888888
X_UNIT        degrees
";
        let rsc = parse_rsc(text).expect("parse failed");
        assert_eq!(rsc.width, 368);
        assert_eq!(rsc.file_length, 448);
        assert!(rsc.x_first.unwrap() < -155.0);
        assert!(rsc.y_step.unwrap() < 0.0);
    }

    #[test]
    fn test_parse_rsc_minimal() {
        let rsc = parse_rsc("WIDTH 4\nFILE_LENGTH 2\n").unwrap();
        assert_eq!(rsc, RscData::new(4, 2));
    }

    #[test]
    fn test_parse_rsc_missing_width() {
        assert!(parse_rsc("FILE_LENGTH 2\n").is_err());
    }
}
