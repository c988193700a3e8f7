use crate::types::{RealImage, SarError, SarResult};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Loader for elevation rasters (`.dem`, `.hgt`): flat little-endian 16-bit
/// signed integers, one sample per pixel. These carry their own loader rather
/// than going through the f32 raster codec.
pub fn load_elevation(path: &Path, cols: usize) -> SarResult<RealImage> {
    let bytes = fs::read(path)?;
    if bytes.len() % 2 != 0 {
        return Err(SarError::SizeMismatch {
            cols,
            n_samples: bytes.len(),
        });
    }
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32)
        .collect();
    if cols == 0 || samples.len() % cols != 0 {
        return Err(SarError::SizeMismatch {
            cols,
            n_samples: samples.len(),
        });
    }
    let rows = samples.len() / cols;
    Array2::from_shape_vec((rows, cols), samples)
        .map_err(|e| SarError::InvalidShape(e.to_string()))
}

/// Write an elevation raster back out as little-endian i16, truncating each
/// sample toward zero
pub fn save_elevation(path: &Path, dem: &RealImage) -> SarResult<()> {
    let mut bytes = Vec::with_capacity(dem.len() * 2);
    for v in dem.iter() {
        bytes.extend_from_slice(&(*v as i16).to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_elevation_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elevation.dem");
        let dem = array![[100.0f32, -32.0, 0.0], [1500.0, 8.0, -1.0]];
        save_elevation(&path, &dem).unwrap();
        let back = load_elevation(&path, 3).unwrap();
        assert_eq!(back, dem);
    }

    #[test]
    fn test_elevation_bad_width() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elevation.hgt");
        std::fs::write(&path, [0u8; 12]).unwrap(); // 6 samples
        assert!(matches!(
            load_elevation(&path, 4),
            Err(SarError::SizeMismatch { .. })
        ));
        assert!(load_elevation(&path, 3).is_ok());
    }
}
