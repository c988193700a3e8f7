use crate::types::{
    AnnInfo, BandStack, ComplexImage, RealImage, RscData, SarComplex, SarError, SarResult,
};
use ndarray::{s, Array2, Array3};
use std::path::Path;

/// Codec for flat binary pixel files: little-endian 32-bit floats on disk,
/// in three layouts (real, interleaved complex, stacked dual-band).
pub struct RasterCodec;

impl RasterCodec {
    /// Interpret raw bytes as little-endian f32 samples.
    ///
    /// The byte length must be a multiple of 4; decoding goes through
    /// `f32::from_le_bytes` so big-endian hosts get swapped for free.
    pub fn bytes_to_f32(bytes: &[u8]) -> SarResult<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(SarError::SizeMismatch {
                cols: 4,
                n_samples: bytes.len(),
            });
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Serialize f32 samples back to little-endian bytes
    pub fn f32_to_bytes(samples: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples.len() * 4);
        for v in samples {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Decode a real 4-byte-per-pixel file into a 2D array.
    ///
    /// Sample count must be an exact multiple of `cols`; anything else means
    /// corrupt data or wrong metadata and is fatal.
    pub fn decode_real(bytes: &[u8], cols: usize) -> SarResult<RealImage> {
        let data = Self::bytes_to_f32(bytes)?;
        Self::assert_valid_size(data.len(), cols)?;
        let rows = data.len() / cols;
        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| SarError::InvalidShape(e.to_string()))
    }

    /// Decode an interleaved real/imag file into a complex 2D array.
    ///
    /// Floats alternate real, imag; the size rule applies to the raw float
    /// stream before de-interleaving, and the de-interleaved pixel count must
    /// divide by `cols` as well.
    pub fn decode_complex(bytes: &[u8], cols: usize) -> SarResult<ComplexImage> {
        let data = Self::bytes_to_f32(bytes)?;
        Self::assert_valid_size(data.len(), cols)?;
        if data.len() % 2 != 0 || (data.len() / 2) % cols != 0 {
            return Err(SarError::SizeMismatch {
                cols,
                n_samples: data.len(),
            });
        }
        let rows = data.len() / 2 / cols;
        let pixels: Vec<SarComplex> = data
            .chunks_exact(2)
            .map(|ri| SarComplex::new(ri[0], ri[1]))
            .collect();
        Array2::from_shape_vec((rows, cols), pixels)
            .map_err(|e| SarError::InvalidShape(e.to_string()))
    }

    /// Decode a stacked dual-band file (.unw, .cc, ...) into `[2, rows, cols]`.
    ///
    /// Each row on disk holds `cols` amplitude floats followed by `cols`
    /// phase/correlation floats. Band 0 is amplitude, band 1 is the data band.
    pub fn decode_stacked(bytes: &[u8], cols: usize) -> SarResult<BandStack> {
        let data = Self::bytes_to_f32(bytes)?;
        Self::assert_valid_size(data.len(), cols)?;
        if data.len() % (2 * cols) != 0 {
            return Err(SarError::SizeMismatch {
                cols,
                n_samples: data.len(),
            });
        }
        let rows = data.len() / (2 * cols);
        let wide = Array2::from_shape_vec((rows, 2 * cols), data)
            .map_err(|e| SarError::InvalidShape(e.to_string()))?;
        let mut out = Array3::<f32>::zeros((2, rows, cols));
        out.slice_mut(s![0, .., ..])
            .assign(&wide.slice(s![.., ..cols]));
        out.slice_mut(s![1, .., ..])
            .assign(&wide.slice(s![.., cols..]));
        Ok(out)
    }

    /// Decode a stacked file and keep only the data band (band 1), the usual
    /// case when the amplitude is not needed.
    pub fn decode_stacked_data_band(bytes: &[u8], cols: usize) -> SarResult<RealImage> {
        let stack = Self::decode_stacked(bytes, cols)?;
        Ok(stack.slice(s![1, .., ..]).to_owned())
    }

    /// Encode a real 2D array as raw little-endian floats
    pub fn encode_real(array: &RealImage) -> Vec<u8> {
        let flat: Vec<f32> = array.iter().copied().collect();
        Self::f32_to_bytes(&flat)
    }

    /// Encode a complex 2D array by re-interleaving real/imag floats
    pub fn encode_complex(array: &ComplexImage) -> Vec<u8> {
        let mut flat = Vec::with_capacity(array.len() * 2);
        for px in array.iter() {
            flat.push(px.re);
            flat.push(px.im);
        }
        Self::f32_to_bytes(&flat)
    }

    /// Encode a 2-band stack with bands side by side per row.
    ///
    /// Fails with `InvalidShape` unless the input has exactly two bands.
    pub fn encode_stacked(stack: &BandStack) -> SarResult<Vec<u8>> {
        let (bands, rows, cols) = stack.dim();
        if bands != 2 {
            return Err(SarError::InvalidShape(format!(
                "stacked encode needs a [2, rows, cols] array, got {} bands",
                bands
            )));
        }
        let mut flat = Vec::with_capacity(2 * rows * cols);
        for r in 0..rows {
            flat.extend(stack.slice(s![0, r, ..]).iter().copied());
            flat.extend(stack.slice(s![1, r, ..]).iter().copied());
        }
        Ok(Self::f32_to_bytes(&flat))
    }

    /// Resolve rows/cols from exactly one metadata source.
    ///
    /// Supplying both descriptors is as fatal as supplying neither: a file
    /// sized off the wrong source decodes into garbage silently.
    pub fn resolve_rows_cols(
        path: &Path,
        rsc_data: Option<&RscData>,
        ann_info: Option<&AnnInfo>,
    ) -> SarResult<(usize, usize)> {
        match (rsc_data, ann_info) {
            (Some(_), Some(_)) => Err(SarError::AmbiguousMetadata(path.to_path_buf())),
            (Some(rsc), None) => Ok((rsc.file_length, rsc.width)),
            (None, Some(ann)) => Ok((ann.rows, ann.cols)),
            (None, None) => Err(SarError::MissingMetadata(path.to_path_buf())),
        }
    }

    fn assert_valid_size(n_samples: usize, cols: usize) -> SarResult<()> {
        if cols == 0 || n_samples % cols != 0 {
            return Err(SarError::SizeMismatch { cols, n_samples });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn to_bytes(vals: &[f32]) -> Vec<u8> {
        RasterCodec::f32_to_bytes(vals)
    }

    #[test]
    fn test_real_round_trip() {
        let vals: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let bytes = to_bytes(&vals);
        let img = RasterCodec::decode_real(&bytes, 4).expect("decode failed");
        assert_eq!(img.dim(), (3, 4));
        assert_relative_eq!(img[[2, 3]], 11.0);
        assert_eq!(RasterCodec::encode_real(&img), bytes);
    }

    #[test]
    fn test_complex_round_trip() {
        // 2x2 complex image: 8 floats interleaved re, im
        let vals = vec![1.0f32, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0];
        let bytes = to_bytes(&vals);
        let img = RasterCodec::decode_complex(&bytes, 2).expect("decode failed");
        assert_eq!(img.dim(), (1, 2));
        assert_relative_eq!(img[[0, 0]].re, 1.0);
        assert_relative_eq!(img[[0, 0]].im, -1.0);
        assert_relative_eq!(img[[0, 1]].re, 2.0);
        assert_eq!(RasterCodec::encode_complex(&img), bytes);
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let bytes = to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for cols in [2usize, 3, 4] {
            let err = RasterCodec::decode_real(&bytes, cols).unwrap_err();
            assert!(matches!(err, SarError::SizeMismatch { .. }), "cols={}", cols);
        }
        // 5 floats do divide by 5, that one is fine
        assert!(RasterCodec::decode_real(&bytes, 5).is_ok());
    }

    #[test]
    fn test_complex_pixel_count_must_divide_cols() {
        // 6 floats divide by cols=2, but the 3 de-interleaved pixels do not
        let bytes = to_bytes(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        let err = RasterCodec::decode_complex(&bytes, 2).unwrap_err();
        assert!(matches!(
            err,
            SarError::SizeMismatch { cols: 2, n_samples: 6 }
        ));
        assert!(RasterCodec::decode_complex(&bytes, 3).is_ok());
    }

    #[test]
    fn test_truncated_byte_stream() {
        let mut bytes = to_bytes(&[1.0, 2.0]);
        bytes.pop();
        assert!(RasterCodec::decode_real(&bytes, 1).is_err());
    }

    #[test]
    fn test_stacked_layout() {
        // rows=2, cols=3: amp strip then phase strip per row
        let vals = vec![
            10.0f32, 11.0, 12.0, 0.1, 0.2, 0.3, // row 0
            20.0, 21.0, 22.0, 0.4, 0.5, 0.6, // row 1
        ];
        let bytes = to_bytes(&vals);
        let stack = RasterCodec::decode_stacked(&bytes, 3).expect("decode failed");
        assert_eq!(stack.dim(), (2, 2, 3));
        assert_relative_eq!(stack[[0, 0, 0]], 10.0);
        assert_relative_eq!(stack[[0, 1, 2]], 22.0);
        assert_relative_eq!(stack[[1, 0, 0]], 0.1);
        assert_relative_eq!(stack[[1, 1, 2]], 0.6);

        let phase = RasterCodec::decode_stacked_data_band(&bytes, 3).unwrap();
        assert_eq!(phase.dim(), (2, 3));
        assert_relative_eq!(phase[[0, 1]], 0.2);

        assert_eq!(RasterCodec::encode_stacked(&stack).unwrap(), bytes);
    }

    #[test]
    fn test_stacked_encode_needs_two_bands() {
        let stack = Array3::<f32>::zeros((3, 2, 2));
        assert!(matches!(
            RasterCodec::encode_stacked(&stack),
            Err(SarError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_metadata_resolution_exactly_one_source() {
        let path = Path::new("igram.unw");
        let rsc = RscData::new(3, 2);
        let ann = AnnInfo { rows: 2, cols: 3 };

        assert_eq!(
            RasterCodec::resolve_rows_cols(path, Some(&rsc), None).unwrap(),
            (2, 3)
        );
        assert_eq!(
            RasterCodec::resolve_rows_cols(path, None, Some(&ann)).unwrap(),
            (2, 3)
        );
        assert!(matches!(
            RasterCodec::resolve_rows_cols(path, Some(&rsc), Some(&ann)),
            Err(SarError::AmbiguousMetadata(_))
        ));
        assert!(matches!(
            RasterCodec::resolve_rows_cols(path, None, None),
            Err(SarError::MissingMetadata(_))
        ));
    }
}
