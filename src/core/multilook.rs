use crate::types::{BandStack, SarError, SarResult};
use ndarray::{s, Array2};
use num_traits::Zero;

/// Row/column look factors for block-average downsampling
pub type Looks = (usize, usize);

/// Looks must be positive; zero would divide away the image. Checked before
/// any file I/O happens.
pub fn validate_looks(looks: Looks) -> SarResult<()> {
    let (r, c) = looks;
    if r < 1 || c < 1 {
        return Err(SarError::InvalidParameter(format!(
            "looks values must be positive integers, got ({}, {})",
            r, c
        )));
    }
    Ok(())
}

/// Downsample by averaging over `row_looks x col_looks` blocks.
///
/// Output dimensions floor-divide the input; trailing rows/cols that do not
/// fill a whole block are discarded. Works for both real and complex pixels.
pub fn take_looks<T>(image: &Array2<T>, looks: Looks) -> SarResult<Array2<T>>
where
    T: Copy + Zero + std::ops::Add<Output = T> + std::ops::Div<f32, Output = T>,
{
    validate_looks(looks)?;
    let (row_looks, col_looks) = looks;
    if row_looks == 1 && col_looks == 1 {
        return Ok(image.clone());
    }

    let (rows, cols) = image.dim();
    let out_rows = rows / row_looks;
    let out_cols = cols / col_looks;
    if out_rows == 0 || out_cols == 0 {
        return Err(SarError::InvalidParameter(format!(
            "looks ({}, {}) too large for a {}x{} image",
            row_looks, col_looks, rows, cols
        )));
    }

    let mut output = Array2::<T>::zeros((out_rows, out_cols));
    let norm = (row_looks * col_looks) as f32;
    for out_row in 0..out_rows {
        for out_col in 0..out_cols {
            let mut sum = T::zero();
            for r_off in 0..row_looks {
                for c_off in 0..col_looks {
                    sum = sum + image[[out_row * row_looks + r_off, out_col * col_looks + c_off]];
                }
            }
            output[[out_row, out_col]] = sum / norm;
        }
    }
    Ok(output)
}

/// Strided subsampling for stacked dual-band products: every `row_step`-th
/// row and `col_step`-th column of both bands, no averaging.
pub fn subsample_stack(stack: &BandStack, looks: Looks) -> SarResult<BandStack> {
    validate_looks(looks)?;
    let (row_step, col_step) = looks;
    Ok(stack
        .slice(s![.., ..;row_step, ..;col_step])
        .to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SarComplex;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    #[test]
    fn test_take_looks_2x2() {
        let img = array![
            [1.0f32, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        let out = take_looks(&img, (2, 2)).unwrap();
        assert_eq!(out.dim(), (2, 2));
        assert_relative_eq!(out[[0, 0]], 3.5);
        assert_relative_eq!(out[[1, 1]], 13.5);
    }

    #[test]
    fn test_take_looks_discards_partial_blocks() {
        let img = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let out = take_looks(&img, (2, 2)).unwrap();
        assert_eq!(out.dim(), (1, 1));
        assert_relative_eq!(out[[0, 0]], 3.0); // mean of [1, 2, 4, 5]
    }

    #[test]
    fn test_take_looks_complex() {
        let img = array![
            [SarComplex::new(1.0, 1.0), SarComplex::new(3.0, -1.0)],
            [SarComplex::new(2.0, 0.0), SarComplex::new(2.0, 0.0)],
        ];
        let out = take_looks(&img, (2, 2)).unwrap();
        assert_relative_eq!(out[[0, 0]].re, 2.0);
        assert_relative_eq!(out[[0, 0]].im, 0.0);
    }

    #[test]
    fn test_zero_looks_rejected() {
        let img = array![[1.0f32]];
        assert!(matches!(
            take_looks(&img, (0, 1)),
            Err(SarError::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_looks((1, 0)),
            Err(SarError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_subsample_stack_strided() {
        let stack = Array3::from_shape_fn((2, 4, 4), |(b, r, c)| (b * 100 + r * 10 + c) as f32);
        let out = subsample_stack(&stack, (2, 2)).unwrap();
        assert_eq!(out.dim(), (2, 2, 2));
        assert_relative_eq!(out[[0, 0, 0]], 0.0);
        assert_relative_eq!(out[[0, 1, 1]], 22.0);
        assert_relative_eq!(out[[1, 1, 1]], 122.0);
    }
}
