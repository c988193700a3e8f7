use crate::types::{SarError, SarResult};
use ndarray::{Array1, Array2, Array3, ArrayView};
use ndarray::Dimension;
use std::fs;
use std::path::Path;

/// Minimal NumPy `.npy` (format version 1.0) reader/writer for f32 arrays in
/// C order, little endian. Covers the passthrough-array format and the
/// deformation-store datasets; this is not a general npy implementation.
const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

fn build_header(shape: &[usize]) -> Vec<u8> {
    let shape_str = match shape.len() {
        1 => format!("({},)", shape[0]),
        _ => format!(
            "({})",
            shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': {}, }}",
        shape_str
    );
    // Pad with spaces so that magic + version + len + header is 64-aligned,
    // ending in a newline as numpy does
    let unpadded = NPY_MAGIC.len() + 2 + 2 + dict.len() + 1;
    let pad = (64 - unpadded % 64) % 64;
    dict.push_str(&" ".repeat(pad));
    dict.push('\n');

    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + dict.len());
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[0x01, 0x00]); // version 1.0
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}

fn write_npy_raw(path: &Path, shape: &[usize], data: &[f32]) -> SarResult<()> {
    let n: usize = shape.iter().product();
    if n != data.len() {
        return Err(SarError::InvalidShape(format!(
            "npy write: shape {:?} does not hold {} samples",
            shape,
            data.len()
        )));
    }
    let mut bytes = build_header(shape);
    bytes.reserve(data.len() * 4);
    for v in data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Write an ndarray of any supported rank
pub fn write_npy<D: Dimension>(path: &Path, array: ArrayView<'_, f32, D>) -> SarResult<()> {
    let shape: Vec<usize> = array.shape().to_vec();
    let data: Vec<f32> = array.iter().copied().collect();
    write_npy_raw(path, &shape, &data)
}

/// Read any f32 `.npy` file, returning its shape and flat C-order samples
pub fn read_npy_raw(path: &Path) -> SarResult<(Vec<usize>, Vec<f32>)> {
    let bytes = fs::read(path)?;
    let bad = |msg: &str| SarError::Parse(format!("{}: {}", path.display(), msg));

    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(bad("not an npy file"));
    }
    if bytes[6] != 1 {
        return Err(bad("unsupported npy format version"));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = 10 + header_len;
    if bytes.len() < data_start {
        return Err(bad("truncated npy header"));
    }
    let header = std::str::from_utf8(&bytes[10..data_start])
        .map_err(|_| bad("npy header is not utf-8"))?;

    if !header.contains("'<f4'") {
        return Err(bad("only '<f4' npy arrays are supported"));
    }
    if header.contains("'fortran_order': True") {
        return Err(bad("fortran-order npy arrays are not supported"));
    }
    let shape = parse_shape(header).ok_or_else(|| bad("could not parse npy shape"))?;

    let n: usize = shape.iter().product();
    let payload = &bytes[data_start..];
    if payload.len() != n * 4 {
        return Err(bad("npy payload size does not match its shape"));
    }
    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((shape, data))
}

fn parse_shape(header: &str) -> Option<Vec<usize>> {
    let start = header.find("'shape':")?;
    let rest = &header[start..];
    let open = rest.find('(')?;
    let close = rest.find(')')?;
    let inner = &rest[open + 1..close];
    inner
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<usize>().ok())
        .collect()
}

pub fn read_npy_1d(path: &Path) -> SarResult<Array1<f32>> {
    let (shape, data) = read_npy_raw(path)?;
    if shape.len() != 1 {
        return Err(SarError::InvalidShape(format!(
            "expected 1D npy, got shape {:?}",
            shape
        )));
    }
    Ok(Array1::from_vec(data))
}

pub fn read_npy_2d(path: &Path) -> SarResult<Array2<f32>> {
    let (shape, data) = read_npy_raw(path)?;
    if shape.len() != 2 {
        return Err(SarError::InvalidShape(format!(
            "expected 2D npy, got shape {:?}",
            shape
        )));
    }
    Array2::from_shape_vec((shape[0], shape[1]), data)
        .map_err(|e| SarError::InvalidShape(e.to_string()))
}

pub fn read_npy_3d(path: &Path) -> SarResult<Array3<f32>> {
    let (shape, data) = read_npy_raw(path)?;
    if shape.len() != 3 {
        return Err(SarError::InvalidShape(format!(
            "expected 3D npy, got shape {:?}",
            shape
        )));
    }
    Array3::from_shape_vec((shape[0], shape[1], shape[2]), data)
        .map_err(|e| SarError::InvalidShape(e.to_string()))
}
