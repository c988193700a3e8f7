use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complex-valued SAR pixel type (real + j*imag, 2x f32 on disk)
pub type SarComplex = Complex<f32>;

/// Real-valued amplitude, correlation or phase data
pub type SarReal = f32;

/// 2D complex raster (rows x cols)
pub type ComplexImage = Array2<SarComplex>;

/// 2D real raster (rows x cols)
pub type RealImage = Array2<SarReal>;

/// 3D stack for dual-band products: [band, rows, cols] with band 0 = amplitude
pub type BandStack = Array3<SarReal>;

/// Whether a file stores one float per pixel or an interleaved real/imag pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Real,
    Complex,
}

/// Sidecar resource descriptor (`.rsc`), the Sentinel-processing metadata
/// source. Only `width`/`file_length` are required for decoding; the grid
/// keys are carried through for callers that georeference the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RscData {
    pub width: usize,
    pub file_length: usize,
    pub x_first: Option<f64>,
    pub y_first: Option<f64>,
    pub x_step: Option<f64>,
    pub y_step: Option<f64>,
}

impl RscData {
    pub fn new(width: usize, file_length: usize) -> Self {
        Self {
            width,
            file_length,
            x_first: None,
            y_first: None,
            x_step: None,
            y_step: None,
        }
    }
}

/// Metadata parsed from a UAVSAR annotation (`.ann`) file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnInfo {
    pub rows: usize,
    pub cols: usize,
}

/// One GPS ground station from the station catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

/// East/north/up displacement series for one station, daily sampled with gaps
#[derive(Debug, Clone)]
pub struct EnuSeries {
    pub dates: Vec<NaiveDate>,
    pub east: Vec<f64>,
    pub north: Vec<f64>,
    pub up: Vec<f64>,
}

/// Error types for raster I/O and time-series processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid number of cols ({cols}) for {n_samples} samples")]
    SizeMismatch { cols: usize, n_samples: usize },

    #[error("Need either rsc data or annotation info to size {0}, but both were supplied")]
    AmbiguousMetadata(PathBuf),

    #[error("No metadata source for {0}: need an .rsc or .ann file for the width")]
    MissingMetadata(PathBuf),

    #[error("{path} has multiple .rsc files in its directory: {candidates:?}")]
    AmbiguousSidecar {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid array shape: {0}")]
    InvalidShape(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Reference station {0} has no columns in the joined table")]
    UnknownReference(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for all sarlink operations
pub type SarResult<T> = Result<T, SarError>;
