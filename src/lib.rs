//! sarlink: binary raster I/O for InSAR products plus GPS/InSAR
//! time-series merging
//!
//! The I/O layer reads and writes the flat little-endian float formats used
//! by Sentinel and UAVSAR interferometry pipelines (real, complex, and
//! stacked dual-band layouts), dispatched by file extension. The core layer
//! aligns GPS daily displacement records with InSAR epoch series onto one
//! daily-gridded table, fits linear trends, and prunes stations with
//! unusable coverage.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AnnInfo, BandStack, ComplexImage, EnuSeries, RealImage, RscData, SampleKind, SarComplex,
    SarError, SarReal, SarResult, Station,
};

pub use io::{DeformationStore, FormatFamily, GpsConfig, LoadOptions, Loaded, RasterCodec};

pub use crate::core::{DateSeries, JoinedTable, LinearModel, SeriesCombiner};
