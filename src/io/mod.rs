//! I/O modules: binary raster codec, format dispatch, metadata sidecars,
//! the deformation-stack store, and the GPS station data source

pub mod annotation;
pub mod dem;
pub mod format;
pub mod gps;
pub mod npy;
pub mod raster;
pub mod rsc;
pub mod store;

// Re-export main types
pub use format::{is_complex, load, save, FormatFamily, LoadOptions, Loaded};
pub use gps::{read_station_catalog, station_lonlat, EnuComponent, GpsConfig};
pub use raster::RasterCodec;
pub use rsc::load_rsc;
pub use store::DeformationStore;
