//! Core time-series processing modules

pub mod align;
pub mod combine;
pub mod detrend;
pub mod multilook;

// Re-export main types
pub use align::{daily_axis, daily_range, DateSeries, JoinedTable};
pub use combine::{CombineParams, SeriesCombiner};
pub use detrend::{fit, fitted_final_value, flat_std, residual_std, LinearModel};
pub use multilook::{subsample_stack, take_looks, Looks};
