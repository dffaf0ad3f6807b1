mod exports;
pub use exports::*;

pub mod error;
pub mod reference;
pub mod raster;
pub mod ipol;
pub mod waxs;
pub mod polarization;
pub mod image;
pub mod regroup;
pub mod config;
pub mod io;
pub mod job;
pub mod logger;
pub mod utils;
