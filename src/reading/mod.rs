pub mod grib;
pub mod sounding;

pub use grib::{GribReader, GridField, GridReader};
pub use sounding::{read_sounding, SoundingLevel};
