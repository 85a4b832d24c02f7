pub mod calibration;
pub mod error;
pub mod utils;

pub use calibration::{CalibrationConfig, CalibrationLoader, CalibrationSample};
pub use error::{Error, Result};
