use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read calibration data from {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported data file {path}: expected .npz, .npy, or .h5 (with the `hdf5` feature)")]
    UnsupportedFormat { path: PathBuf },
    #[error("field `{field}`: {reason}")]
    Schema { field: String, reason: String },
    #[error("invalid image batch shape: expected {expected}, got {actual}")]
    InvalidShape { expected: String, actual: String },
    #[error("image {index} has zero total intensity")]
    DegenerateImage { index: usize },
    #[error("no images left in the calibration batch")]
    EmptyBatch,
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(field: &str, reason: impl Into<String>) -> Self {
        Error::Schema {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
