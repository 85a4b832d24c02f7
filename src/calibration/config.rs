use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Input-tensor name the downstream model graph expects.
pub const DEFAULT_INPUT_NAME: &str = "Placeholder";
pub const DEFAULT_FIELD: &str = "img_pt";
#[cfg(feature = "hdf5")]
pub const DEFAULT_DATA_FILE: &str = "../data/converted/rotation_224_v1/test_file_0.h5";
#[cfg(not(feature = "hdf5"))]
pub const DEFAULT_DATA_FILE: &str = "../data/converted/rotation_224_v1/test_file_0.npz";
pub const DEFAULT_INTENSITY_SCALE: f32 = 255.0;

/// What to do with an image whose total intensity is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Emit an all-zero image.
    #[default]
    Zero,
    /// Drop the image from the batch.
    Skip,
    /// Fail the whole read.
    Error,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Backing `.npz` / `.npy` (or `.h5` with the `hdf5` feature) file
    pub data_file: PathBuf,

    /// Array name inside the archive, e.g. `img_pt` or `group/img_pt`
    pub field: String,

    pub input_name: String,

    /// Total intensity every normalized image sums to
    pub intensity_scale: f32,

    /// Totals with magnitude at or below this are degenerate
    pub epsilon: f64,

    pub degenerate: DegeneratePolicy,
}

impl CalibrationConfig {
    pub fn from_file(p: &Path) -> Result<Self> {
        let file = File::open(p).map_err(|source| Error::FileAccess {
            path: p.to_path_buf(),
            source,
        })?;
        let config: CalibrationConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| Error::Config {
                path: p.to_path_buf(),
                source,
            })?;

        Ok(config)
    }

    pub fn with_data_file<P: Into<PathBuf>>(mut self, data_file: P) -> Self {
        self.data_file = data_file.into();
        self
    }

    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_input_name<S: Into<String>>(mut self, input_name: S) -> Self {
        self.input_name = input_name.into();
        self
    }

    pub fn with_intensity_scale(mut self, intensity_scale: f32) -> Self {
        self.intensity_scale = intensity_scale;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_degenerate(mut self, degenerate: DegeneratePolicy) -> Self {
        self.degenerate = degenerate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(Error::invalid_parameter("field", "must not be empty"));
        }

        if self.input_name.is_empty() {
            return Err(Error::invalid_parameter("input_name", "must not be empty"));
        }

        if !self.intensity_scale.is_finite() || self.intensity_scale <= 0.0 {
            return Err(Error::invalid_parameter(
                "intensity_scale",
                "must be a positive finite number",
            ));
        }

        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::invalid_parameter(
                "epsilon",
                "must be a non-negative finite number",
            ));
        }

        Ok(())
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            field: DEFAULT_FIELD.to_string(),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            intensity_scale: DEFAULT_INTENSITY_SCALE,
            epsilon: 0.0,
            degenerate: DegeneratePolicy::Zero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CalibrationConfig::default();
        assert_eq!(config.input_name, "Placeholder");
        assert_eq!(config.field, "img_pt");
        assert_eq!(config.intensity_scale, 255.0);
        assert_eq!(config.degenerate, DegeneratePolicy::Zero);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn test_default_data_file_is_hdf5() {
        let config = CalibrationConfig::default();
        assert_eq!(config.data_file.extension().unwrap(), "h5");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "data_file": "calib.npz", "field": "train/img_pt", "degenerate": "skip" }"#;
        let config: CalibrationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.data_file, PathBuf::from("calib.npz"));
        assert_eq!(config.field, "train/img_pt");
        assert_eq!(config.degenerate, DegeneratePolicy::Skip);
        assert_eq!(config.input_name, "Placeholder");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            CalibrationConfig::default().with_field(""),
            CalibrationConfig::default().with_input_name(""),
            CalibrationConfig::default().with_intensity_scale(0.0),
            CalibrationConfig::default().with_intensity_scale(f32::NAN),
            CalibrationConfig::default().with_epsilon(-1e-6),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_missing_config_file() {
        let err = CalibrationConfig::from_file(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }
}
