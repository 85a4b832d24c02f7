use ndarray::Axis;

use crate::error::{Error, Result};

use super::config::CalibrationConfig;
use super::normalizer::Normalizer;
use super::store;
use super::types::CalibrationSample;

/// Produces one [`CalibrationSample`] per calibration iteration, re-reading the
/// data file on every call.
#[derive(Debug, Clone)]
pub struct CalibrationLoader {
    config: CalibrationConfig,
    normalizer: Normalizer,
}

impl CalibrationLoader {
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::from_config(&config);
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    // the iteration index is only logged, every call yields the same batch
    pub fn read_image(&self, iteration: usize) -> Result<CalibrationSample> {
        let path = &self.config.data_file;
        let field = &self.config.field;
        tracing::debug!(iteration, "reading `{field}` from {}", path.display());

        let images = store::read_field(path, field)?;
        tracing::info!("got data with shape {:?}", images.shape());

        let normalized = self.normalizer.normalize_and_rgb(&images.view())?;
        for index in &normalized.degenerate {
            tracing::warn!(
                iteration,
                "image {index} has zero total intensity, handled with {:?} policy",
                self.normalizer.policy()
            );
        }

        if normalized.batch.len_of(Axis(0)) == 0 {
            return Err(Error::EmptyBatch);
        }

        Ok(CalibrationSample::new(
            self.config.input_name.as_str(),
            normalized.batch,
        ))
    }
}

/// One-shot entry point for harnesses that call a plain function per iteration.
pub fn read_image(config: &CalibrationConfig, iteration: usize) -> Result<CalibrationSample> {
    CalibrationLoader::new(config.clone())?.read_image(iteration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_config() {
        let config = CalibrationConfig::default().with_input_name("");
        assert!(matches!(
            CalibrationLoader::new(config),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_missing_data_file() {
        let config = CalibrationConfig::default().with_data_file("missing/calibration.npz");
        let loader = CalibrationLoader::new(config).unwrap();
        assert!(matches!(
            loader.read_image(0),
            Err(Error::FileAccess { .. })
        ));
    }
}
