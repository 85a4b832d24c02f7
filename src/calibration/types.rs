use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Axis;
use npyz::{npz::NpzWriter, WriterBuilder};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::array::leading_sums;
use crate::utils::bytes::array_to_bytes;

use super::normalizer::NormalizedBatch;

/// Input-name to tensor mapping handed to the calibration harness.
#[derive(Debug, Clone)]
pub struct CalibrationSample {
    inputs: HashMap<String, NormalizedBatch>,
}

/// Summary of one sample input, for logs and `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct TensorStats {
    pub shape: Vec<usize>,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub non_finite: usize,
    // one channel per image
    pub image_sums: Vec<f64>,
}

impl TensorStats {
    pub fn of(batch: &NormalizedBatch) -> Self {
        let min = batch.iter().copied().fold(f32::INFINITY, f32::min);
        let max = batch.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let total: f64 = batch.iter().map(|&x| f64::from(x)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = if batch.is_empty() { 0.0 } else { total / batch.len() as f64 };

        #[allow(clippy::cast_precision_loss)]
        let channels = batch.shape().last().copied().unwrap_or(1).max(1) as f64;
        let image_sums = leading_sums(&batch.view())
            .into_iter()
            .map(|sum| sum / channels)
            .collect();

        Self {
            shape: batch.shape().to_vec(),
            min,
            max,
            mean,
            non_finite: batch.iter().filter(|x| !x.is_finite()).count(),
            image_sums,
        }
    }
}

impl CalibrationSample {
    pub fn new<S: Into<String>>(input_name: S, batch: NormalizedBatch) -> Self {
        Self {
            inputs: HashMap::from([(input_name.into(), batch)]),
        }
    }

    pub fn get(&self, input_name: &str) -> Option<&NormalizedBatch> {
        self.inputs.get(input_name)
    }

    pub fn inputs(&self) -> &HashMap<String, NormalizedBatch> {
        &self.inputs
    }

    pub fn into_inputs(self) -> HashMap<String, NormalizedBatch> {
        self.inputs
    }

    pub fn batch_size(&self) -> usize {
        self.inputs
            .values()
            .next()
            .map_or(0, |batch| batch.len_of(Axis(0)))
    }

    pub fn stats(&self) -> BTreeMap<String, TensorStats> {
        self.inputs
            .iter()
            .map(|(name, batch)| (name.clone(), TensorStats::of(batch)))
            .collect()
    }

    fn sorted_inputs(&self) -> Vec<(&String, &NormalizedBatch)> {
        let mut inputs: Vec<_> = self.inputs.iter().collect();
        inputs.sort_by(|a, b| a.0.cmp(b.0));
        inputs
    }

    /// Write every input as an `f32` array of an `.npz` archive.
    pub fn write_npz(&self, path: &Path) -> Result<()> {
        let file_access = |source| Error::FileAccess {
            path: path.to_path_buf(),
            source,
        };

        let mut npz = NpzWriter::create(path).map_err(file_access)?;
        for (name, batch) in self.sorted_inputs() {
            let shape: Vec<u64> = batch.shape().iter().map(|&d| d as u64).collect();
            let mut writer = npz
                .array(name, Default::default())
                .map_err(file_access)?
                .default_dtype()
                .shape(&shape)
                .begin_nd()
                .map_err(file_access)?;
            writer.extend(batch.iter().copied()).map_err(file_access)?;
            writer.finish().map_err(file_access)?;
        }

        tracing::debug!("wrote {} input(s) to {}", self.inputs.len(), path.display());
        Ok(())
    }

    /// Write every input to `<dir>/<name>.bin` as little-endian `f32` in C order.
    ///
    /// `/` in input names becomes `_` in file names.
    pub fn write_raw(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| Error::FileAccess {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.inputs.len());
        for (name, batch) in self.sorted_inputs() {
            let path = dir.join(format!("{}.bin", name.replace('/', "_")));
            fs::write(&path, array_to_bytes(&batch.view())).map_err(|source| {
                Error::FileAccess {
                    path: path.clone(),
                    source,
                }
            })?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn sample() -> CalibrationSample {
        let batch = Array4::from_shape_fn((2, 2, 2, 3), |(n, y, x, _)| (n * 4 + y * 2 + x) as f32)
            .into_dyn();
        CalibrationSample::new("Placeholder", batch)
    }

    #[test]
    fn test_single_entry_mapping() {
        let sample = sample();
        assert_eq!(sample.inputs().len(), 1);
        assert_eq!(sample.get("Placeholder").unwrap().shape(), &[2, 2, 2, 3]);
        assert!(sample.get("input").is_none());
        assert_eq!(sample.batch_size(), 2);
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        let stats = &stats["Placeholder"];

        assert_eq!(stats.shape, vec![2, 2, 2, 3]);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 7.0);
        assert!((stats.mean - 3.5).abs() < 1e-9);
        assert_eq!(stats.non_finite, 0);
        assert_eq!(stats.image_sums, vec![6.0, 22.0]);
    }

    #[test]
    fn test_write_raw() {
        let dir = std::env::temp_dir().join(format!("calibration-rs-raw-{}", std::process::id()));
        let batch = sample().into_inputs().remove("Placeholder").unwrap();
        let sample = CalibrationSample::new("group/Placeholder", batch);

        let written = sample.write_raw(&dir).unwrap();
        assert_eq!(written, vec![dir.join("group_Placeholder.bin")]);

        let bytes = fs::read(&written[0]).unwrap();
        assert_eq!(bytes.len(), 2 * 2 * 2 * 3 * 4);
        // last element of image 1 is 7.0
        assert_eq!(&bytes[bytes.len() - 4..], &7.0f32.to_le_bytes());

        fs::remove_dir_all(&dir).unwrap();
    }
}
