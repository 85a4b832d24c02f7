//! Per-image energy normalization and channel replication.

use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::error::{Error, Result};
use crate::utils::array::{leading_sums, replicate_channels, scale_per_leading_index};

use super::config::{CalibrationConfig, DegeneratePolicy, DEFAULT_INTENSITY_SCALE};

pub const RGB_CHANNELS: usize = 3;

/// Raw images shaped (N, H, ..., W).
pub type ImageBatch = ArrayD<f32>;

/// Normalized images shaped (N, H, ..., W, 3).
pub type NormalizedBatch = ArrayD<f32>;

#[derive(Debug, Clone)]
pub struct Normalized {
    pub batch: NormalizedBatch,
    /// Indices (in the input batch) of images whose total intensity was zero.
    pub degenerate: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    intensity_scale: f32,
    epsilon: f64,
    policy: DegeneratePolicy,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            intensity_scale: DEFAULT_INTENSITY_SCALE,
            epsilon: 0.0,
            policy: DegeneratePolicy::Zero,
        }
    }
}

impl Normalizer {
    pub fn new(intensity_scale: f32, epsilon: f64, policy: DegeneratePolicy) -> Self {
        Self {
            intensity_scale,
            epsilon,
            policy,
        }
    }

    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self::new(config.intensity_scale, config.epsilon, config.degenerate)
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    fn is_degenerate(&self, total: f64) -> bool {
        !total.is_finite() || total.abs() <= self.epsilon
    }

    /// Rescale every image so its pixels sum to the intensity scale, then stack
    /// three identical copies along a new trailing axis. The per-image total is
    /// taken over every axis but the first.
    pub fn normalize_and_rgb(&self, images: &ArrayViewD<f32>) -> Result<Normalized> {
        if images.ndim() < 3 {
            return Err(Error::InvalidShape {
                expected: "(N, H, W) or more dimensions".to_string(),
                actual: format!("{:?}", images.shape()),
            });
        }

        let totals = leading_sums(images);
        let degenerate: Vec<usize> = totals
            .iter()
            .enumerate()
            .filter(|(_, total)| self.is_degenerate(**total))
            .map(|(i, _)| i)
            .collect();

        let scales: Vec<f64> = totals
            .iter()
            .map(|&total| {
                if self.is_degenerate(total) {
                    0.0
                } else {
                    f64::from(self.intensity_scale) / total
                }
            })
            .collect();

        let scaled = match self.policy {
            DegeneratePolicy::Error => {
                if let Some(&index) = degenerate.first() {
                    return Err(Error::DegenerateImage { index });
                }
                scale_per_leading_index(images, &scales)?
            }
            DegeneratePolicy::Zero => {
                let mut scaled = scale_per_leading_index(images, &scales)?;
                // NaN/Inf pixels survive a zero scale
                for &index in &degenerate {
                    scaled.index_axis_mut(Axis(0), index).fill(0.0);
                }
                scaled
            }
            DegeneratePolicy::Skip => {
                let keep: Vec<usize> = (0..totals.len())
                    .filter(|i| degenerate.binary_search(i).is_err())
                    .collect();
                let kept_scales: Vec<f64> = keep.iter().map(|&i| scales[i]).collect();
                let kept = images.select(Axis(0), &keep);
                scale_per_leading_index(&kept.view(), &kept_scales)?
            }
        };

        Ok(Normalized {
            batch: replicate_channels(&scaled.view(), RGB_CHANNELS)?,
            degenerate,
        })
    }
}

/// Normalize with the default scale (255) and zero-fill for degenerate images.
pub fn normalize_and_rgb(images: &ArrayViewD<f32>) -> Result<NormalizedBatch> {
    Normalizer::default()
        .normalize_and_rgb(images)
        .map(|normalized| normalized.batch)
}
