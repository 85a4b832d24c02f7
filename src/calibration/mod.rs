//! Calibration data for post-training quantization.
//!
//! ```text
//!  .npz / .npy file
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  store   │  named field → ImageBatch (N, H, W)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ normalizer │  per-image energy 255, 3 channels → (N, H, W, 3)
//!   └────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  { "Placeholder": batch } per iteration
//!   └──────────┘
//! ```

pub mod config;
pub mod loader;
pub mod normalizer;
pub mod store;
pub mod types;

pub use config::{CalibrationConfig, DegeneratePolicy};
pub use loader::{read_image, CalibrationLoader};
pub use normalizer::{normalize_and_rgb, ImageBatch, Normalized, NormalizedBatch, Normalizer};
pub use types::{CalibrationSample, TensorStats};
