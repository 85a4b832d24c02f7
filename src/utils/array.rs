use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::error::{Error, Result};

/// Sum of every element under each leading index, accumulated in `f64`.
///
/// For a batch shaped (N, H, W) this yields one total per image.
pub fn leading_sums(array: &ArrayViewD<f32>) -> Vec<f64> {
    if array.ndim() == 0 {
        return Vec::new();
    }
    array
        .axis_iter(Axis(0))
        .map(|sub| sub.iter().map(|&x| f64::from(x)).sum())
        .collect()
}

/// Multiplies every element of `array[i, ..]` by `scales[i]`, returning a new array.
#[allow(clippy::cast_possible_truncation)]
pub fn scale_per_leading_index(array: &ArrayViewD<f32>, scales: &[f64]) -> Result<ArrayD<f32>> {
    if array.ndim() == 0 || array.len_of(Axis(0)) != scales.len() {
        return Err(Error::InvalidShape {
            expected: format!("leading axis of length {}", scales.len()),
            actual: format!("{:?}", array.shape()),
        });
    }

    let mut scaled = array.to_owned();
    for (mut sub, &scale) in scaled.axis_iter_mut(Axis(0)).zip(scales) {
        sub.mapv_inplace(|x| (f64::from(x) * scale) as f32);
    }
    Ok(scaled)
}

/// Stacks `channels` copies of `array` along a new trailing axis.
pub fn replicate_channels(array: &ArrayViewD<f32>, channels: usize) -> Result<ArrayD<f32>> {
    let copies = vec![array.view(); channels];
    Ok(ndarray::stack(Axis(array.ndim()), &copies)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, Array3};

    #[test]
    fn test_leading_sums() {
        let batch = array![[[1.0f32, 1.0], [1.0, 1.0]], [[0.0, 2.0], [2.0, 4.0]]].into_dyn();
        assert_eq!(leading_sums(&batch.view()), vec![4.0, 8.0]);
    }

    #[test]
    fn test_scale_applies_one_factor_per_image() {
        let batch = Array3::<f32>::ones((3, 2, 2)).into_dyn();
        let scaled = scale_per_leading_index(&batch.view(), &[1.0, 2.0, 0.5]).unwrap();

        assert!(scaled.slice(s![0, .., ..]).iter().all(|&x| x == 1.0));
        assert!(scaled.slice(s![1, .., ..]).iter().all(|&x| x == 2.0));
        assert!(scaled.slice(s![2, .., ..]).iter().all(|&x| x == 0.5));
    }

    #[test]
    fn test_scale_rejects_length_mismatch() {
        let batch = Array3::<f32>::ones((3, 2, 2)).into_dyn();
        let err = scale_per_leading_index(&batch.view(), &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn test_replicate_channels_shape_and_values() {
        let batch = array![[[1.0f32, 2.0], [3.0, 4.0]]].into_dyn();
        let rgb = replicate_channels(&batch.view(), 3).unwrap();

        assert_eq!(rgb.shape(), &[1, 2, 2, 3]);
        for c in 0..3 {
            assert_eq!(rgb.index_axis(Axis(3), c), batch);
        }
    }
}
