use ndarray::ArrayViewD;

/// Flattens an array into little-endian `f32` bytes in logical (C) order.
pub fn array_to_bytes(array: &ArrayViewD<f32>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(array.len() * 4);
    for &x in array.iter() {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_bytes_follow_logical_order() {
        // transposed view: logical order differs from memory order
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let t = a.t().into_dyn();
        let bytes = array_to_bytes(&t);

        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![1.0, 3.0, 2.0, 4.0]);
    }
}
