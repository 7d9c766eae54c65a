use num_traits::NumCast;

use crate::{Array, ArrayElement, DataType};

/// Index of the maximum value; ties resolve to the lowest index.
pub fn argmax<T: ArrayElement>(values: &[T]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(
            (0usize, f32::NEG_INFINITY),
            |(best_index, best_value), (index, &value)| {
                let value: f32 =
                    NumCast::from(value).unwrap_or(f32::NEG_INFINITY);
                if value > best_value {
                    (index, value)
                } else {
                    (best_index, best_value)
                }
            },
        )
        .0
}

/// Greedy selection over the vocabulary distribution at the last valid
/// sequence position of a `[1, suffix_length, vocab_size]` logits tensor.
pub fn sample_last_position(logits: &Array) -> u32 {
    let shape = logits.shape();
    let vocab_size = *shape.last().expect("Logits tensor has no dimensions");
    assert!(vocab_size > 0, "Logits tensor has an empty vocabulary axis");

    match logits.data_type() {
        DataType::F32 => {
            let values = logits.as_slice::<f32>();
            argmax(&values[values.len() - vocab_size..]) as u32
        },
        DataType::F16 => {
            let values = logits.as_slice::<half::f16>();
            argmax(&values[values.len() - vocab_size..]) as u32
        },
        other => panic!("Unsupported logits data type: {:?}", other),
    }
}
