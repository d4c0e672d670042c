//! Greedy CTC decoding of per-timestep class probabilities.

use crate::alphabet::{BLANK, decode_label};

/// Index of the largest value; ties go to the lowest index.
fn argmax(row: &[f32]) -> usize {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &p) in row.iter().enumerate() {
        if p > best.1 {
            best = (i, p);
        }
    }
    best.0
}

/// Best-path class sequence: argmax per step, repeats collapsed, blanks removed.
#[must_use]
pub fn best_path<R: AsRef<[f32]>>(steps: &[R]) -> Vec<i64> {
    let mut out = Vec::new();
    let mut previous = None;

    for step in steps {
        let class = argmax(step.as_ref());
        if previous != Some(class) && class != BLANK {
            out.extend(i64::try_from(class).ok());
        }
        previous = Some(class);
    }

    out
}

/// Decodes a `[T, NUM_CLASSES]` probability matrix to text.
#[must_use]
pub fn greedy_decode<R: AsRef<[f32]>>(steps: &[R]) -> String {
    decode_label(&best_path(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::NUM_CLASSES;

    fn onehot(class: usize) -> Vec<f32> {
        let mut row = vec![0.01; NUM_CLASSES];
        row[class] = 0.9;
        row
    }

    #[test]
    fn test_repeats_collapse_and_blanks_split() {
        // H H _ E L L _ L O  -> "HELLO"
        let steps: Vec<_> = [7, 7, BLANK, 4, 11, 11, BLANK, 11, 14].map(onehot).into();
        assert_eq!(greedy_decode(&steps), "HELLO");
    }

    #[test]
    fn test_all_blank_is_empty() {
        let steps = vec![onehot(BLANK); 64];
        assert_eq!(greedy_decode(&steps), "");
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let uniform = vec![vec![1.0 / 30.0; NUM_CLASSES]; 64];
        assert_eq!(best_path(&uniform), vec![0]);
        assert_eq!(greedy_decode(&uniform), "A");
    }

    #[test]
    fn test_no_steps_decode_to_empty() {
        let steps: Vec<Vec<f32>> = Vec::new();
        assert_eq!(greedy_decode(&steps), "");
    }
}
