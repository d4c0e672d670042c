//! Output vocabulary of the model.

/// Symbols in class order. Class `i` decodes to `ALPHABET[i]`.
pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ-' ";

/// Alphabet symbols plus the CTC blank.
pub const NUM_CLASSES: usize = ALPHABET.len() + 1;

/// The blank is the last class.
pub const BLANK: usize = NUM_CLASSES - 1;

/// Class index of every char in `label`; chars outside the alphabet become `-1`.
#[must_use]
pub fn encode_label(label: &str) -> Vec<i64> {
    label
        .chars()
        .map(|ch| {
            ALPHABET
                .chars()
                .position(|a| a == ch)
                .and_then(|i| i64::try_from(i).ok())
                .unwrap_or(-1)
        })
        .collect()
}

/// Maps class indices back to text, stopping at the first `-1`.
///
/// Indices that are not alphabet symbols (the blank, out of range) are skipped.
#[must_use]
pub fn decode_label(indices: &[i64]) -> String {
    indices
        .iter()
        .take_while(|&&i| i != -1)
        .filter_map(|&i| usize::try_from(i).ok())
        .filter_map(|i| ALPHABET.as_bytes().get(i).map(|&b| char::from(b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_layout() {
        assert_eq!(ALPHABET.len(), 29);
        assert_eq!(NUM_CLASSES, 30);
        assert_eq!(BLANK, 29);
    }

    #[test]
    fn test_encode_maps_unknown_chars_to_minus_one() {
        assert_eq!(encode_label("AB Z"), vec![0, 1, 28, 25]);
        assert_eq!(encode_label("a-'"), vec![-1, 26, 27]);
    }

    #[test]
    fn test_decode_stops_at_minus_one() {
        assert_eq!(decode_label(&[7, 8, -1, 0]), "HI");
        assert_eq!(decode_label(&[]), "");
        assert_eq!(decode_label(&encode_label("O'NEIL-SMITH")), "O'NEIL-SMITH");
    }
}
