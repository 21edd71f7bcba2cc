use std::ops::Range;

use crate::backend::Backend;
use crate::validate::sequence_width;

/// Unicode scalar semantics.
///
/// Each well-formed UTF-8 sequence is one character. A byte that does not
/// start a well-formed sequence counts as a character of its own, so slicing
/// never drops input bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn units(&self, input: &[u8]) -> Vec<Range<usize>> {
        if let Ok(text) = std::str::from_utf8(input) {
            return text
                .char_indices()
                .map(|(i, c)| i..i + c.len_utf8())
                .collect();
        }

        let mut units = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < input.len() {
            let width = sequence_width(input[i])
                .filter(|w| i + w <= input.len())
                .filter(|w| std::str::from_utf8(&input[i..i + w]).is_ok())
                .unwrap_or(1);
            units.push(i..i + width);
            i += width;
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_scalars() {
        assert_eq!(NativeBackend.strlen("价格表".as_bytes()), 3);
        assert_eq!(NativeBackend.strlen(b""), 0);
    }

    #[test]
    fn invalid_bytes_are_single_characters() {
        let input = [b'a', 0xFF, 0xE4, 0xBD, 0xA0, 0xC3];
        let units = NativeBackend.units(&input);
        assert_eq!(units, vec![0..1, 1..2, 2..5, 5..6]);
        assert_eq!(NativeBackend.substr(&input, 1, None), input[1..].to_vec());
    }

    #[test]
    fn search_respects_character_boundaries() {
        // "é" is C3 A9; a needle of the trailing byte alone must not match.
        let haystack = "café".as_bytes();
        assert_eq!(NativeBackend.strpos(haystack, &[0xA9], 0), None);
        assert_eq!(NativeBackend.strpos(haystack, "é".as_bytes(), 0), Some(3));
    }
}
