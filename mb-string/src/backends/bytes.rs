use std::ops::Range;

use crate::backend::Backend;

/// Single-byte semantics: every byte is one character.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteBackend;

impl Backend for ByteBackend {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn units(&self, input: &[u8]) -> Vec<Range<usize>> {
        (0..input.len()).map(|i| i..i + 1).collect()
    }

    fn strlen(&self, input: &[u8]) -> usize {
        input.len()
    }
}
