use std::ops::Range;

use crate::validate::{self, Strictness};

/// A string backend.
///
/// A backend only decides how input bytes are split into characters
/// ([`Backend::units`]). Counting, searching and slicing are derived from that
/// split, so every backend agrees on offset semantics:
///
/// * offsets and lengths are in characters of the backend;
/// * a negative offset counts from the end;
/// * matches only start and end on character boundaries.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Byte ranges of each character, in order and covering the whole input.
    fn units(&self, input: &[u8]) -> Vec<Range<usize>>;

    fn is_utf8(&self, input: &[u8], strictness: Strictness) -> bool {
        validate::is_utf8(input, strictness)
    }

    fn strlen(&self, input: &[u8]) -> usize {
        self.units(input).len()
    }

    /// Character index of the first `needle` at or after `offset`.
    fn strpos(&self, haystack: &[u8], needle: &[u8], offset: isize) -> Option<usize> {
        let units = self.units(haystack);
        let from = resolve_offset(units.len(), offset)?;
        if needle.is_empty() {
            return Some(from);
        }
        (from..units.len()).find(|&idx| matches_at(haystack, &units, idx, needle))
    }

    /// Character index of the last `needle`.
    ///
    /// A non-negative `offset` is the earliest index a match may start at. A
    /// negative one is the latest, counted from the end.
    fn strrpos(&self, haystack: &[u8], needle: &[u8], offset: isize) -> Option<usize> {
        let units = self.units(haystack);
        let len = units.len();
        let pivot = resolve_offset(len, offset)?;
        let (lo, hi) = if offset >= 0 { (pivot, len) } else { (0, pivot + 1) };
        if needle.is_empty() {
            return Some(if offset >= 0 { len } else { pivot });
        }
        (lo..hi.min(len))
            .rev()
            .find(|&idx| matches_at(haystack, &units, idx, needle))
    }

    /// Slice by character `start` and optional `length`.
    ///
    /// A negative `start` counts from the end. A negative `length` stops that
    /// many characters before the end. A range that selects nothing yields an
    /// empty vector.
    fn substr(&self, input: &[u8], start: isize, length: Option<isize>) -> Vec<u8> {
        let units = self.units(input);
        let len = units.len() as isize;

        let begin = if start < 0 { (len + start).max(0) } else { start };
        if begin >= len {
            return Vec::new();
        }
        let end = match length {
            None => len,
            Some(l) if l < 0 => len + l,
            Some(l) => begin.saturating_add(l).min(len),
        };
        if end <= begin {
            return Vec::new();
        }

        let from = units[begin as usize].start;
        let to = units[end as usize - 1].end;
        input[from..to].to_vec()
    }
}

/// Resolve a possibly negative character offset against `len`.
///
/// An offset equal to `len` is allowed, so an empty needle can match at the end.
fn resolve_offset(len: usize, offset: isize) -> Option<usize> {
    let resolved = if offset < 0 {
        len as isize + offset
    } else {
        offset
    };
    if resolved < 0 || resolved as usize > len {
        None
    } else {
        Some(resolved as usize)
    }
}

fn matches_at(haystack: &[u8], units: &[Range<usize>], idx: usize, needle: &[u8]) -> bool {
    let start = units[idx].start;
    let end = start + needle.len();
    if end > haystack.len() || &haystack[start..end] != needle {
        return false;
    }
    end == haystack.len() || units.binary_search_by_key(&end, |unit| unit.start).is_ok()
}
