//! Bit width of n-bit codes (EXI 6.2, 7.2, 7.3).
//!
//! Event codes, choice indices, count prefixes, enumeration indices and
//! compact string-table identifiers all use `⌈log₂(n)⌉` bits to distinguish
//! `n` alternatives.

/// Number of bits needed to distinguish `n` alternatives: `⌈log₂(n)⌉`.
///
/// - `n = 0` or `n = 1`: 0 bits (nothing to choose)
/// - `n = 2`: 1 bit
/// - `n = 3..4`: 2 bits
/// - `n = 5..8`: 3 bits
#[inline]
pub fn for_count(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Like [`for_count`] for a count prefix spanning `min..=max` occurrences.
#[inline]
pub fn for_range(min: u32, max: u32) -> u8 {
    debug_assert!(max >= min, "max ({max}) < min ({min})");
    for_count((max - min) as usize + 1)
}
