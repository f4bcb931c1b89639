//! Bit-Reversal Permutation
//!
//! The polar transform `G_N = B_N F^{⊗n}` applies the bit-reversal
//! permutation `B_N` to its rows. The factor graph stores information
//! variables in butterfly order, so `u[i]` lives at row `bit_reverse(i, n)`.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::bit_reversal::bit_reverse;
//!
//! // 0b001 -> 0b100
//! assert_eq!(bit_reverse(1, 3), 4);
//! assert_eq!(bit_reverse(6, 3), 3);
//! ```

/// Reverse the lowest `width` bits of `value`.
///
/// Bits above `width` are ignored. `width == 0` always yields `0`.
#[inline]
pub fn bit_reverse(value: usize, width: u32) -> usize {
    if width == 0 {
        return 0;
    }
    debug_assert!(width <= usize::BITS);
    value.reverse_bits() >> (usize::BITS - width)
}

/// Full bit-reversal permutation of `0..2^width`.
pub fn bit_reversal_permutation(width: u32) -> Vec<usize> {
    (0..1usize << width).map(|i| bit_reverse(i, width)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference implementation through the binary string representation.
    fn reverse_via_string(value: usize, width: u32) -> usize {
        if width == 0 {
            return 0;
        }
        let s = format!("{:0width$b}", value, width = width as usize);
        let reversed: String = s.chars().rev().collect();
        usize::from_str_radix(&reversed, 2).unwrap()
    }

    #[test]
    fn test_matches_string_reference() {
        for width in 0..=10 {
            for value in 0..(1usize << width) {
                assert_eq!(
                    bit_reverse(value, width),
                    reverse_via_string(value, width),
                    "value={value} width={width}"
                );
            }
        }
    }

    #[test]
    fn test_involution() {
        for value in 0..256 {
            assert_eq!(bit_reverse(bit_reverse(value, 8), 8), value);
        }
    }

    #[test]
    fn test_permutation_n2() {
        assert_eq!(bit_reversal_permutation(2), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_ignores_high_bits() {
        assert_eq!(bit_reverse(0b1_0001, 4), 0b1000);
    }
}
