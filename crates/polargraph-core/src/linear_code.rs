//! Binary Linear Block Codes
//!
//! A code is defined by its parity-check matrix **H**; the codewords are the
//! vectors `x` with `H·x = 0` over GF(2). Rows of **H** may be linearly
//! dependent (the reduced polar factor graph routinely yields such matrices),
//! so the information length is derived from the rank, not the row count.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::gf2::Gf2Matrix;
//! use polargraph_core::linear_code::BinaryLinearBlockCode;
//!
//! let h = Gf2Matrix::from_rows(&[
//!     vec![1, 1, 1, 0, 1, 0, 0],
//!     vec![1, 1, 0, 1, 0, 1, 0],
//!     vec![1, 0, 1, 1, 0, 0, 1],
//! ]);
//! let code = BinaryLinearBlockCode::new("Hamming(7,4)", h);
//! assert_eq!(code.blocklength(), 7);
//! assert_eq!(code.infolength(), 4);
//! assert!(code.is_codeword(&[1, 0, 0, 0, 1, 1, 1]));
//! ```

use crate::gf2::Gf2Matrix;

/// Binary linear block code given by a parity-check matrix.
#[derive(Debug, Clone)]
pub struct BinaryLinearBlockCode {
    name: String,
    parity_check: Gf2Matrix,
    infolength: usize,
}

impl BinaryLinearBlockCode {
    pub fn new(name: impl Into<String>, parity_check: Gf2Matrix) -> Self {
        let infolength = parity_check.num_cols() - parity_check.rank();
        Self {
            name: name.into(),
            parity_check,
            infolength,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codeword length n.
    pub fn blocklength(&self) -> usize {
        self.parity_check.num_cols()
    }

    /// Code dimension k.
    pub fn infolength(&self) -> usize {
        self.infolength
    }

    /// Code rate k/n.
    pub fn rate(&self) -> f64 {
        if self.blocklength() == 0 {
            return 0.0;
        }
        self.infolength as f64 / self.blocklength() as f64
    }

    pub fn parity_check_matrix(&self) -> &Gf2Matrix {
        &self.parity_check
    }

    /// A generator matrix (k × n) whose rows form a basis of the code.
    pub fn generator_matrix(&self) -> Gf2Matrix {
        self.parity_check.null_space()
    }

    /// Syndrome `H·x`.
    pub fn syndrome(&self, word: &[u8]) -> Vec<u8> {
        self.parity_check.mul_vec(word)
    }

    /// Check if `word` satisfies every parity check.
    pub fn is_codeword(&self, word: &[u8]) -> bool {
        word.len() == self.blocklength() && self.syndrome(word).iter().all(|&s| s == 0)
    }
}
