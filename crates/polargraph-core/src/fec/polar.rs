//! Polar Codes
//!
//! A polar code of length `N = 2^n` places the information bits on the
//! reliable positions of `u` and fixes the frozen positions to zero. The
//! codeword is `x = u·G_N` with `G_N = B_N·F^{⊗n}`, where `B_N` is the
//! bit-reversal permutation and `F = [[1,0],[1,1]]`. Since `G_N` is its own
//! inverse, `u = x·G_N`, and the parity-check matrix consists of the columns
//! of `G_N` at the frozen positions (Goela, Korada and Gastpar).
//!
//! [`PolarCode`] also owns the [`PolarFactorGraph`] of the code, built on
//! first use and discarded whenever the frozen set changes.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::fec::PolarCode;
//!
//! let code = PolarCode::new(3, vec![0, 1, 2, 4]).unwrap();
//! assert_eq!(code.infolength(), 4);
//! let x = code.encode(&[1, 0, 1, 1]).unwrap();
//! assert_eq!(x.len(), 8);
//! assert!(code.to_linear_code().is_codeword(&x));
//! assert_eq!(code.extract(&x).unwrap(), vec![1, 0, 1, 1]);
//! ```

use std::cell::OnceCell;

use crate::bit_reversal::bit_reverse;
use crate::fec::bms_channel::BmsChannel;
use crate::fec::frozen_bits::{FrozenBitSelector, FrozenCriterion};
use crate::fec::polar_graph::{PolarFactorGraph, MAX_STAGES};
use crate::gf2::Gf2Matrix;
use crate::linear_code::BinaryLinearBlockCode;
use crate::types::{Bit, BitVec, PolarError, PolarResult};

/// Apply `F^{⊗n}` in place (butterfly network, natural order).
pub fn polar_transform(bits: &mut [Bit]) {
    let n = bits.len();
    let mut half = 1;
    while half < n {
        for i in (0..n).step_by(2 * half) {
            for j in 0..half {
                bits[i + j] ^= bits[i + j + half];
            }
        }
        half <<= 1;
    }
}

/// Multiply by `G_N = B_N·F^{⊗n}`. The map is an involution.
fn apply_generator(word: &[Bit], n: u32) -> BitVec {
    let mut v = vec![0; word.len()];
    for (i, &bit) in word.iter().enumerate() {
        v[bit_reverse(i, n)] = bit & 1;
    }
    polar_transform(&mut v);
    v
}

/// Polar code with an explicit frozen set.
#[derive(Debug, Clone)]
pub struct PolarCode {
    n: u32,
    frozen: Vec<usize>,
    info_positions: Vec<usize>,
    parity_check: OnceCell<Gf2Matrix>,
    graph: Option<PolarFactorGraph>,
}

impl PolarCode {
    /// Code of length `2^n` with the given frozen positions (any order,
    /// duplicates ignored).
    pub fn new(n: u32, frozen: Vec<usize>) -> PolarResult<Self> {
        if n > MAX_STAGES {
            return Err(PolarError::invalid(format!(
                "n = {} exceeds the maximum of {}",
                n, MAX_STAGES
            )));
        }
        let mut code = Self {
            n,
            frozen: Vec::new(),
            info_positions: Vec::new(),
            parity_check: OnceCell::new(),
            graph: None,
        };
        code.set_frozen(frozen)?;
        Ok(code)
    }

    /// Run frozen-bit selection on `channel` and build the resulting code.
    pub fn construct(
        channel: BmsChannel,
        n: u32,
        mu: usize,
        criterion: FrozenCriterion,
    ) -> PolarResult<Self> {
        let frozen = FrozenBitSelector::new(channel, n, mu)?.select(criterion)?;
        Self::new(n, frozen)
    }

    /// Number of polarization stages.
    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn blocklength(&self) -> usize {
        1 << self.n
    }

    pub fn infolength(&self) -> usize {
        self.info_positions.len()
    }

    pub fn rate(&self) -> f64 {
        self.infolength() as f64 / self.blocklength() as f64
    }

    /// Frozen positions, ascending.
    pub fn frozen(&self) -> &[usize] {
        &self.frozen
    }

    /// Information positions, ascending.
    pub fn info_positions(&self) -> &[usize] {
        &self.info_positions
    }

    /// Replace the frozen set. Cached matrices and graphs are dropped.
    pub fn set_frozen(&mut self, mut frozen: Vec<usize>) -> PolarResult<()> {
        let big_n = self.blocklength();
        if let Some(&bad) = frozen.iter().find(|&&i| i >= big_n) {
            return Err(PolarError::invalid(format!(
                "frozen index {} out of range for blocklength {}",
                bad, big_n
            )));
        }
        frozen.sort_unstable();
        frozen.dedup();
        let mut is_frozen = vec![false; big_n];
        for &i in &frozen {
            is_frozen[i] = true;
        }
        self.info_positions = (0..big_n).filter(|&i| !is_frozen[i]).collect();
        self.frozen = frozen;
        self.parity_check = OnceCell::new();
        self.graph = None;
        Ok(())
    }

    /// Encode `infolength()` bits into a codeword.
    pub fn encode(&self, info_bits: &[Bit]) -> PolarResult<BitVec> {
        if info_bits.len() != self.infolength() {
            return Err(PolarError::invalid(format!(
                "expected {} information bits, got {}",
                self.infolength(),
                info_bits.len()
            )));
        }
        let mut u = vec![0; self.blocklength()];
        for (&pos, &bit) in self.info_positions.iter().zip(info_bits) {
            u[pos] = bit;
        }
        Ok(apply_generator(&u, self.n))
    }

    /// Recover the information bits of a codeword.
    pub fn extract(&self, codeword: &[Bit]) -> PolarResult<BitVec> {
        if codeword.len() != self.blocklength() {
            return Err(PolarError::invalid(format!(
                "expected a codeword of length {}, got {}",
                self.blocklength(),
                codeword.len()
            )));
        }
        let u = apply_generator(codeword, self.n);
        Ok(self.info_positions.iter().map(|&i| u[i]).collect())
    }

    /// Full `N × N` matrix `G_N`.
    fn full_generator(&self) -> Gf2Matrix {
        let big_n = self.blocklength();
        let mut g = Gf2Matrix::zeros(big_n, big_n);
        let mut unit = vec![0; big_n];
        for i in 0..big_n {
            unit[i] = 1;
            for (j, &bit) in apply_generator(&unit, self.n).iter().enumerate() {
                g.set(i, j, bit);
            }
            unit[i] = 0;
        }
        g
    }

    /// `K × N` generator matrix: rows of `G_N` at the information positions.
    pub fn generator_matrix(&self) -> Gf2Matrix {
        self.full_generator().select_rows(&self.info_positions)
    }

    /// `(N − K) × N` parity-check matrix, computed once per frozen set.
    pub fn parity_check_matrix(&self) -> &Gf2Matrix {
        self.parity_check
            .get_or_init(|| self.full_generator().transpose().select_rows(&self.frozen))
    }

    /// The code as a generic linear block code.
    pub fn to_linear_code(&self) -> BinaryLinearBlockCode {
        BinaryLinearBlockCode::new(
            format!("Polar(N={}, K={})", self.blocklength(), self.infolength()),
            self.parity_check_matrix().clone(),
        )
    }

    /// Factor graph of the code, built on first use.
    pub fn factor_graph(&mut self) -> PolarResult<&PolarFactorGraph> {
        self.factor_graph_mut().map(|g| &*g)
    }

    /// Mutable factor graph, e.g. for [`PolarFactorGraph::sparsify`].
    pub fn factor_graph_mut(&mut self) -> PolarResult<&mut PolarFactorGraph> {
        let graph = match self.graph.take() {
            Some(graph) => graph,
            None => {
                let mut graph = PolarFactorGraph::new(self.n)?;
                graph.set_frozen(&self.frozen)?;
                graph
            }
        };
        Ok(self.graph.insert(graph))
    }

    /// Whether a factor graph is currently cached.
    pub fn has_factor_graph(&self) -> bool {
        self.graph.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_polar_transform_n2() {
        // x = u·F^{⊗2}
        let mut bits = vec![0, 0, 0, 1];
        polar_transform(&mut bits);
        assert_eq!(bits, vec![1, 1, 1, 1]);
        let mut bits = vec![1, 0, 0, 0];
        polar_transform(&mut bits);
        assert_eq!(bits, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_generator_is_involution() {
        let code = PolarCode::new(4, vec![]).unwrap();
        let g = code.full_generator();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let u: BitVec = (0..16).map(|_| rng.gen_range(0..2)).collect();
            let x = g.vec_mul(&u);
            assert_eq!(g.vec_mul(&x), u);
        }
    }

    #[test]
    fn test_generator_rows_n2() {
        let code = PolarCode::new(2, vec![]).unwrap();
        // row i of B_4·F^{⊗2} is row bitrev(i) of F^{⊗2}
        assert_eq!(
            code.generator_matrix().to_rows(),
            vec![
                vec![1, 0, 0, 0],
                vec![1, 0, 1, 0],
                vec![1, 1, 0, 0],
                vec![1, 1, 1, 1],
            ]
        );
    }

    #[test]
    fn test_encode_matches_generator() {
        let code = PolarCode::new(3, vec![0, 1, 2, 4]).unwrap();
        let g = code.generator_matrix();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..16 {
            let info: BitVec = (0..4).map(|_| rng.gen_range(0..2)).collect();
            let x = code.encode(&info).unwrap();
            assert_eq!(x, g.vec_mul(&info));
            assert_eq!(code.extract(&x).unwrap(), info);
        }
    }

    #[test]
    fn test_parity_check_annihilates_codewords() {
        let code = PolarCode::new(4, vec![0, 1, 2, 4, 8, 3]).unwrap();
        let h = code.parity_check_matrix();
        assert_eq!(h.num_rows(), 6);
        assert_eq!(h.num_cols(), 16);
        for row in code.generator_matrix().rows() {
            assert!(h.mul_vec(row).iter().all(|&s| s == 0));
        }
        let linear = code.to_linear_code();
        assert_eq!(linear.infolength(), 10);
        assert_eq!(linear.name(), "Polar(N=16, K=10)");
    }

    #[test]
    fn test_frozen_set_normalised() {
        let code = PolarCode::new(2, vec![2, 0, 2]).unwrap();
        assert_eq!(code.frozen(), &[0, 2]);
        assert_eq!(code.info_positions(), &[1, 3]);
        assert!((code.rate() - 0.5).abs() < 1e-12);
        assert!(PolarCode::new(2, vec![4]).is_err());
    }

    #[test]
    fn test_encode_length_checked() {
        let code = PolarCode::new(2, vec![0]).unwrap();
        assert!(code.encode(&[1, 0]).is_err());
        assert!(code.extract(&[1, 0]).is_err());
    }

    #[test]
    fn test_set_frozen_invalidates_caches() {
        let mut code = PolarCode::new(2, vec![0]).unwrap();
        assert_eq!(code.parity_check_matrix().num_rows(), 1);
        code.factor_graph_mut().unwrap().sparsify().unwrap();
        assert!(code.factor_graph().unwrap().is_sparsified());

        code.set_frozen(vec![0, 1]).unwrap();
        assert!(!code.has_factor_graph());
        assert_eq!(code.parity_check_matrix().num_rows(), 2);
        let graph = code.factor_graph().unwrap();
        assert!(!graph.is_sparsified());
        assert_eq!(graph.frozen(), vec![0, 1]);
    }

    #[test]
    fn test_construct_from_channel() {
        let code = PolarCode::construct(
            BmsChannel::bsc(0.1).unwrap(),
            3,
            4,
            FrozenCriterion::Threshold(0.1),
        )
        .unwrap();
        assert_eq!(code.frozen(), &[0, 1, 2, 4]);
        let h = code.parity_check_matrix();
        assert_eq!(h.num_rows(), 4);
        assert_eq!(h.num_cols(), 8);
        // one free dimension per information position
        assert_eq!(h.rank(), 4);
        assert_eq!(h.null_space().num_rows(), 8 - code.frozen().len());
        assert_eq!(code.infolength(), 8 - code.frozen().len());
    }

    #[test]
    fn test_sparsified_graph_defines_same_code() {
        let mut code = PolarCode::new(3, vec![0, 1, 2, 4]).unwrap();
        let graph = code.factor_graph_mut().unwrap();
        graph.sparsify().unwrap();
        let h = graph.parity_check_matrix();
        let columns = graph.codeword_columns();
        let codewords: Vec<BitVec> = code.generator_matrix().to_rows();
        let code_h = code.to_linear_code();
        // every null-space vector of the sparse matrix projects onto a codeword
        for row in h.null_space().rows() {
            let x: BitVec = columns
                .iter()
                .map(|c| c.map_or(0, |c| row[c]))
                .collect();
            assert!(code_h.is_codeword(&x));
        }
        assert_eq!(codewords.len(), 4);
    }
}
