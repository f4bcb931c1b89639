//! Decoders for binary linear codes and sparsified polar codes
//!
//! Every strategy takes channel LLRs (positive means the bit is more likely
//! `0`) and returns a [`DecodeOutput`]: the decided codeword and its
//! objective `Σ llrᵢ·xᵢ`, the cost minimised by maximum-likelihood and LP
//! decoding. Strategies are a closed set selected with [`DecoderKind`]:
//!
//! - **Min-sum**: iterative message passing on the Tanner graph of the
//!   parity-check matrix, with an optional normalisation factor.
//! - **Maximum likelihood**: exhaustive search over all `2^k` codewords.
//!   Only accepted for codes of dimension at most [`ML_MAX_DIMENSION`].
//!
//! [`SparsePolarDecoder`] runs any strategy on the sparsified factor graph of
//! a [`PolarCode`]: channel LLRs go on the codeword columns, auxiliary
//! columns start at zero, and the `N` code bits are read back.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::decoder::{DecoderKind, SparsePolarDecoder};
//! use polargraph_core::fec::PolarCode;
//!
//! let mut code = PolarCode::new(3, vec![0, 1, 2, 4]).unwrap();
//! let x = code.encode(&[1, 1, 0, 1]).unwrap();
//! let llr: Vec<f64> = x.iter().map(|&b| if b == 1 { -2.0 } else { 2.0 }).collect();
//!
//! let mut decoder = SparsePolarDecoder::new(&mut code, DecoderKind::MaximumLikelihood).unwrap();
//! let out = decoder.decode(&llr).unwrap();
//! assert_eq!(out.codeword, x);
//! ```

use std::collections::BTreeMap;

use crate::fec::{PolarCode, PolarFactorGraph};
use crate::gf2::Gf2Matrix;
use crate::linear_code::BinaryLinearBlockCode;
use crate::types::{BitVec, Llr, PolarError, PolarResult};

/// Largest code dimension accepted by exhaustive ML decoding.
pub const ML_MAX_DIMENSION: usize = 20;

/// Result of a decode call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Decided codeword.
    pub codeword: BitVec,
    /// `Σ llrᵢ·xᵢ` of the decided codeword.
    pub objective: f64,
    /// False if an iterative decoder stopped without satisfying every check.
    pub converged: bool,
}

/// Decoding strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecoderKind {
    /// Normalised min-sum. `alpha = 1.0` is plain min-sum.
    MinSum { max_iterations: usize, alpha: f64 },
    /// Exhaustive maximum-likelihood search.
    MaximumLikelihood,
}

impl Default for DecoderKind {
    fn default() -> Self {
        DecoderKind::MinSum {
            max_iterations: 50,
            alpha: 1.0,
        }
    }
}

fn objective(llr: &[Llr], codeword: &[u8]) -> f64 {
    llr.iter()
        .zip(codeword)
        .filter(|(_, &x)| x == 1)
        .map(|(&l, _)| l)
        .sum()
}

// ---------------------------------------------------------------------------
// Min-sum
// ---------------------------------------------------------------------------

/// Iterative min-sum decoder.
///
/// Messages live on edges in variable-major order; each check keeps the
/// edge indices of its neighbours.
#[derive(Debug, Clone)]
pub struct MinSumDecoder {
    parity_check: Gf2Matrix,
    max_iterations: usize,
    alpha: f64,
    /// `var_edge_start[v]..var_edge_start[v + 1]` are the edges of variable `v`.
    var_edge_start: Vec<usize>,
    check_edges: Vec<Vec<usize>>,
    var_to_check: Vec<f64>,
    check_to_var: Vec<f64>,
}

impl MinSumDecoder {
    pub fn new(parity_check: &Gf2Matrix, max_iterations: usize, alpha: f64) -> PolarResult<Self> {
        if max_iterations == 0 {
            return Err(PolarError::invalid("min-sum needs at least one iteration"));
        }
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(PolarError::invalid(format!(
                "min-sum normalisation must lie in (0, 1], got {}",
                alpha
            )));
        }
        let (m, n) = (parity_check.num_rows(), parity_check.num_cols());
        let mut var_edge_start = Vec::with_capacity(n + 1);
        let mut check_edges = vec![Vec::new(); m];
        let mut edge = 0;
        for v in 0..n {
            var_edge_start.push(edge);
            for (c, edges) in check_edges.iter_mut().enumerate() {
                if parity_check.get(c, v) == 1 {
                    edges.push(edge);
                    edge += 1;
                }
            }
        }
        var_edge_start.push(edge);

        Ok(Self {
            parity_check: parity_check.clone(),
            max_iterations,
            alpha,
            var_edge_start,
            check_edges,
            var_to_check: vec![0.0; edge],
            check_to_var: vec![0.0; edge],
        })
    }

    pub fn blocklength(&self) -> usize {
        self.parity_check.num_cols()
    }

    /// `L(c→v) = α · Π sign(L(v'→c)) · min |L(v'→c)|` over `v' ≠ v`.
    fn check_node_update(&mut self) {
        for edges in &self.check_edges {
            if edges.is_empty() {
                continue;
            }
            let mut sign_product = 1.0;
            let mut min1 = f64::INFINITY;
            let mut min1_edge = usize::MAX;
            let mut min2 = f64::INFINITY;
            for &e in edges {
                let msg = self.var_to_check[e];
                let mag = msg.abs();
                if msg < 0.0 {
                    sign_product = -sign_product;
                }
                if mag < min1 {
                    min2 = min1;
                    min1 = mag;
                    min1_edge = e;
                } else if mag < min2 {
                    min2 = mag;
                }
            }
            for &e in edges {
                let own_sign = if self.var_to_check[e] < 0.0 { -1.0 } else { 1.0 };
                let excl_min = if e == min1_edge { min2 } else { min1 };
                let excl_min = if excl_min.is_finite() { excl_min } else { 0.0 };
                self.check_to_var[e] = self.alpha * sign_product * own_sign * excl_min;
            }
        }
    }

    pub fn decode(&mut self, llr: &[Llr]) -> PolarResult<DecodeOutput> {
        let n = self.blocklength();
        if llr.len() != n {
            return Err(PolarError::invalid(format!(
                "expected {} LLRs, got {}",
                n,
                llr.len()
            )));
        }
        for v in 0..n {
            for e in self.var_edge_start[v]..self.var_edge_start[v + 1] {
                self.var_to_check[e] = llr[v];
            }
        }
        self.check_to_var.iter_mut().for_each(|m| *m = 0.0);

        let mut hard = vec![0u8; n];
        for iteration in 0..self.max_iterations {
            self.check_node_update();
            for v in 0..n {
                let edges = self.var_edge_start[v]..self.var_edge_start[v + 1];
                let total: f64 = llr[v] + self.check_to_var[edges.clone()].iter().sum::<f64>();
                hard[v] = (total < 0.0) as u8;
                for e in edges {
                    self.var_to_check[e] = total - self.check_to_var[e];
                }
            }
            if self.parity_check.mul_vec(&hard).iter().all(|&s| s == 0) {
                tracing::trace!(iterations = iteration + 1, "min-sum converged");
                return Ok(DecodeOutput {
                    objective: objective(llr, &hard),
                    codeword: hard,
                    converged: true,
                });
            }
        }
        tracing::debug!(iterations = self.max_iterations, "min-sum did not converge");
        Ok(DecodeOutput {
            objective: objective(llr, &hard),
            codeword: hard,
            converged: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Maximum likelihood
// ---------------------------------------------------------------------------

/// Exhaustive ML decoder walking the code in Gray-code order.
#[derive(Debug, Clone)]
pub struct MlDecoder {
    generator: Gf2Matrix,
    blocklength: usize,
}

impl MlDecoder {
    pub fn new(code: &BinaryLinearBlockCode) -> PolarResult<Self> {
        if code.infolength() > ML_MAX_DIMENSION {
            return Err(PolarError::invalid(format!(
                "ML decoding supports dimension up to {}, code has {}",
                ML_MAX_DIMENSION,
                code.infolength()
            )));
        }
        Ok(Self {
            generator: code.generator_matrix(),
            blocklength: code.blocklength(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.generator.num_rows()
    }

    /// Codeword minimising `Σ llrᵢ·xᵢ`; the first one found wins ties.
    pub fn decode(&self, llr: &[Llr]) -> PolarResult<DecodeOutput> {
        if llr.len() != self.blocklength {
            return Err(PolarError::invalid(format!(
                "expected {} LLRs, got {}",
                self.blocklength,
                llr.len()
            )));
        }
        let mut word = vec![0u8; self.blocklength];
        let mut current = 0.0;
        let mut best = word.clone();
        let mut best_objective = 0.0;
        for step in 1u64..(1u64 << self.dimension()) {
            let row = self.generator.row(step.trailing_zeros() as usize);
            for (j, &g) in row.iter().enumerate() {
                if g == 1 {
                    current += if word[j] == 0 { llr[j] } else { -llr[j] };
                    word[j] ^= 1;
                }
            }
            if current < best_objective {
                best_objective = current;
                best.copy_from_slice(&word);
            }
        }
        Ok(DecodeOutput {
            objective: objective(llr, &best),
            codeword: best,
            converged: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Common interface
// ---------------------------------------------------------------------------

/// A decoder bound to one code.
#[derive(Debug, Clone)]
pub enum Decoder {
    MinSum(MinSumDecoder),
    MaximumLikelihood(MlDecoder),
}

impl Decoder {
    pub fn new(code: &BinaryLinearBlockCode, kind: DecoderKind) -> PolarResult<Self> {
        let decoder = match kind {
            DecoderKind::MinSum {
                max_iterations,
                alpha,
            } => Decoder::MinSum(MinSumDecoder::new(
                code.parity_check_matrix(),
                max_iterations,
                alpha,
            )?),
            DecoderKind::MaximumLikelihood => Decoder::MaximumLikelihood(MlDecoder::new(code)?),
        };
        tracing::debug!(code = code.name(), ?kind, "decoder ready");
        Ok(decoder)
    }

    pub fn decode(&mut self, llr: &[Llr]) -> PolarResult<DecodeOutput> {
        match self {
            Decoder::MinSum(d) => d.decode(llr),
            Decoder::MaximumLikelihood(d) => d.decode(llr),
        }
    }

    /// Human-readable settings of the strategy.
    pub fn configuration(&self) -> BTreeMap<String, String> {
        let mut config = BTreeMap::new();
        match self {
            Decoder::MinSum(d) => {
                config.insert("name".to_string(), "MinSum".to_string());
                config.insert("blocklength".to_string(), d.blocklength().to_string());
                config.insert("max_iterations".to_string(), d.max_iterations.to_string());
                config.insert("alpha".to_string(), d.alpha.to_string());
            }
            Decoder::MaximumLikelihood(d) => {
                config.insert("name".to_string(), "MaximumLikelihood".to_string());
                config.insert("blocklength".to_string(), d.blocklength.to_string());
                config.insert("dimension".to_string(), d.dimension().to_string());
            }
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Sparse polar decoding
// ---------------------------------------------------------------------------

/// Decoder running on the sparsified factor graph of a polar code.
#[derive(Debug, Clone)]
pub struct SparsePolarDecoder {
    decoder: Decoder,
    /// Column of each code bit in the sparse matrix, `None` if frozen to zero.
    columns: Vec<Option<usize>>,
    num_columns: usize,
}

impl SparsePolarDecoder {
    /// Sparsify the code's factor graph (if needed) and bind a decoder to it.
    pub fn new(code: &mut PolarCode, kind: DecoderKind) -> PolarResult<Self> {
        let graph = code.factor_graph_mut()?;
        graph.sparsify()?;
        Self::from_graph(graph, kind)
    }

    /// Bind a decoder to an already sparsified graph.
    pub fn from_graph(graph: &PolarFactorGraph, kind: DecoderKind) -> PolarResult<Self> {
        if !graph.is_sparsified() {
            return Err(PolarError::NotSparsified);
        }
        let h = graph.parity_check_matrix();
        let num_columns = h.num_cols();
        let long_code = BinaryLinearBlockCode::new(
            format!("sparse polar N={} ({} columns)", graph.blocklength(), num_columns),
            h,
        );
        Ok(Self {
            decoder: Decoder::new(&long_code, kind)?,
            columns: graph.codeword_columns(),
            num_columns,
        })
    }

    pub fn blocklength(&self) -> usize {
        self.columns.len()
    }

    /// Decode `N` channel LLRs into `N` code bits.
    pub fn decode(&mut self, llr: &[Llr]) -> PolarResult<DecodeOutput> {
        if llr.len() != self.blocklength() {
            return Err(PolarError::invalid(format!(
                "expected {} LLRs, got {}",
                self.blocklength(),
                llr.len()
            )));
        }
        let mut long_llr = vec![0.0; self.num_columns];
        for (&l, column) in llr.iter().zip(&self.columns) {
            if let Some(c) = column {
                long_llr[*c] = l;
            }
        }
        let long = self.decoder.decode(&long_llr)?;
        let codeword: BitVec = self
            .columns
            .iter()
            .map(|column| column.map_or(0, |c| long.codeword[c]))
            .collect();
        Ok(DecodeOutput {
            objective: objective(llr, &codeword),
            codeword,
            converged: long.converged,
        })
    }

    pub fn configuration(&self) -> BTreeMap<String, String> {
        let mut config = self.decoder.configuration();
        config.insert("blocklength".to_string(), self.blocklength().to_string());
        config.insert("graph_columns".to_string(), self.num_columns.to_string());
        config
    }
}
