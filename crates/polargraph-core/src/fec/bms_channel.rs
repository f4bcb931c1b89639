//! Binary Memoryless Symmetric (BMS) Channels
//!
//! Channel degrading for polar code construction, following Tal and Vardy,
//! "How to Construct Polar Codes". A BMS channel `W` is kept as a finite list
//! of output symbols. Symmetry pairs every output `y` with a conjugate `ȳ`
//! such that `W(ȳ|0) = W(y|1)`, so the channel is stored as a list of
//! conjugate pairs `(a, b) = (W(y|0), W(y|1))` with `a ≥ b`, sorted by
//! likelihood ratio `a/b`. A pair with `a == b` is an erasure.
//!
//! ## Operations
//!
//! - [`BmsChannel::degrading_merge`]: greedily merges LR-adjacent pairs,
//!   each time picking the merge that loses the least mutual information,
//!   until at most `mu` output symbols remain. Merging two symbols with
//!   `a ≥ b` is a degrading operation: the result is never more informative.
//! - [`BmsChannel::arikan_transform1`] / [`BmsChannel::arikan_transform2`]:
//!   the two channels `W ⊟ W` and `W ⊞ W` produced by one polarization step.
//!
//! ```text
//!   W ⊟ W : (a1,b1),(a2,b2) -> (a1a2 + b1b2, a1b2 + b1a2)
//!   W ⊞ W : (a1,b1),(a2,b2) -> (a1a2, b1b2), (a1b2, b1a2)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::fec::BmsChannel;
//!
//! let bsc = BmsChannel::bsc(0.1).unwrap();
//! let worse = bsc.arikan_transform1().degrading_merge(4).unwrap();
//! let better = bsc.arikan_transform2().degrading_merge(4).unwrap();
//! assert!(worse.error_probability() > bsc.error_probability());
//! assert!(better.error_probability() <= bsc.error_probability() + 1e-12);
//! ```

use std::cmp::Ordering;

use crate::types::{PolarError, PolarResult};

/// Tolerance used when validating that probability masses sum to one.
const MASS_TOLERANCE: f64 = 1e-9;

/// Relative tolerance under which two pairs count as the same likelihood ratio.
const LR_TOLERANCE: f64 = 1e-12;

/// One conjugate pair of output symbols: `a = W(y|0)`, `b = W(y|1)`, `a ≥ b`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SymbolPair {
    a: f64,
    b: f64,
}

impl SymbolPair {
    fn new(x: f64, y: f64) -> Self {
        if x >= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    fn mass(&self) -> f64 {
        self.a + self.b
    }

    fn is_erasure(&self) -> bool {
        self.a == self.b
    }

    /// `W(y|1) / (W(y|0) + W(y|1))`, in `[0, ½]` and decreasing in the
    /// likelihood ratio. Finite whenever the pair carries mass.
    fn crossover(&self) -> f64 {
        self.b / self.mass()
    }

    /// Mutual information carried by `y` and `ȳ` together, in bits.
    fn capacity(&self) -> f64 {
        let total = self.mass();
        if total <= 0.0 {
            return 0.0;
        }
        xlog2(self.a, 2.0 * self.a / total) + xlog2(self.b, 2.0 * self.b / total)
    }

    fn merged(&self, other: &Self) -> Self {
        Self::new(self.a + other.a, self.b + other.b)
    }
}

/// `x · log2(r)` with the convention `0 · log2(0) = 0`.
fn xlog2(x: f64, r: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * r.log2()
    }
}

/// Information lost by merging two adjacent pairs.
fn merge_loss(p: &SymbolPair, q: &SymbolPair) -> f64 {
    p.capacity() + q.capacity() - p.merged(q).capacity()
}

/// Quantized binary memoryless symmetric channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BmsChannel {
    pairs: Vec<SymbolPair>,
}

impl BmsChannel {
    /// Normalize raw `(W(y|0), W(y|1))` pairs: orient, drop zero-mass pairs,
    /// sort by likelihood ratio and fold pairs of equal ratio together.
    fn from_pairs(raw: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut pairs: Vec<SymbolPair> = raw
            .into_iter()
            .map(|(x, y)| SymbolPair::new(x, y))
            .filter(|p| p.mass() > 0.0)
            .collect();
        // ascending likelihood ratio is descending crossover
        pairs.sort_by(|p, q| q.crossover().total_cmp(&p.crossover()));
        // symbols of (numerically) equal likelihood ratio are statistically equivalent
        pairs.dedup_by(|next, kept| {
            let (x, y) = (kept.crossover(), next.crossover());
            if (x - y).abs() <= LR_TOLERANCE * x.max(y) {
                *kept = kept.merged(next);
                true
            } else {
                false
            }
        });
        Self { pairs }
    }

    /// Binary symmetric channel with crossover probability `p`.
    pub fn bsc(p: f64) -> PolarResult<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(PolarError::invalid(format!(
                "crossover probability must lie in [0, 1], got {}",
                p
            )));
        }
        Ok(Self::from_pairs([(1.0 - p, p)]))
    }

    /// Binary erasure channel with erasure probability `e`.
    pub fn bec(e: f64) -> PolarResult<Self> {
        if !(0.0..=1.0).contains(&e) {
            return Err(PolarError::invalid(format!(
                "erasure probability must lie in [0, 1], got {}",
                e
            )));
        }
        Ok(Self::from_pairs([(1.0 - e, 0.0), (e / 2.0, e / 2.0)]))
    }

    /// Build from output symbols given as `(W(y|0), W(y|0) / W(y|1))`.
    ///
    /// Masses must be non-negative and sum to one; the likelihood ratios must
    /// describe a symmetric channel (each symbol with ratio `λ > 1` needs
    /// conjugate mass `W(y|0)/λ` among the symbols with ratio `1/λ`).
    /// `f64::INFINITY` marks a symbol that never occurs for input 1.
    pub fn from_symbols(symbols: &[(f64, f64)]) -> PolarResult<Self> {
        let mut total = 0.0;
        let mut conjugate_mass = 0.0;
        let mut below_one = 0.0;
        let mut raw = Vec::with_capacity(symbols.len());
        for &(mass, lr) in symbols {
            if !(mass >= 0.0) || mass.is_infinite() || !(lr >= 0.0) {
                return Err(PolarError::invalid(format!(
                    "invalid channel symbol (mass={}, lr={})",
                    mass, lr
                )));
            }
            total += mass;
            match lr.partial_cmp(&1.0) {
                Some(Ordering::Greater) => {
                    let b = if lr.is_infinite() { 0.0 } else { mass / lr };
                    conjugate_mass += b;
                    raw.push((mass, b));
                }
                Some(Ordering::Equal) => raw.push((mass / 2.0, mass / 2.0)),
                _ => below_one += mass,
            }
        }
        if (total - 1.0).abs() > MASS_TOLERANCE {
            return Err(PolarError::invalid(format!(
                "symbol masses must sum to 1, got {}",
                total
            )));
        }
        if (below_one - conjugate_mass).abs() > MASS_TOLERANCE {
            return Err(PolarError::invalid(
                "likelihood ratios do not describe a symmetric channel",
            ));
        }
        Ok(Self::from_pairs(raw))
    }

    /// All output symbols as `(W(y|0), likelihood ratio)`, sorted by ratio.
    ///
    /// The erasure symbol, if any, appears once with ratio 1.
    pub fn symbols(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(2 * self.pairs.len());
        for p in &self.pairs {
            if p.is_erasure() {
                out.push((p.mass(), 1.0));
                continue;
            }
            let lr = if p.b > 0.0 { p.a / p.b } else { f64::INFINITY };
            out.push((p.a, lr));
            out.push((p.b, 1.0 / lr));
        }
        out.sort_by(|x, y| x.1.total_cmp(&y.1));
        out
    }

    /// Number of distinct output symbols.
    pub fn output_size(&self) -> usize {
        self.pairs
            .iter()
            .map(|p| if p.is_erasure() { 1 } else { 2 })
            .sum()
    }

    /// Sum of all output masses under input 0 (one, up to rounding).
    pub fn total_mass(&self) -> f64 {
        self.pairs.iter().map(SymbolPair::mass).sum()
    }

    /// Bit-error probability of the maximum-likelihood decision,
    /// `½ Σ_y min(W(y|0), W(y|1))`.
    pub fn error_probability(&self) -> f64 {
        self.pairs.iter().map(|p| p.b).sum()
    }

    /// Symmetric capacity `I(W)` in bits.
    pub fn mutual_information(&self) -> f64 {
        self.pairs.iter().map(SymbolPair::capacity).sum()
    }

    /// Bhattacharyya parameter `Z(W) = Σ_y sqrt(W(y|0) W(y|1))`.
    pub fn bhattacharyya(&self) -> f64 {
        self.pairs.iter().map(|p| 2.0 * (p.a * p.b).sqrt()).sum()
    }

    /// Degraded approximation with at most `mu` output symbols.
    ///
    /// `mu` must be even and at least 2.
    pub fn degrading_merge(&self, mu: usize) -> PolarResult<Self> {
        validate_mu(mu)?;
        let target = mu / 2;
        let mut pairs = self.pairs.clone();
        if pairs.len() <= target {
            return Ok(Self { pairs });
        }

        let mut losses: Vec<f64> = pairs
            .windows(2)
            .map(|w| merge_loss(&w[0], &w[1]))
            .collect();

        while pairs.len() > target {
            let (i, _) = losses
                .iter()
                .enumerate()
                .min_by(|x, y| x.1.total_cmp(y.1))
                .unwrap_or((0, &0.0));
            pairs[i] = pairs[i].merged(&pairs[i + 1]);
            pairs.remove(i + 1);
            losses.remove(i);
            if i > 0 {
                losses[i - 1] = merge_loss(&pairs[i - 1], &pairs[i]);
            }
            if i + 1 < pairs.len() {
                losses[i] = merge_loss(&pairs[i], &pairs[i + 1]);
            }
        }
        Ok(Self { pairs })
    }

    /// The "upper" channel `W ⊟ W`: the bit is decoded before its partner.
    pub fn arikan_transform1(&self) -> Self {
        let pairs = &self.pairs;
        Self::from_pairs(pairs.iter().flat_map(|p| {
            pairs
                .iter()
                .map(move |q| (p.a * q.a + p.b * q.b, p.a * q.b + p.b * q.a))
        }))
    }

    /// The "lower" channel `W ⊞ W`: the partner bit is already known.
    pub fn arikan_transform2(&self) -> Self {
        let pairs = &self.pairs;
        Self::from_pairs(pairs.iter().flat_map(|p| {
            pairs
                .iter()
                .flat_map(move |q| [(p.a * q.a, p.b * q.b), (p.a * q.b, p.b * q.a)])
        }))
    }
}

/// Reject granularities that cannot be reached by pairwise merging.
pub(crate) fn validate_mu(mu: usize) -> PolarResult<()> {
    if mu < 2 || mu % 2 != 0 {
        return Err(PolarError::invalid(format!(
            "mu must be an even number >= 2, got {}",
            mu
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn binary_entropy(p: f64) -> f64 {
        if p <= 0.0 || p >= 1.0 {
            return 0.0;
        }
        -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
    }

    #[test]
    fn test_bsc() {
        let w = BmsChannel::bsc(0.1).unwrap();
        assert_eq!(w.output_size(), 2);
        assert_abs_diff_eq!(w.error_probability(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(w.mutual_information(), 1.0 - binary_entropy(0.1), epsilon = 1e-12);
        assert_abs_diff_eq!(w.total_mass(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w.bhattacharyya(), 2.0 * (0.09f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_bec() {
        let w = BmsChannel::bec(0.3).unwrap();
        assert_eq!(w.output_size(), 3);
        assert_abs_diff_eq!(w.error_probability(), 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(w.mutual_information(), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(w.bhattacharyya(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BmsChannel::bsc(1.5).is_err());
        assert!(BmsChannel::bec(-0.1).is_err());
        assert!(BmsChannel::bsc(f64::NAN).is_err());
    }

    #[test]
    fn test_from_symbols_matches_bsc() {
        let w = BmsChannel::from_symbols(&[(0.1, 1.0 / 9.0), (0.9, 9.0)]).unwrap();
        let bsc = BmsChannel::bsc(0.1).unwrap();
        assert_eq!(w.output_size(), 2);
        assert_abs_diff_eq!(w.error_probability(), bsc.error_probability(), epsilon = 1e-12);
        assert_abs_diff_eq!(w.mutual_information(), bsc.mutual_information(), epsilon = 1e-12);
    }

    #[test]
    fn test_from_symbols_validation() {
        assert!(BmsChannel::from_symbols(&[(0.5, 2.0)]).is_err());
        // masses sum to 1 but not symmetric
        assert!(BmsChannel::from_symbols(&[(0.5, 2.0), (0.5, 0.5)]).is_err());
        assert!(BmsChannel::from_symbols(&[(-0.5, 2.0), (1.5, 1.0)]).is_err());
    }

    #[test]
    fn test_degenerate_channels() {
        let erased = BmsChannel::from_symbols(&[(1.0, 1.0)]).unwrap();
        assert_eq!(erased.output_size(), 1);
        assert_eq!(erased.symbols(), vec![(1.0, 1.0)]);
        assert_abs_diff_eq!(erased.error_probability(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(erased.mutual_information(), 0.0, epsilon = 1e-12);

        let perfect = BmsChannel::from_symbols(&[(1.0, f64::INFINITY)]).unwrap();
        assert_eq!(perfect.error_probability(), 0.0);
        assert_abs_diff_eq!(perfect.mutual_information(), 1.0, epsilon = 1e-12);

        let t = erased.arikan_transform2().degrading_merge(2).unwrap();
        assert_abs_diff_eq!(t.error_probability(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_symbols_sorted_and_symmetric() {
        let w = BmsChannel::bsc(0.2).unwrap().arikan_transform2();
        let symbols = w.symbols();
        assert!(symbols.windows(2).all(|s| s[0].1 <= s[1].1));
        let total: f64 = symbols.iter().map(|s| s.0).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transforms_bsc() {
        let w = BmsChannel::bsc(0.1).unwrap();
        let minus = w.arikan_transform1();
        let plus = w.arikan_transform2();
        assert_abs_diff_eq!(minus.error_probability(), 0.18, epsilon = 1e-12);
        assert_abs_diff_eq!(plus.error_probability(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(minus.total_mass(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(plus.total_mass(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transforms_preserve_total_capacity() {
        for w in [
            BmsChannel::bsc(0.11).unwrap(),
            BmsChannel::bec(0.4).unwrap(),
            BmsChannel::bsc(0.05).unwrap().arikan_transform2(),
        ] {
            let sum = w.arikan_transform1().mutual_information()
                + w.arikan_transform2().mutual_information();
            assert_abs_diff_eq!(sum, 2.0 * w.mutual_information(), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_transforms_bec_closed_form() {
        let e = 0.3;
        let w = BmsChannel::bec(e).unwrap();
        let minus = w.arikan_transform1();
        let plus = w.arikan_transform2();
        assert_abs_diff_eq!(minus.bhattacharyya(), 2.0 * e - e * e, epsilon = 1e-12);
        assert_abs_diff_eq!(plus.bhattacharyya(), e * e, epsilon = 1e-12);
        // an erasure channel stays an erasure channel: two outputs plus erasure
        assert_eq!(minus.output_size(), 3);
        assert_eq!(plus.output_size(), 3);
    }

    #[test]
    fn test_degrading_merge_rejects_bad_mu() {
        let w = BmsChannel::bsc(0.1).unwrap();
        assert!(matches!(w.degrading_merge(3), Err(PolarError::InvalidArgument(_))));
        assert!(matches!(w.degrading_merge(0), Err(PolarError::InvalidArgument(_))));
        assert!(w.degrading_merge(2).is_ok());
    }

    #[test]
    fn test_degrading_merge_is_degrading() {
        let mut w = BmsChannel::bsc(0.08).unwrap();
        for _ in 0..2 {
            w = w.arikan_transform2().arikan_transform1();
        }
        for mu in [2, 4, 8, 16, 32] {
            let q = w.degrading_merge(mu).unwrap();
            assert!(q.output_size() <= mu, "mu={mu} size={}", q.output_size());
            assert!(q.mutual_information() <= w.mutual_information() + 1e-12);
            assert!(q.error_probability() >= w.error_probability() - 1e-12);
            assert_abs_diff_eq!(q.total_mass(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degrading_merge_finer_is_better() {
        let w = BmsChannel::bsc(0.1).unwrap().arikan_transform1().arikan_transform2();
        let coarse = w.degrading_merge(2).unwrap();
        let fine = w.degrading_merge(8).unwrap();
        assert!(fine.mutual_information() >= coarse.mutual_information() - 1e-12);
    }

    #[test]
    fn test_degrading_merge_noop_when_small() {
        let w = BmsChannel::bsc(0.1).unwrap();
        assert_eq!(w.degrading_merge(16).unwrap(), w);
    }

    #[test]
    fn test_repeated_transforms_stay_sorted() {
        // cross-multiplied ratios of these pairs tie up to rounding
        let mut w = BmsChannel::bsc(0.11).unwrap().degrading_merge(16).unwrap();
        for _ in 0..6 {
            w = w.arikan_transform2().degrading_merge(16).unwrap();
            assert!(w.pairs.windows(2).all(|p| p[0].crossover() > p[1].crossover()));
            assert_abs_diff_eq!(w.total_mass(), 1.0, epsilon = 1e-9);
        }
        let mut w = BmsChannel::bsc(0.11).unwrap().degrading_merge(8).unwrap();
        for step in 0..5 {
            w = if step % 2 == 0 { w.arikan_transform1() } else { w.arikan_transform2() };
            w = w.degrading_merge(8).unwrap();
        }
        assert!(w.output_size() <= 8);
    }

    #[test]
    fn test_near_equal_ratios_fold() {
        let w = BmsChannel::from_pairs([(0.15, 0.05), (0.15 * (1.0 + 1e-15), 0.05), (0.6, 0.0)]);
        assert_eq!(w.pairs.len(), 2);
        assert_abs_diff_eq!(w.total_mass(), 1.0, epsilon = 1e-12);
        assert_eq!(w.pairs[1].b, 0.0);
    }
}
