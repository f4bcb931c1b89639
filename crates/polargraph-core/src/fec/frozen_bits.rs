//! Frozen-Bit Selection
//!
//! Chooses the frozen positions of a polar code of length `N = 2^n` by
//! estimating every bit-channel's error probability with channel degrading
//! (Tal and Vardy). Bit-channel `i` is obtained from the initial channel by
//! `n` polarization steps: for each bit of `i`, most significant first, a `0`
//! applies [`BmsChannel::arikan_transform1`] and a `1` applies
//! [`BmsChannel::arikan_transform2`]; every step is followed by a degrading
//! merge down to `mu` output symbols.
//!
//! Positions are independent, so with the `parallel` feature the `N`
//! bit-channels are evaluated on the rayon thread pool.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::fec::{BmsChannel, FrozenBitSelector, FrozenCriterion};
//!
//! let selector = FrozenBitSelector::new(BmsChannel::bsc(0.1).unwrap(), 3, 4).unwrap();
//! let frozen = selector.select(FrozenCriterion::Threshold(0.1)).unwrap();
//! assert_eq!(frozen, vec![0, 1, 2, 4]);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::fec::bms_channel::{validate_mu, BmsChannel};
use crate::fec::polar_graph::MAX_STAGES;
use crate::types::{PolarError, PolarResult};

/// Slack subtracted before rounding the frozen count up, so that products
/// such as `0.5 * 8` do not round up through floating-point noise.
const RATE_ROUNDING_SLACK: f64 = 1e-9;

/// How frozen positions are picked from the bit-channel error probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrozenCriterion {
    /// Freeze every position whose error probability exceeds the threshold.
    Threshold(f64),
    /// Freeze the `⌈(1 − rate)·N⌉` least reliable positions.
    Rate(f64),
}

impl FrozenCriterion {
    /// Build from optional threshold / rate; exactly one must be given.
    pub fn from_options(threshold: Option<f64>, rate: Option<f64>) -> PolarResult<Self> {
        let criterion = match (threshold, rate) {
            (Some(t), None) => FrozenCriterion::Threshold(t),
            (None, Some(r)) => FrozenCriterion::Rate(r),
            (Some(_), Some(_)) => {
                return Err(PolarError::invalid("give either a threshold or a rate, not both"))
            }
            (None, None) => return Err(PolarError::invalid("either a threshold or a rate is required")),
        };
        criterion.validate()?;
        Ok(criterion)
    }

    pub fn validate(&self) -> PolarResult<()> {
        match *self {
            FrozenCriterion::Threshold(t) if !t.is_finite() => Err(PolarError::invalid(format!(
                "threshold must be finite, got {}",
                t
            ))),
            FrozenCriterion::Rate(r) if !(0.0..=1.0).contains(&r) => Err(PolarError::invalid(
                format!("rate must lie in [0, 1], got {}", r),
            )),
            _ => Ok(()),
        }
    }

    /// Number of positions frozen by a rate criterion for blocklength `n`.
    fn frozen_count(rate: f64, blocklength: usize) -> usize {
        let count = ((1.0 - rate) * blocklength as f64 - RATE_ROUNDING_SLACK).ceil();
        (count.max(0.0) as usize).min(blocklength)
    }
}

/// Pick frozen positions from per-position error probabilities.
///
/// The result is sorted ascending. With [`FrozenCriterion::Rate`], ties in
/// error probability freeze the lower index first, as a lower-index butterfly
/// partner is never the more reliable one.
pub fn select_frozen(error_probabilities: &[f64], criterion: FrozenCriterion) -> PolarResult<Vec<usize>> {
    criterion.validate()?;
    let n = error_probabilities.len();
    let frozen = match criterion {
        FrozenCriterion::Threshold(threshold) => (0..n)
            .filter(|&i| error_probabilities[i] > threshold)
            .collect(),
        FrozenCriterion::Rate(rate) => {
            let count = FrozenCriterion::frozen_count(rate, n);
            // least reliable first; the stable sort keeps ties in index order
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| error_probabilities[b].total_cmp(&error_probabilities[a]));
            order.truncate(count);
            order.sort_unstable();
            order
        }
    };
    Ok(frozen)
}

/// Progress callback: `(completed positions, total positions)`.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Bit-channel degrading over all positions of a length-`2^n` polar code.
pub struct FrozenBitSelector {
    channel: BmsChannel,
    n: u32,
    mu: usize,
    parallel: bool,
    progress: Option<Box<ProgressFn>>,
}

impl fmt::Debug for FrozenBitSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenBitSelector")
            .field("n", &self.n)
            .field("mu", &self.mu)
            .field("parallel", &self.parallel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl FrozenBitSelector {
    /// Create a selector for blocklength `2^n` and degrading granularity `mu`.
    ///
    /// `mu` must be even and at least 2.
    pub fn new(channel: BmsChannel, n: u32, mu: usize) -> PolarResult<Self> {
        validate_mu(mu)?;
        if n > MAX_STAGES {
            return Err(PolarError::invalid(format!(
                "n must be at most {}, got {}",
                MAX_STAGES, n
            )));
        }
        Ok(Self {
            channel,
            n,
            mu,
            parallel: cfg!(feature = "parallel"),
            progress: None,
        })
    }

    /// Evaluate positions on the rayon pool (ignored without the `parallel`
    /// feature).
    pub fn parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }

    /// Register a callback invoked after each finished position.
    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn blocklength(&self) -> usize {
        1 << self.n
    }

    /// Degraded approximation of bit-channel `index`.
    pub fn bit_channel(&self, index: usize) -> PolarResult<BmsChannel> {
        if index >= self.blocklength() {
            return Err(PolarError::invalid(format!(
                "bit-channel index {} out of range for blocklength {}",
                index,
                self.blocklength()
            )));
        }
        let mut q = self.channel.degrading_merge(self.mu)?;
        for level in (0..self.n).rev() {
            let w = if (index >> level) & 1 == 0 {
                q.arikan_transform1()
            } else {
                q.arikan_transform2()
            };
            q = w.degrading_merge(self.mu)?;
        }
        Ok(q)
    }

    /// Approximate error probability of every bit-channel, by position.
    pub fn error_probabilities(&self) -> PolarResult<Vec<f64>> {
        let total = self.blocklength();
        tracing::info!(
            n = self.n,
            mu = self.mu,
            blocklength = total,
            parallel = self.parallel,
            "computing bit-channel error probabilities"
        );
        let completed = AtomicUsize::new(0);
        let evaluate = |i: usize| -> PolarResult<f64> {
            let p = self.bit_channel(i)?.error_probability();
            tracing::debug!(position = i, error_probability = p, "bit-channel done");
            let done = completed.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            if let Some(progress) = &self.progress {
                progress(done, total);
            }
            Ok(p)
        };

        #[cfg(feature = "parallel")]
        if self.parallel {
            return (0..total).into_par_iter().map(evaluate).collect();
        }

        (0..total).map(evaluate).collect()
    }

    /// Run the bit-channel computation and pick frozen positions.
    pub fn select(&self, criterion: FrozenCriterion) -> PolarResult<Vec<usize>> {
        criterion.validate()?;
        let probabilities = self.error_probabilities()?;
        let frozen = select_frozen(&probabilities, criterion)?;
        tracing::info!(
            frozen = frozen.len(),
            blocklength = probabilities.len(),
            ?criterion,
            "frozen set selected"
        );
        Ok(frozen)
    }
}

/// Compute frozen bit indices for blocklength `2^n`.
///
/// Exactly one of `threshold` and `rate` must be given. Invalid arguments are
/// rejected before any channel is evaluated.
pub fn compute_frozen_indices(
    channel: &BmsChannel,
    n: u32,
    mu: usize,
    threshold: Option<f64>,
    rate: Option<f64>,
) -> PolarResult<Vec<usize>> {
    let criterion = FrozenCriterion::from_options(threshold, rate)?;
    FrozenBitSelector::new(channel.clone(), n, mu)?.select(criterion)
}
