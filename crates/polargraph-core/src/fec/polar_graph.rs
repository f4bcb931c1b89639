//! Sparse Factor Graph of a Polar Code
//!
//! The polar encoder `x = u·B_N·F^{⊗n}` is a network of `n` butterfly stages.
//! Writing every intermediate bit as a variable gives a factor graph with
//! `(n+1)·N` variables `s_{column,row}` and `n·N` checks, as used for LP
//! decoding of polar codes (Taranalli and Siegel, "Adaptive Linear
//! Programming Decoding of Polar Codes"):
//!
//! ```text
//!  column:   0 (x)        1          ...        n (u, bit-reversed rows)
//!
//!   s0,t ── c0,t ── s1,t            upper triple: (s1,t, c0,t, s0,t)
//!                  ╱
//!   s0,r ── c0,r ── s1,r            lower triple: (s1,r, c0,r, s0,r)
//! ```
//!
//! Check `c_{column-1,row}` ties `s_{column-1,row}` to `s_{column,row}`; in
//! the lower half of each butterfly block the check of the partner row `t`
//! also takes `s_{column,r}`. Each butterfly is recorded as a
//! [`ZStructure`], which [`PolarFactorGraph::sparsify`] uses to eliminate
//! frozen variables.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::fec::PolarFactorGraph;
//!
//! let mut graph = PolarFactorGraph::new(3).unwrap();
//! graph.set_frozen(&[0, 1, 2, 4]).unwrap();
//! let stats = graph.sparsify().unwrap();
//! assert!(stats.variables_after < stats.variables_before);
//! assert_eq!(graph.parity_check_matrix().num_cols(), 10);
//! ```

use crate::bit_reversal::bit_reverse;
use crate::factor_graph::{CheckId, FactorGraph, VarId};
use crate::gf2::Gf2Matrix;
use crate::types::{PolarError, PolarResult};

/// Largest supported number of stages.
pub const MAX_STAGES: u32 = 24;

/// One butterfly of the polar transform.
///
/// "Left" variables sit in the higher column (closer to `u`), "right"
/// variables in the lower column (closer to `x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZStructure {
    pub upper_left: VarId,
    pub upper_check: CheckId,
    pub upper_right: VarId,
    pub lower_left: VarId,
    pub lower_check: CheckId,
    pub lower_right: VarId,
}

/// Node counts before and after [`PolarFactorGraph::sparsify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SparsifyStats {
    pub variables_before: usize,
    pub checks_before: usize,
    pub variables_after: usize,
    pub checks_after: usize,
}

/// Factor graph mirroring the butterfly structure of a length-`2^n` polar code.
#[derive(Debug, Clone)]
pub struct PolarFactorGraph {
    n: u32,
    graph: FactorGraph,
    /// `polar_vars[column][row]` is `s_{column,row}`.
    polar_vars: Vec<Vec<VarId>>,
    /// `polar_checks[column][row]` is the check right of `s_{column,row}`.
    polar_checks: Vec<Vec<CheckId>>,
    z_structures: Vec<ZStructure>,
    u: Vec<VarId>,
    sparsified: bool,
}

impl PolarFactorGraph {
    /// Build the full graph for blocklength `2^n`, `n <= MAX_STAGES`.
    pub fn new(n: u32) -> PolarResult<Self> {
        if n > MAX_STAGES {
            return Err(PolarError::invalid(format!(
                "n must be at most {}, got {}",
                MAX_STAGES, n
            )));
        }
        let big_n = 1usize << n;
        let cols = n as usize;
        let mut graph = FactorGraph::new();

        let mut polar_vars = Vec::with_capacity(cols + 1);
        for column in 0..=cols {
            let stage: Vec<VarId> = (0..big_n)
                .map(|row| {
                    let identifier = if column == 0 {
                        format!("x{}", row)
                    } else if column == cols {
                        format!("u{}", bit_reverse(row, n))
                    } else {
                        format!("s{},{}", column, row)
                    };
                    graph.add_variable(identifier, column, row)
                })
                .collect();
            polar_vars.push(stage);
        }

        let mut polar_checks = Vec::with_capacity(cols);
        for column in 0..cols {
            let stage: Vec<CheckId> = (0..big_n)
                .map(|row| {
                    let check = graph.add_check(format!("c{},{}", column, row), column, row);
                    graph.connect(polar_vars[column][row], check);
                    check
                })
                .collect();
            polar_checks.push(stage);
        }

        let mut z_structures = Vec::with_capacity(cols * big_n / 2);
        for column in 1..=cols {
            let k = 1usize << column;
            let mut stage = Vec::with_capacity(big_n / 2);
            for row in 0..big_n {
                let var = polar_vars[column][row];
                let check = polar_checks[column - 1][row];
                graph.connect(var, check);
                if row % k >= k / 2 {
                    let partner = row - k / 2;
                    let partner_check = polar_checks[column - 1][partner];
                    graph.connect(var, partner_check);
                    stage.push(ZStructure {
                        upper_left: polar_vars[column][partner],
                        upper_check: partner_check,
                        upper_right: polar_vars[column - 1][partner],
                        lower_left: var,
                        lower_check: check,
                        lower_right: polar_vars[column - 1][row],
                    });
                }
            }
            z_structures.extend(stage.into_iter().rev());
        }

        let u = (0..big_n).map(|i| polar_vars[cols][bit_reverse(i, n)]).collect();
        graph.set_codeword(polar_vars[0].clone());

        tracing::debug!(
            n,
            variables = graph.num_variables(),
            checks = graph.num_checks(),
            "built polar factor graph"
        );

        Ok(Self {
            n,
            graph,
            polar_vars,
            polar_checks,
            z_structures,
            u,
            sparsified: false,
        })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn blocklength(&self) -> usize {
        1 << self.n
    }

    /// Underlying generic factor graph.
    pub fn graph(&self) -> &FactorGraph {
        &self.graph
    }

    /// `s_{column,row}`.
    pub fn variable(&self, column: usize, row: usize) -> VarId {
        self.polar_vars[column][row]
    }

    /// Check right of `s_{column,row}`.
    pub fn check(&self, column: usize, row: usize) -> CheckId {
        self.polar_checks[column][row]
    }

    /// Butterflies ordered by stage, rows reversed within each stage.
    pub fn z_structures(&self) -> &[ZStructure] {
        &self.z_structures
    }

    /// Information variables: `u()[i]` is information bit `i`.
    pub fn u(&self) -> &[VarId] {
        &self.u
    }

    /// Codeword variables in natural order.
    pub fn x(&self) -> &[VarId] {
        self.graph.codeword()
    }

    pub fn is_sparsified(&self) -> bool {
        self.sparsified
    }

    /// Mark exactly the given information positions as frozen.
    ///
    /// Must be called before [`sparsify`](Self::sparsify).
    pub fn set_frozen(&mut self, frozen: &[usize]) -> PolarResult<()> {
        if self.sparsified {
            return Err(PolarError::invalid(
                "frozen bits cannot change after sparsification",
            ));
        }
        let big_n = self.blocklength();
        if let Some(&bad) = frozen.iter().find(|&&i| i >= big_n) {
            return Err(PolarError::invalid(format!(
                "frozen index {} out of range for blocklength {}",
                bad, big_n
            )));
        }
        for &u in &self.u {
            self.graph.var_mut(u).frozen = false;
        }
        for &i in frozen {
            self.graph.var_mut(self.u[i]).frozen = true;
        }
        Ok(())
    }

    /// Frozen information positions, ascending.
    pub fn frozen(&self) -> Vec<usize> {
        (0..self.u.len())
            .filter(|&i| self.graph.var(self.u[i]).frozen)
            .collect()
    }

    /// Check that Z-structure reduction never meets a frozen lower-left
    /// variable next to an unfrozen upper-left one, without touching the graph.
    pub fn validate_frozen(&self) -> PolarResult<()> {
        let mut frozen: Vec<bool> = (0..self.polar_vars.len() * self.blocklength())
            .map(|i| self.graph.var(VarId(i)).frozen)
            .collect();
        for z in self.z_structures.iter().rev() {
            match (frozen[z.upper_left.0], frozen[z.lower_left.0]) {
                (true, true) => {
                    frozen[z.upper_right.0] = true;
                    frozen[z.lower_right.0] = true;
                }
                (false, true) => {
                    return Err(PolarError::InconsistentFrozenSet {
                        lower: self.graph.var(z.lower_left).identifier.clone(),
                        upper: self.graph.var(z.upper_left).identifier.clone(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Eliminate frozen variables, degree-2 checks and degree-1 auxiliary
    /// variables in place.
    ///
    /// The reduced graph describes the same set of codewords on the `x`
    /// variables, every check has degree at most 3, and node indices are
    /// dense again. Calling it a second time is a no-op.
    pub fn sparsify(&mut self) -> PolarResult<SparsifyStats> {
        let before = (self.graph.num_variables(), self.graph.num_checks());
        if self.sparsified {
            return Ok(SparsifyStats {
                variables_before: before.0,
                checks_before: before.1,
                variables_after: before.0,
                checks_after: before.1,
            });
        }
        self.validate_frozen()?;

        self.reduce_z_structures();
        self.merge_degree_two_checks();
        self.remove_dangling_variables();
        self.graph.compact(|node| node.is_codeword());
        self.sparsified = true;

        let stats = SparsifyStats {
            variables_before: before.0,
            checks_before: before.1,
            variables_after: self.graph.num_variables(),
            checks_after: self.graph.num_checks(),
        };
        tracing::info!(
            n = self.n,
            variables = stats.variables_after,
            checks = stats.checks_after,
            removed_variables = stats.variables_before - stats.variables_after,
            removed_checks = stats.checks_before - stats.checks_after,
            "sparsified polar factor graph"
        );
        Ok(stats)
    }

    /// Step 1: push frozen status from `u` towards `x` through every
    /// butterfly, deepest stage first.
    fn reduce_z_structures(&mut self) {
        let mut reduced = 0usize;
        for idx in (0..self.z_structures.len()).rev() {
            let z = self.z_structures[idx];
            let upper_frozen = self.graph.var(z.upper_left).frozen;
            let lower_frozen = self.graph.var(z.lower_left).frozen;
            match (upper_frozen, lower_frozen) {
                (true, true) => {
                    self.graph.isolate_variable(z.upper_left);
                    self.graph.isolate_variable(z.lower_left);
                    self.graph.merge_variables(z.lower_right, z.lower_left);
                    self.graph.var_mut(z.upper_right).frozen = true;
                    self.graph.var_mut(z.lower_right).frozen = true;
                    reduced += 1;
                }
                (true, false) => {
                    self.graph.merge_variables(z.lower_right, z.lower_left);
                    self.graph.isolate_variable(z.upper_left);
                    reduced += 1;
                }
                (false, true) => panic!(
                    "Z-structure invariant violated: {} frozen but {} is not",
                    self.graph.var(z.lower_left).identifier,
                    self.graph.var(z.upper_left).identifier
                ),
                (false, false) => {}
            }
        }
        tracing::debug!(reduced, "reduced Z-structures");
    }

    /// Step 2: a check on exactly two variables forces them equal, so the
    /// variables are merged. Codeword variables always survive; a check
    /// joining two codeword variables is kept.
    fn merge_degree_two_checks(&mut self) {
        let mut merged = 0usize;
        for column in (0..self.n as usize).rev() {
            for row in 0..self.blocklength() {
                let check = self.polar_checks[column][row];
                if self.graph.check(check).degree() != 2 {
                    continue;
                }
                let ends: Vec<VarId> = self.graph.check(check).neighbors().collect();
                let (a, b) = (ends[0], ends[1]);
                let (keep, remove) = match (
                    self.graph.var(a).is_codeword(),
                    self.graph.var(b).is_codeword(),
                ) {
                    (true, true) => continue,
                    (false, true) => (b, a),
                    _ => (a, b),
                };
                tracing::trace!(
                    keep = %self.graph.var(keep).identifier,
                    remove = %self.graph.var(remove).identifier,
                    "merging across degree-2 check"
                );
                self.graph.merge_variables(keep, remove);
                merged += 1;
            }
        }
        tracing::debug!(merged, "removed degree-2 checks");
    }

    /// Step 3: an auxiliary variable seen by a single check leaves that check
    /// without constraining power, so both are dropped. Dropping a check can
    /// leave its other variables dangling in turn; they are revisited until
    /// none remain.
    fn remove_dangling_variables(&mut self) {
        let mut removed = 0usize;
        let mut pending: Vec<VarId> = self.graph.var_nodes().to_vec();
        while let Some(v) = pending.pop() {
            let node = self.graph.var(v);
            if !node.is_active() || node.degree() != 1 || node.is_codeword() || node.frozen {
                continue;
            }
            let first = node.neighbors().next();
            if let Some(check) = first {
                pending.extend(self.graph.check(check).neighbors().filter(|&w| w != v));
                self.graph.isolate_check(check);
                removed += 1;
            }
        }
        tracing::debug!(removed, "removed degree-1 auxiliary variables");
    }

    /// Columns of [`parity_check_matrix`](Self::parity_check_matrix): the
    /// surviving unfrozen variables in index order.
    pub fn unfrozen_variables(&self) -> Vec<VarId> {
        self.graph.unfrozen_variables()
    }

    /// Parity-check matrix with one row per check and one column per
    /// surviving unfrozen variable.
    pub fn parity_check_matrix(&self) -> Gf2Matrix {
        let full = self.graph.parity_check_matrix();
        let columns: Vec<usize> = self
            .graph
            .var_nodes()
            .iter()
            .enumerate()
            .filter(|(_, &v)| !self.graph.var(v).frozen)
            .map(|(i, _)| i)
            .collect();
        full.select_columns(&columns)
    }

    /// For each codeword bit, its column in the parity-check matrix
    /// (`None` if the bit is frozen to zero).
    pub fn codeword_columns(&self) -> Vec<Option<usize>> {
        let mut column_of = vec![None; self.graph.num_variables()];
        for (column, v) in self.unfrozen_variables().into_iter().enumerate() {
            column_of[self.graph.var(v).index] = Some(column);
        }
        self.x()
            .iter()
            .map(|&x| column_of[self.graph.var(x).index])
            .collect()
    }
}
