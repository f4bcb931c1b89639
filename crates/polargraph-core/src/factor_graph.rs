//! Factor graphs of binary linear codes
//!
//! A factor graph is a bipartite graph of **variable nodes** (code bits and
//! auxiliary bits) and **check nodes** (parity constraints: the XOR of all
//! adjacent variables is zero). The graph is stored as an arena: nodes are
//! addressed by [`VarId`] / [`CheckId`] and adjacency is kept as ordered index
//! sets on both sides, so mutation never invalidates a handle.
//!
//! Two mutation primitives exist besides [`FactorGraph::connect`]:
//!
//! - **merge** ([`FactorGraph::merge_variables`]): identify two variables.
//!   Every edge of the removed node moves to the kept node. When the kept node
//!   is already adjacent to that check, the two edges cancel, since
//!   `a ⊕ a = 0` over GF(2). The removed node becomes inactive and stays in
//!   the ordered node lists until the next [`FactorGraph::compact`].
//! - **isolate** ([`FactorGraph::isolate_variable`],
//!   [`FactorGraph::isolate_check`]): drop all edges of a node while keeping
//!   the node itself. Isolated nodes disappear on [`FactorGraph::compact`].
//!
//! ```text
//!   v0   v1   v2          v0   v1
//!    \   |   /             \   |
//!     \  |  /      merge    \  |
//!       c0       v2 -> v1     c0  ... v1 inherits v2's other checks
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::gf2::Gf2Matrix;

/// Handle of a variable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Handle of a check node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckId(pub usize);

/// A variable (bit) node.
#[derive(Debug, Clone)]
pub struct VariableNode {
    /// Human-readable name, e.g. `x3` or `u5`.
    pub identifier: String,
    /// Stage of the node in a layered graph (0 for flat codes).
    pub column: usize,
    /// Position within its stage.
    pub row: usize,
    /// Frozen variables are fixed to zero.
    pub frozen: bool,
    /// Dense index among the surviving variables.
    pub index: usize,
    codeword: bool,
    active: bool,
    neighbors: BTreeSet<CheckId>,
}

impl VariableNode {
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = CheckId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Whether this variable is a code bit (as opposed to an auxiliary one).
    pub fn is_codeword(&self) -> bool {
        self.codeword
    }

    /// False once the node has been merged away or dropped by compaction.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// A check (parity constraint) node.
#[derive(Debug, Clone)]
pub struct CheckNode {
    pub identifier: String,
    pub column: usize,
    pub row: usize,
    /// Dense index among the surviving checks.
    pub index: usize,
    active: bool,
    neighbors: BTreeSet<VarId>,
}

impl CheckNode {
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = VarId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Arena-backed bipartite factor graph.
#[derive(Debug, Clone, Default)]
pub struct FactorGraph {
    vars: Vec<VariableNode>,
    checks: Vec<CheckNode>,
    var_nodes: Vec<VarId>,
    check_nodes: Vec<CheckId>,
    codeword: Vec<VarId>,
}

impl FactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a variable node and append it to the ordered variable list.
    pub fn add_variable(&mut self, identifier: impl Into<String>, column: usize, row: usize) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VariableNode {
            identifier: identifier.into(),
            column,
            row,
            frozen: false,
            index: self.var_nodes.len(),
            codeword: false,
            active: true,
            neighbors: BTreeSet::new(),
        });
        self.var_nodes.push(id);
        id
    }

    /// Create a check node and append it to the ordered check list.
    pub fn add_check(&mut self, identifier: impl Into<String>, column: usize, row: usize) -> CheckId {
        let id = CheckId(self.checks.len());
        self.checks.push(CheckNode {
            identifier: identifier.into(),
            column,
            row,
            index: self.check_nodes.len(),
            active: true,
            neighbors: BTreeSet::new(),
        });
        self.check_nodes.push(id);
        id
    }

    /// Declare which variables carry the codeword, in codeword order.
    pub fn set_codeword(&mut self, codeword: Vec<VarId>) {
        for v in &self.codeword {
            self.vars[v.0].codeword = false;
        }
        for v in &codeword {
            self.vars[v.0].codeword = true;
        }
        self.codeword = codeword;
    }

    /// Codeword variables in codeword order.
    pub fn codeword(&self) -> &[VarId] {
        &self.codeword
    }

    pub fn var(&self, v: VarId) -> &VariableNode {
        &self.vars[v.0]
    }

    pub fn var_mut(&mut self, v: VarId) -> &mut VariableNode {
        &mut self.vars[v.0]
    }

    pub fn check(&self, c: CheckId) -> &CheckNode {
        &self.checks[c.0]
    }

    /// Variables in index order. Nodes merged away since the last
    /// [`compact`](Self::compact) are still listed, marked inactive.
    pub fn var_nodes(&self) -> &[VarId] {
        &self.var_nodes
    }

    /// Surviving checks in index order.
    pub fn check_nodes(&self) -> &[CheckId] {
        &self.check_nodes
    }

    pub fn num_variables(&self) -> usize {
        self.var_nodes.len()
    }

    pub fn num_checks(&self) -> usize {
        self.check_nodes.len()
    }

    /// Total number of edges.
    pub fn num_edges(&self) -> usize {
        self.check_nodes.iter().map(|&c| self.checks[c.0].degree()).sum()
    }

    pub fn find_variable(&self, identifier: &str) -> Option<VarId> {
        self.var_nodes
            .iter()
            .copied()
            .find(|&v| self.vars[v.0].active && self.vars[v.0].identifier == identifier)
    }

    /// Add the edge `(v, c)`. Connecting twice is a no-op.
    pub fn connect(&mut self, v: VarId, c: CheckId) {
        self.vars[v.0].neighbors.insert(c);
        self.checks[c.0].neighbors.insert(v);
    }

    /// Remove the edge `(v, c)` if present.
    pub fn disconnect(&mut self, v: VarId, c: CheckId) {
        self.vars[v.0].neighbors.remove(&c);
        self.checks[c.0].neighbors.remove(&v);
    }

    /// Remove all edges of variable `v`.
    pub fn isolate_variable(&mut self, v: VarId) {
        let neighbors = std::mem::take(&mut self.vars[v.0].neighbors);
        for c in neighbors {
            self.checks[c.0].neighbors.remove(&v);
        }
    }

    /// Remove all edges of check `c`.
    pub fn isolate_check(&mut self, c: CheckId) {
        let neighbors = std::mem::take(&mut self.checks[c.0].neighbors);
        for v in neighbors {
            self.vars[v.0].neighbors.remove(&c);
        }
    }

    /// Merge variable `remove` into `keep`.
    ///
    /// Edges of `remove` are transferred to `keep`; an edge to a check that
    /// `keep` already touches cancels both. `keep` inherits the frozen flag
    /// and codeword membership, and `remove` becomes inactive. Indices are
    /// left alone; [`compact`](Self::compact) drops the node.
    ///
    /// # Panics
    ///
    /// Panics if `keep == remove`.
    pub fn merge_variables(&mut self, keep: VarId, remove: VarId) {
        assert_ne!(keep, remove, "cannot merge a variable into itself");
        let neighbors = std::mem::take(&mut self.vars[remove.0].neighbors);
        for c in neighbors {
            self.checks[c.0].neighbors.remove(&remove);
            if self.vars[keep.0].neighbors.contains(&c) {
                self.disconnect(keep, c);
            } else {
                self.connect(keep, c);
            }
        }
        let (frozen, codeword) = {
            let removed = &mut self.vars[remove.0];
            removed.active = false;
            (removed.frozen, removed.codeword)
        };
        let kept = &mut self.vars[keep.0];
        kept.frozen |= frozen;
        kept.codeword |= codeword;
        if codeword {
            if let Some(slot) = self.codeword.iter_mut().find(|v| **v == remove) {
                *slot = keep;
            }
        }
    }

    /// Drop merged nodes and every zero-degree node, except variables for
    /// which `keep_var` returns true, and reassign dense 0-based indices
    /// preserving order.
    pub fn compact(&mut self, keep_var: impl Fn(&VariableNode) -> bool) {
        let vars = &mut self.vars;
        self.var_nodes.retain(|&v| {
            let node = &mut vars[v.0];
            let keep = node.active && (node.degree() > 0 || keep_var(&*node));
            node.active = keep;
            keep
        });
        let checks = &mut self.checks;
        self.check_nodes.retain(|&c| {
            let node = &mut checks[c.0];
            let keep = node.active && node.degree() > 0;
            node.active = keep;
            keep
        });
        self.reindex();
    }

    fn reindex(&mut self) {
        for (i, &v) in self.var_nodes.iter().enumerate() {
            self.vars[v.0].index = i;
        }
        for (i, &c) in self.check_nodes.iter().enumerate() {
            self.checks[c.0].index = i;
        }
    }

    /// Parity-check matrix over all surviving nodes: one row per check, one
    /// column per variable, in index order.
    pub fn parity_check_matrix(&self) -> Gf2Matrix {
        let mut h = Gf2Matrix::zeros(self.check_nodes.len(), self.var_nodes.len());
        for (r, &c) in self.check_nodes.iter().enumerate() {
            for v in self.checks[c.0].neighbors() {
                let node = &self.vars[v.0];
                if node.active {
                    h.set(r, node.index, 1);
                }
            }
        }
        h
    }

    /// Surviving variables that are not frozen, in index order.
    pub fn unfrozen_variables(&self) -> Vec<VarId> {
        self.var_nodes
            .iter()
            .copied()
            .filter(|&v| !self.vars[v.0].frozen)
            .collect()
    }
}

impl fmt::Display for FactorGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in &self.check_nodes {
            let check = &self.checks[c.0];
            let names: Vec<&str> = check
                .neighbors()
                .map(|v| self.vars[v.0].identifier.as_str())
                .collect();
            writeln!(f, "{}: {}", check.identifier, names.join(" + "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three variables on one check, plus a second check on v1 and v2.
    fn triangle() -> (FactorGraph, [VarId; 3], [CheckId; 2]) {
        let mut g = FactorGraph::new();
        let v = [
            g.add_variable("v0", 0, 0),
            g.add_variable("v1", 0, 1),
            g.add_variable("v2", 0, 2),
        ];
        let c = [g.add_check("c0", 0, 0), g.add_check("c1", 0, 1)];
        for &var in &v {
            g.connect(var, c[0]);
        }
        g.connect(v[1], c[1]);
        g.connect(v[2], c[1]);
        (g, v, c)
    }

    #[test]
    fn test_connect_degree() {
        let (mut g, v, c) = triangle();
        assert_eq!(g.check(c[0]).degree(), 3);
        assert_eq!(g.var(v[1]).degree(), 2);
        g.connect(v[1], c[1]);
        assert_eq!(g.var(v[1]).degree(), 2);
        assert_eq!(g.num_edges(), 5);
    }

    #[test]
    fn test_merge_cancels_shared_edges() {
        let (mut g, v, c) = triangle();
        g.merge_variables(v[1], v[2]);
        // both checks held v1 and v2, so both edges cancel
        assert_eq!(g.check(c[0]).degree(), 1);
        assert_eq!(g.check(c[1]).degree(), 0);
        assert!(!g.var(v[2]).is_active());
        assert_eq!(g.find_variable("v2"), None);
        assert_eq!(g.num_variables(), 3);
        g.compact(|node| node.identifier == "v1");
        assert_eq!(g.num_variables(), 2);
        assert_eq!(g.num_checks(), 1);
        assert_eq!(g.var(v[1]).index, 1);
    }

    #[test]
    fn test_merge_chain_then_compact() {
        // path v0 - c0 - v1 - c1 - ... - v{n}, merged left to right
        let mut g = FactorGraph::new();
        let n = 64;
        let vars: Vec<VarId> = (0..=n).map(|i| g.add_variable(format!("v{i}"), 0, i)).collect();
        for i in 0..n {
            let c = g.add_check(format!("c{i}"), 0, i);
            g.connect(vars[i], c);
            g.connect(vars[i + 1], c);
        }
        for i in 1..n {
            g.merge_variables(vars[0], vars[i]);
        }
        assert_eq!(g.num_variables(), n + 1);
        g.compact(|_| false);
        // only the last check survives, joining v0 and v{n}
        assert_eq!(g.num_variables(), 2);
        assert_eq!(g.num_checks(), 1);
        assert_eq!(g.var(vars[n]).index, 1);
        assert_eq!(g.parity_check_matrix().to_rows(), vec![vec![1, 1]]);
    }

    #[test]
    fn test_merge_transfers_edges() {
        let (mut g, v, c) = triangle();
        g.merge_variables(v[0], v[2]);
        assert!(g.var(v[0]).neighbors().any(|x| x == c[1]));
        assert_eq!(g.var(v[0]).degree(), 1);
    }

    #[test]
    fn test_merge_propagates_flags() {
        let (mut g, v, _) = triangle();
        g.set_codeword(vec![v[2]]);
        g.var_mut(v[2]).frozen = true;
        g.merge_variables(v[0], v[2]);
        assert!(g.var(v[0]).frozen);
        assert!(g.var(v[0]).is_codeword());
        assert_eq!(g.codeword(), &[v[0]]);
    }

    #[test]
    fn test_isolate_and_compact() {
        let (mut g, v, c) = triangle();
        g.isolate_check(c[1]);
        g.isolate_variable(v[0]);
        assert_eq!(g.var(v[0]).degree(), 0);
        g.compact(|_| false);
        assert_eq!(g.num_variables(), 2);
        assert_eq!(g.num_checks(), 1);
        assert_eq!(g.var(v[1]).index, 0);
        assert_eq!(g.var(v[2]).index, 1);
        assert_eq!(g.check(c[0]).index, 0);
    }

    #[test]
    fn test_compact_retains_predicate() {
        let (mut g, v, _) = triangle();
        g.isolate_variable(v[0]);
        g.compact(|node| node.identifier == "v0");
        assert_eq!(g.num_variables(), 3);
    }

    #[test]
    fn test_parity_check_matrix() {
        let (mut g, v, _) = triangle();
        let h = g.parity_check_matrix();
        assert_eq!(h.to_rows(), vec![vec![1, 1, 1], vec![0, 1, 1]]);
        g.var_mut(v[0]).frozen = true;
        assert_eq!(g.unfrozen_variables(), vec![v[1], v[2]]);
    }

    #[test]
    fn test_display() {
        let (g, _, _) = triangle();
        assert_eq!(g.to_string(), "c0: v0 + v1 + v2\nc1: v1 + v2\n");
    }
}
