//! Dense GF(2) Matrices
//!
//! Small dense binary matrices used for parity-check and generator matrices.
//! Entries are stored row-major as `u8` values in `{0, 1}`; addition is XOR.
//!
//! Polar codes handled by this crate are small enough (blocklength up to a
//! few thousand) that dense Gaussian elimination is adequate for deriving
//! generator matrices and comparing codes.
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::gf2::Gf2Matrix;
//!
//! // (3,1) repetition code
//! let h = Gf2Matrix::from_rows(&[vec![1, 1, 0], vec![0, 1, 1]]);
//! assert_eq!(h.rank(), 2);
//! let g = h.null_space();
//! assert_eq!(g.num_rows(), 1);
//! assert_eq!(g.row(0), &[1, 1, 1]);
//! ```

use std::fmt;

/// Dense binary matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Gf2Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Gf2Matrix {
    /// All-zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Identity matrix of size `n`.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    /// Build from a dense row-major slice. Non-zero entries become 1.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    pub fn from_dense(rows: usize, cols: usize, data: &[u8]) -> Self {
        assert_eq!(data.len(), rows * cols, "data length must equal rows * cols");
        Self {
            rows,
            cols,
            data: data.iter().map(|&b| (b != 0) as u8).collect(),
        }
    }

    /// Build from a list of rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows do not all have the same length.
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols, "all rows must have the same length");
            data.extend(row.iter().map(|&b| (b != 0) as u8));
        }
        Self {
            rows: rows.len(),
            cols,
            data,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, bit: u8) {
        self.data[row * self.cols + col] = (bit != 0) as u8;
    }

    /// Borrow row `r`.
    pub fn row(&self, r: usize) -> &[u8] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Iterate over all rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.rows).map(move |r| self.row(r))
    }

    /// Convert to a list of rows.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Number of 1-entries.
    pub fn weight(&self) -> usize {
        self.data.iter().filter(|&&b| b != 0).count()
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.data[c * self.rows + r] = self.get(r, c);
            }
        }
        t
    }

    /// Sub-matrix made of the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Self {
            rows: rows.len(),
            cols: self.cols,
            data,
        }
    }

    /// Sub-matrix made of the given columns, in the given order.
    pub fn select_columns(&self, cols: &[usize]) -> Self {
        let mut m = Self::zeros(self.rows, cols.len());
        for r in 0..self.rows {
            for (k, &c) in cols.iter().enumerate() {
                m.data[r * cols.len() + k] = self.get(r, c);
            }
        }
        m
    }

    /// Stack `other` below `self`.
    ///
    /// # Panics
    ///
    /// Panics if the column counts differ.
    pub fn vstack(&self, other: &Self) -> Self {
        assert_eq!(self.cols, other.cols, "column count mismatch");
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Self {
            rows: self.rows + other.rows,
            cols: self.cols,
            data,
        }
    }

    /// Matrix-vector product over GF(2): `self · v`.
    ///
    /// With a parity-check matrix this is the syndrome of `v`.
    pub fn mul_vec(&self, v: &[u8]) -> Vec<u8> {
        debug_assert_eq!(v.len(), self.cols);
        self.rows()
            .map(|row| {
                row.iter()
                    .zip(v)
                    .fold(0u8, |acc, (&h, &x)| acc ^ (h & x & 1))
            })
            .collect()
    }

    /// Row-vector times matrix over GF(2): `v · self`.
    pub fn vec_mul(&self, v: &[u8]) -> Vec<u8> {
        debug_assert_eq!(v.len(), self.rows);
        let mut out = vec![0u8; self.cols];
        for (r, &bit) in v.iter().enumerate() {
            if bit & 1 == 1 {
                for (o, &g) in out.iter_mut().zip(self.row(r)) {
                    *o ^= g;
                }
            }
        }
        out
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    fn xor_row_into(&mut self, src: usize, dst: usize) {
        for c in 0..self.cols {
            let bit = self.data[src * self.cols + c];
            self.data[dst * self.cols + c] ^= bit;
        }
    }

    /// Reduced row echelon form and its pivot columns.
    ///
    /// Zero rows are kept at the bottom of the returned matrix.
    pub fn reduced_row_echelon(&self) -> (Self, Vec<usize>) {
        let mut m = self.clone();
        let mut pivots = Vec::new();
        let mut r = 0;
        for c in 0..m.cols {
            if r == m.rows {
                break;
            }
            let Some(p) = (r..m.rows).find(|&i| m.get(i, c) == 1) else {
                continue;
            };
            m.swap_rows(p, r);
            for i in 0..m.rows {
                if i != r && m.get(i, c) == 1 {
                    m.xor_row_into(r, i);
                }
            }
            pivots.push(c);
            r += 1;
        }
        (m, pivots)
    }

    pub fn rank(&self) -> usize {
        self.reduced_row_echelon().1.len()
    }

    /// Basis of the right null space `{v : self · v = 0}`, one vector per row.
    pub fn null_space(&self) -> Self {
        let (rref, pivots) = self.reduced_row_echelon();
        let mut is_pivot = vec![false; self.cols];
        for &p in &pivots {
            is_pivot[p] = true;
        }
        let free: Vec<usize> = (0..self.cols).filter(|&c| !is_pivot[c]).collect();
        let mut basis = Self::zeros(free.len(), self.cols);
        for (k, &f) in free.iter().enumerate() {
            basis.set(k, f, 1);
            for (i, &p) in pivots.iter().enumerate() {
                if rref.get(i, f) == 1 {
                    basis.set(k, p, 1);
                }
            }
        }
        basis
    }

    /// Whether both matrices span the same row space.
    pub fn same_row_space(&self, other: &Self) -> bool {
        if self.cols != other.cols {
            return false;
        }
        let rank = self.rank();
        rank == other.rank() && rank == self.vstack(other).rank()
    }
}

impl fmt::Display for Gf2Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|&b| if b == 1 { '1' } else { '0' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
