//! Sparse matrices and linear solvers.
//!
//! This module provides a lightweight sparse matrix implementation (CSR
//! format) with the handful of operations the discrete operators need, a
//! conjugate gradient solver, and a direct envelope (skyline) Cholesky
//! factorization for symmetric positive definite systems.

use nalgebra::{DMatrix, DVector};

use crate::error::{MeshError, Result};

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in CSR format for efficient matrix-vector multiplication.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each stored value, sorted within a row.
    col_idx: Vec<usize>,
    /// Stored values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        debug_assert!(triplets.iter().all(|&(r, c, _)| r < rows && c < cols));

        // Sort by (row, col) for CSR construction
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }

        // Prefix sum of per-row counts.
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// A square diagonal matrix.
    pub fn diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        Self {
            rows: n,
            cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: diag.to_vec(),
        }
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self::diagonal(&vec![1.0; n])
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `i` as `(column, value)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// All stored entries as `(row, column, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    /// Entry at `(i, j)`, zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        match self.col_idx[range.clone()].binary_search(&j) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// The diagonal as a dense vector.
    pub fn diagonal_values(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.rows.min(self.cols),
            (0..self.rows.min(self.cols)).map(|i| self.get(i, i)),
        )
    }

    /// Sum of each row.
    pub fn row_sums(&self) -> DVector<f64> {
        DVector::from_iterator(self.rows, (0..self.rows).map(|i| self.row(i).map(|(_, v)| v).sum()))
    }

    /// The transposed matrix.
    pub fn transpose(&self) -> CsrMatrix {
        let triplets = self.triplets().map(|(i, j, v)| (j, i, v)).collect();
        CsrMatrix::from_triplets(self.cols, self.rows, triplets)
    }

    /// Multiply every stored value by `alpha`.
    pub fn scale(&self, alpha: f64) -> CsrMatrix {
        let mut out = self.clone();
        for v in &mut out.values {
            *v *= alpha;
        }
        out
    }

    /// `self + alpha * other`.
    pub fn add_scaled(&self, alpha: f64, other: &CsrMatrix) -> CsrMatrix {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "Matrix dimension mismatch"
        );
        let triplets = self
            .triplets()
            .chain(other.triplets().map(|(i, j, v)| (i, j, alpha * v)))
            .collect();
        CsrMatrix::from_triplets(self.rows, self.cols, triplets)
    }

    /// Sparse matrix product `self * other`.
    pub fn mul(&self, other: &CsrMatrix) -> CsrMatrix {
        assert_eq!(self.cols, other.rows, "Matrix dimension mismatch");

        // Dense accumulator over one output row at a time.
        let mut acc = vec![0.0; other.cols];
        let mut marker = vec![usize::MAX; other.cols];
        let mut touched: Vec<usize> = Vec::new();
        let mut triplets = Vec::new();

        for i in 0..self.rows {
            for (k, a) in self.row(i) {
                for (j, b) in other.row(k) {
                    if marker[j] != i {
                        marker[j] = i;
                        acc[j] = 0.0;
                        touched.push(j);
                    }
                    acc[j] += a * b;
                }
            }
            for &j in &touched {
                triplets.push((i, j, acc[j]));
            }
            touched.clear();
        }

        CsrMatrix::from_triplets(self.rows, other.cols, triplets)
    }

    /// The symmetric permutation `P A Pᵀ`, with `perm[new] = old`.
    pub fn permute_symmetric(&self, perm: &[usize]) -> CsrMatrix {
        assert_eq!(self.rows, self.cols, "Matrix must be square");
        assert_eq!(perm.len(), self.rows, "Permutation length mismatch");

        let mut inverse = vec![0usize; perm.len()];
        for (new, &old) in perm.iter().enumerate() {
            inverse[old] = new;
        }
        let triplets = self
            .triplets()
            .map(|(i, j, v)| (inverse[i], inverse[j], v))
            .collect();
        CsrMatrix::from_triplets(self.rows, self.cols, triplets)
    }

    /// Whether the matrix equals its transpose up to `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.rows == self.cols
            && self
                .triplets()
                .all(|(i, j, v)| (v - self.get(j, i)).abs() <= tolerance)
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            y[i] = self.row(i).map(|(j, v)| v * x[j]).sum();
        }
        y
    }

    /// Multiply matrix by a dense matrix: Y = A * X.
    pub fn mul_dense(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        assert_eq!(x.nrows(), self.cols, "Matrix dimension mismatch");

        let mut y = DMatrix::zeros(self.rows, x.ncols());
        for i in 0..self.rows {
            for (j, v) in self.row(i) {
                for c in 0..x.ncols() {
                    y[(i, c)] += v * x[(j, c)];
                }
            }
        }
        y
    }
}

/// Solve A*x = b using the Conjugate Gradient method.
///
/// Requires A to be symmetric positive definite.
///
/// # Arguments
///
/// * `a` - The system matrix (must be symmetric positive definite)
/// * `b` - The right-hand side vector
/// * `x0` - Optional initial guess (zeros if None)
/// * `max_iter` - Maximum number of iterations
/// * `tolerance` - Convergence tolerance (relative residual norm)
///
/// # Returns
///
/// The solution vector x, or an error if convergence fails.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "Matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "Matrix must be square");

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(DVector::zeros(n));
    }

    // r = b - A*x
    let mut r = b - a.mul_vec(&x);
    let mut r_norm_sq = r.dot(&r);
    if r_norm_sq.sqrt() / b_norm < tolerance {
        return Ok(x);
    }

    let mut p = r.clone();

    for _iter in 0..max_iter {
        let ap = a.mul_vec(&p);

        let p_ap = p.dot(&ap);
        if p_ap.abs() < 1e-15 {
            // Singular or nearly so.
            break;
        }
        let alpha = r_norm_sq / p_ap;

        x += alpha * &p;
        r -= alpha * &ap;

        let new_r_norm_sq = r.dot(&r);
        if new_r_norm_sq.sqrt() / b_norm < tolerance {
            return Ok(x);
        }

        let beta = new_r_norm_sq / r_norm_sq;
        p = &r + beta * &p;
        r_norm_sq = new_r_norm_sq;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: max_iter,
    })
}

/// Reverse Cuthill-McKee ordering of the pattern of a symmetric matrix.
///
/// Returns `perm` with `perm[new] = old`. Every connected component is
/// numbered breadth-first from a pseudo-peripheral vertex, visiting
/// neighbours by increasing degree, and the whole order is then reversed.
/// Rows of the reordered matrix only reach back about one BFS level, which
/// keeps the envelope of its Cholesky factor small.
pub fn reverse_cuthill_mckee(a: &CsrMatrix) -> Vec<usize> {
    assert_eq!(a.nrows(), a.ncols(), "Matrix must be square");
    let n = a.nrows();
    let degree: Vec<usize> = (0..n)
        .map(|i| a.row(i).filter(|&(j, _)| j != i).count())
        .collect();

    let mut seeds: Vec<usize> = (0..n).collect();
    seeds.sort_by_key(|&i| degree[i]);

    let mut seen = vec![usize::MAX; n];
    let mut tag = 0;
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    for seed in seeds {
        if visited[seed] {
            continue;
        }
        let start = if degree[seed] == 0 {
            seed
        } else {
            pseudo_peripheral(a, seed, &degree, &mut seen, &mut tag)
        };

        visited[start] = true;
        let mut head = order.len();
        order.push(start);
        while head < order.len() {
            let v = order[head];
            head += 1;
            let mut next: Vec<usize> = a
                .row(v)
                .map(|(j, _)| j)
                .filter(|&j| !visited[j])
                .collect();
            next.sort_by_key(|&j| degree[j]);
            for j in next {
                visited[j] = true;
                order.push(j);
            }
        }
    }

    order.reverse();
    order
}

/// Vertex of maximal eccentricity found by repeated BFS (George-Liu).
fn pseudo_peripheral(
    a: &CsrMatrix,
    seed: usize,
    degree: &[usize],
    seen: &mut [usize],
    tag: &mut usize,
) -> usize {
    let mut root = seed;
    let (mut depth, mut level) = last_level(a, root, seen, *tag);
    *tag += 1;

    loop {
        let candidate = match level.iter().copied().min_by_key(|&v| degree[v]) {
            Some(v) => v,
            None => return root,
        };
        let (d, l) = last_level(a, candidate, seen, *tag);
        *tag += 1;
        if d <= depth {
            return root;
        }
        root = candidate;
        depth = d;
        level = l;
    }
}

/// Depth and deepest level of a BFS from `root`. Vertices stamped with
/// `tag` in `seen` count as visited.
fn last_level(a: &CsrMatrix, root: usize, seen: &mut [usize], tag: usize) -> (usize, Vec<usize>) {
    seen[root] = tag;
    let mut level = vec![root];
    let mut depth = 0;
    loop {
        let mut next = Vec::new();
        for &v in &level {
            for (j, _) in a.row(v) {
                if seen[j] != tag {
                    seen[j] = tag;
                    next.push(j);
                }
            }
        }
        if next.is_empty() {
            return (depth, level);
        }
        level = next;
        depth += 1;
    }
}

/// Cholesky factor `L` of a symmetric positive definite matrix, stored by
/// rows over each row's envelope.
///
/// The matrix is first reordered as `P A Pᵀ`, by default with
/// [`reverse_cuthill_mckee`]. Row `i` of `L` is stored from its first
/// nonzero column `first[i]` up to the diagonal. Fill-in stays inside the
/// envelope, so the storage is exact.
#[derive(Debug, Clone)]
pub struct EnvelopeCholesky {
    n: usize,
    perm: Vec<usize>,
    first: Vec<usize>,
    row_start: Vec<usize>,
    values: Vec<f64>,
}

impl EnvelopeCholesky {
    /// Factor `a` in reverse Cuthill-McKee order. Only the lower triangle
    /// of the reordered matrix is read, so `a` must be symmetric.
    ///
    /// # Errors
    ///
    /// [`MeshError::NumericalFailure`] if the matrix is not square or a
    /// pivot is not positive (the matrix is not positive definite).
    pub fn factor(a: &CsrMatrix) -> Result<Self> {
        if a.nrows() != a.ncols() {
            return Err(Self::not_square(a));
        }
        Self::factor_with_ordering(a, reverse_cuthill_mckee(a))
    }

    /// Factor `a` in its own row order.
    pub fn factor_natural(a: &CsrMatrix) -> Result<Self> {
        Self::factor_with_ordering(a, (0..a.nrows()).collect())
    }

    /// Factor `P A Pᵀ` for a given ordering `perm[new] = old`.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidArgument`] if `perm` is not a permutation of the
    /// rows, otherwise as [`Self::factor`].
    pub fn factor_with_ordering(a: &CsrMatrix, perm: Vec<usize>) -> Result<Self> {
        if a.nrows() != a.ncols() {
            return Err(Self::not_square(a));
        }
        let n = a.nrows();
        if perm.len() != n {
            return Err(MeshError::InvalidArgument(format!(
                "ordering has {} entries for {} rows",
                perm.len(),
                n
            )));
        }
        let mut hit = vec![false; n];
        for &old in &perm {
            if old >= n || hit[old] {
                return Err(MeshError::InvalidArgument(format!(
                    "ordering is not a permutation of 0..{}",
                    n
                )));
            }
            hit[old] = true;
        }

        let a = a.permute_symmetric(&perm);
        let first: Vec<usize> = (0..n)
            .map(|i| a.row(i).map(|(j, _)| j).filter(|&j| j <= i).min().unwrap_or(i))
            .collect();
        let mut row_start = Vec::with_capacity(n + 1);
        let mut total = 0;
        for i in 0..n {
            row_start.push(total);
            total += i - first[i] + 1;
        }
        row_start.push(total);

        let mut chol = Self {
            n,
            perm,
            first,
            row_start,
            values: vec![0.0; total],
        };
        for i in 0..n {
            for (j, v) in a.row(i) {
                if j <= i {
                    let k = chol.slot(i, j);
                    chol.values[k] = v;
                }
            }
        }

        for i in 0..n {
            let fi = chol.first[i];
            for j in fi..=i {
                let fj = chol.first[j];
                let start = fi.max(fj);
                let mut sum = chol.values[chol.slot(i, j)];
                for k in start..j {
                    sum -= chol.values[chol.slot(i, k)] * chol.values[chol.slot(j, k)];
                }

                let value = if j == i {
                    if !sum.is_finite() || sum <= 0.0 {
                        return Err(MeshError::NumericalFailure(format!(
                            "non-positive pivot {} at row {}",
                            sum, chol.perm[i]
                        )));
                    }
                    sum.sqrt()
                } else {
                    sum / chol.values[chol.slot(j, j)]
                };
                let k = chol.slot(i, j);
                chol.values[k] = value;
            }
        }

        Ok(chol)
    }

    fn not_square(a: &CsrMatrix) -> MeshError {
        MeshError::NumericalFailure(format!(
            "cannot factor a {}x{} matrix",
            a.nrows(),
            a.ncols()
        ))
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> usize {
        debug_assert!(j >= self.first[i] && j <= i);
        self.row_start[i] + (j - self.first[i])
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored entries of `L`.
    pub fn envelope_size(&self) -> usize {
        self.values.len()
    }

    /// The row ordering used, as `perm[new] = old`.
    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    /// Solve `A x = b`.
    ///
    /// # Errors
    ///
    /// [`MeshError::NumericalFailure`] if the solution is not finite.
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>> {
        assert_eq!(b.len(), self.n, "Vector dimension mismatch");

        // L y = P b
        let mut y = DVector::from_iterator(self.n, self.perm.iter().map(|&old| b[old]));
        for i in 0..self.n {
            let mut sum = y[i];
            for k in self.first[i]..i {
                sum -= self.values[self.slot(i, k)] * y[k];
            }
            y[i] = sum / self.values[self.slot(i, i)];
        }

        // L^T x = y, column-oriented over the rows of L.
        for i in (0..self.n).rev() {
            y[i] /= self.values[self.slot(i, i)];
            let xi = y[i];
            for k in self.first[i]..i {
                y[k] -= self.values[self.slot(i, k)] * xi;
            }
        }

        if y.iter().all(|v| v.is_finite()) {
            let mut x = DVector::zeros(self.n);
            for (new, &old) in self.perm.iter().enumerate() {
                x[old] = y[new];
            }
            Ok(x)
        } else {
            Err(MeshError::NumericalFailure(
                "solution has non-finite entries".to_string(),
            ))
        }
    }

    /// Solve `A X = B` column by column.
    pub fn solve_matrix(&self, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut x = DMatrix::zeros(b.nrows(), b.ncols());
        for c in 0..b.ncols() {
            let col = self.solve(&b.column(c).into_owned())?;
            x.set_column(c, &col);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd_2x2() -> CsrMatrix {
        // [ 4  1 ]
        // [ 1  3 ]
        CsrMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)])
    }

    /// Tridiagonal [-1 4 -1] system with a far coupling between 0 and n-1.
    fn spd_banded(n: usize) -> CsrMatrix {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                triplets.push((i + 1, i, -1.0));
            }
        }
        triplets.push((0, n - 1, 0.5));
        triplets.push((n - 1, 0, 0.5));
        CsrMatrix::from_triplets(n, n, triplets)
    }

    #[test]
    fn test_csr_from_triplets() {
        let a = spd_2x2();
        assert_eq!(a.nrows(), 2);
        assert_eq!(a.ncols(), 2);
        assert_eq!(a.nnz(), 4);
        assert_eq!(a.get(0, 1), 1.0);
    }

    #[test]
    fn test_csr_from_triplets_with_duplicates() {
        let triplets = vec![
            (0, 0, 2.0),
            (0, 0, 2.0), // Duplicate: should sum to 4.0
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
        ];
        let a = CsrMatrix::from_triplets(2, 2, triplets);
        assert_eq!(a, spd_2x2());
    }

    #[test]
    fn test_empty_rows() {
        let a = CsrMatrix::from_triplets(4, 4, vec![(2, 1, 5.0)]);
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.row(0).count(), 0);
        assert_eq!(a.row(3).count(), 0);
        assert_eq!(a.get(2, 1), 5.0);
        assert_eq!(a.get(1, 2), 0.0);
    }

    #[test]
    fn test_csr_mul_vec() {
        // [ 4  1 ]   [ 1 ]   [ 5 ]
        // [ 1  3 ] * [ 1 ] = [ 4 ]
        let a = spd_2x2();
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert!((y[0] - 5.0).abs() < 1e-10);
        assert!((y[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_transpose_and_product() {
        // 3x2
        let d = CsrMatrix::from_triplets(3, 2, vec![(0, 0, -1.0), (0, 1, 1.0), (1, 1, 2.0), (2, 0, 3.0)]);
        let dt = d.transpose();
        assert_eq!(dt.nrows(), 2);
        assert_eq!(dt.get(1, 0), 1.0);
        assert_eq!(dt.get(0, 2), 3.0);

        let g = dt.mul(&d);
        // [-1 0 3; 1 2 0] * [-1 1; 0 2; 3 0] = [10 -1; -1 5]
        assert!((g.get(0, 0) - 10.0).abs() < 1e-12);
        assert!((g.get(0, 1) + 1.0).abs() < 1e-12);
        assert!((g.get(1, 1) - 5.0).abs() < 1e-12);
        assert!(g.is_symmetric(1e-12));
        assert!(!d.is_symmetric(1e-12));
    }

    #[test]
    fn test_add_scaled_and_diagonal() {
        let a = spd_2x2();
        let sum = CsrMatrix::identity(2).add_scaled(2.0, &a);
        assert_eq!(sum.get(0, 0), 9.0);
        assert_eq!(sum.get(1, 0), 2.0);
        assert_eq!(sum.diagonal_values(), DVector::from_vec(vec![9.0, 7.0]));
        assert_eq!(a.row_sums(), DVector::from_vec(vec![5.0, 4.0]));
        assert_eq!(a.scale(0.5).get(0, 0), 2.0);
    }

    #[test]
    fn test_mul_dense() {
        let a = spd_2x2();
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let y = a.mul_dense(&x);
        assert_eq!(y, DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]));
    }

    #[test]
    fn test_cg_simple() {
        // Solution: x = 1/11, y = 7/11
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);

        let x = conjugate_gradient(&a, &b, None, 100, 1e-10).unwrap();

        let residual = a.mul_vec(&x) - b;
        assert!(residual.norm() < 1e-8);
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-8);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-8);
    }

    #[test]
    fn test_cg_with_initial_guess() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);

        let x0 = DVector::from_vec(vec![0.1, 0.6]);
        let x = conjugate_gradient(&a, &b, Some(&x0), 100, 1e-10).unwrap();

        let residual = a.mul_vec(&x) - b;
        assert!(residual.norm() < 1e-8);
    }

    #[test]
    fn test_cholesky_matches_cg() {
        let a = spd_banded(12);
        let b = DVector::from_fn(12, |i, _| (i as f64).sin() + 1.0);

        let direct = EnvelopeCholesky::factor(&a).unwrap().solve(&b).unwrap();
        let iterative = conjugate_gradient(&a, &b, None, 200, 1e-12).unwrap();

        assert!((a.mul_vec(&direct) - &b).norm() < 1e-10);
        assert!((direct - iterative).norm() < 1e-8);
    }

    /// Tridiagonal system on a path whose vertices are labelled `i * 7 % n`.
    fn spd_scrambled_path(n: usize) -> CsrMatrix {
        let label = |i: usize| i * 7 % n;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((label(i), label(i), 4.0));
            if i + 1 < n {
                triplets.push((label(i), label(i + 1), -1.0));
                triplets.push((label(i + 1), label(i), -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, triplets)
    }

    #[test]
    fn test_rcm_is_permutation() {
        let perm = reverse_cuthill_mckee(&spd_banded(15));
        let mut sorted = perm.clone();
        sorted.sort();
        assert_eq!(sorted, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_rcm_recovers_path_order() {
        let a = spd_scrambled_path(20);
        let natural = EnvelopeCholesky::factor_natural(&a).unwrap();
        let reordered = EnvelopeCholesky::factor(&a).unwrap();

        // A path in BFS order is tridiagonal: one diagonal entry in the
        // first row, two in every other.
        assert_eq!(reordered.envelope_size(), 1 + 2 * 19);
        assert!(natural.envelope_size() > reordered.envelope_size());

        let b = DVector::from_fn(20, |i, _| i as f64 - 3.0);
        let x = reordered.solve(&b).unwrap();
        assert!((a.mul_vec(&x) - &b).norm() < 1e-10);
        assert!((x - natural.solve(&b).unwrap()).norm() < 1e-10);
    }

    #[test]
    fn test_rcm_handles_isolated_rows() {
        let a = CsrMatrix::from_triplets(
            4,
            4,
            vec![(0, 0, 2.0), (1, 1, 3.0), (1, 3, -1.0), (3, 1, -1.0), (3, 3, 3.0), (2, 2, 1.0)],
        );
        let chol = EnvelopeCholesky::factor(&a).unwrap();
        let b = DVector::from_vec(vec![2.0, 2.0, 5.0, 2.0]);
        let x = chol.solve(&b).unwrap();
        assert!((x - DVector::from_vec(vec![1.0, 1.0, 5.0, 1.0])).norm() < 1e-12);
    }

    #[test]
    fn test_factor_with_ordering_rejects_bad_permutation() {
        let a = spd_2x2();
        for perm in [vec![0], vec![0, 0], vec![0, 2]] {
            let err = EnvelopeCholesky::factor_with_ordering(&a, perm).unwrap_err();
            assert!(matches!(err, MeshError::InvalidArgument(_)));
        }
        let chol = EnvelopeCholesky::factor_with_ordering(&a, vec![1, 0]).unwrap();
        assert_eq!(chol.permutation(), &[1, 0]);
    }

    #[test]
    fn test_permute_symmetric() {
        let a = spd_2x2().add_scaled(1.0, &CsrMatrix::diagonal(&[0.0, 2.0]));
        let p = a.permute_symmetric(&[1, 0]);
        assert_eq!(p.get(0, 0), 5.0);
        assert_eq!(p.get(1, 1), 4.0);
        assert_eq!(p.get(0, 1), 1.0);
    }

    #[test]
    fn test_cholesky_envelope_size() {
        // Tridiagonal plus one far entry in the last row.
        let chol = EnvelopeCholesky::factor_natural(&spd_banded(10)).unwrap();
        assert_eq!(chol.dim(), 10);
        // Rows 0..8 store 1 or 2 entries, the last row stores all 10.
        assert_eq!(chol.envelope_size(), 1 + 2 * 8 + 10);
    }

    #[test]
    fn test_cholesky_solve_matrix() {
        let a = spd_2x2();
        let chol = EnvelopeCholesky::factor(&a).unwrap();
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 5.0, 2.0, 4.0]);
        let x = chol.solve_matrix(&b).unwrap();
        assert!((a.mul_dense(&x) - b).norm() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 2.0), (1, 1, 1.0)]);
        let err = EnvelopeCholesky::factor(&a).unwrap_err();
        assert!(matches!(err, MeshError::NumericalFailure(_)));

        let singular = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0)]);
        assert!(EnvelopeCholesky::factor(&singular).is_err());
    }
}
