//! Linear algebra utilities.
//!
//! Spline calibration reduces to small dense systems: a square system when
//! the constraints exactly determine the coefficients, or a KKT system when
//! a quadratic objective (best-fit residuals plus roughness penalties) is
//! minimized subject to linear constraints. Both are solved through a
//! partially pivoted LU factorization that can be reused for several
//! right-hand sides.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Relative pivot threshold below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-13;

/// LU factorization with partial (row) pivoting.
///
/// Stores `L` (unit lower triangular, below the diagonal) and `U` (upper
/// triangular, on and above the diagonal) in a single matrix together with
/// the row permutation.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: DMatrix<f64>,
    pivots: Vec<usize>,
}

impl LuDecomposition {
    /// Factorizes a square matrix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty or non-square matrices and
    /// `SingularMatrix` when no pivot above the relative threshold exists.
    pub fn new(matrix: &DMatrix<f64>) -> MathResult<Self> {
        let n = matrix.nrows();
        if n != matrix.ncols() {
            return Err(MathError::invalid_input(
                "Matrix must be square for LU decomposition",
            ));
        }
        if n == 0 {
            return Err(MathError::invalid_input("Cannot factorize an empty matrix"));
        }

        let scale = matrix.amax();
        if !scale.is_finite() {
            return Err(MathError::invalid_input("Matrix contains non-finite entries"));
        }
        if scale == 0.0 {
            return Err(MathError::singular(0));
        }
        let threshold = scale * PIVOT_TOLERANCE;

        let mut lu = matrix.clone();
        let mut pivots: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_abs = lu[(k, k)].abs();
            for i in k + 1..n {
                let candidate = lu[(i, k)].abs();
                if candidate > pivot_abs {
                    pivot_abs = candidate;
                    pivot_row = i;
                }
            }

            if pivot_abs <= threshold {
                return Err(MathError::singular(k));
            }

            if pivot_row != k {
                lu.swap_rows(pivot_row, k);
                pivots.swap(pivot_row, k);
            }

            let pivot = lu[(k, k)];
            for i in k + 1..n {
                let factor = lu[(i, k)] / pivot;
                lu[(i, k)] = factor;
                for j in k + 1..n {
                    lu[(i, j)] -= factor * lu[(k, j)];
                }
            }
        }

        Ok(Self { lu, pivots })
    }

    /// Returns the order of the factorized matrix.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.pivots.len()
    }

    /// Solves `A x = b` with the stored factorization.
    pub fn solve(&self, b: &DVector<f64>) -> MathResult<DVector<f64>> {
        let n = self.dimension();
        if b.len() != n {
            return Err(MathError::DimensionMismatch {
                rows1: n,
                cols1: n,
                rows2: b.len(),
                cols2: 1,
            });
        }

        // Forward substitution on the permuted right-hand side
        let mut y = DVector::zeros(n);
        for i in 0..n {
            let mut sum = b[self.pivots[i]];
            for j in 0..i {
                sum -= self.lu[(i, j)] * y[j];
            }
            y[i] = sum;
        }

        // Back substitution
        let mut x = DVector::zeros(n);
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in i + 1..n {
                sum -= self.lu[(i, j)] * x[j];
            }
            x[i] = sum / self.lu[(i, i)];
        }

        Ok(x)
    }

    /// Solves `A x = e_column`, i.e. returns one column of `A^-1`.
    pub fn solve_unit(&self, column: usize) -> MathResult<DVector<f64>> {
        let n = self.dimension();
        if column >= n {
            return Err(MathError::invalid_input(format!(
                "Unit vector index {column} outside system of order {n}"
            )));
        }
        let mut e = DVector::zeros(n);
        e[column] = 1.0;
        self.solve(&e)
    }
}

/// Solves a linear system `A x = b` using pivoted LU decomposition.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    LuDecomposition::new(a)?.solve(b)
}

/// Minimizer of a quadratic objective under linear equality constraints.
///
/// Keeps the KKT factorization so that the sensitivity of the minimizer to
/// each constraint value can be extracted without refactorizing.
#[derive(Debug, Clone)]
pub struct ConstrainedMinimum {
    /// The minimizing vector.
    pub solution: DVector<f64>,
    /// Lagrange multipliers, one per constraint row.
    pub multipliers: DVector<f64>,
    factorization: LuDecomposition,
    unknowns: usize,
    constraints: usize,
}

impl ConstrainedMinimum {
    /// Returns `d solution / d b_row`, the response of the minimizer to a
    /// unit change in the value of one constraint.
    pub fn constraint_sensitivity(&self, row: usize) -> MathResult<DVector<f64>> {
        if row >= self.constraints {
            return Err(MathError::invalid_input(format!(
                "Constraint row {row} outside {} constraints",
                self.constraints
            )));
        }
        let column = self.factorization.solve_unit(self.unknowns + row)?;
        Ok(DVector::from_iterator(
            self.unknowns,
            column.iter().take(self.unknowns).copied(),
        ))
    }
}

/// Minimizes `½ xᵀ H x - gᵀ x` subject to `A x = b`.
///
/// Solves the KKT system
///
/// ```text
/// | H  Aᵀ | | x |   | g |
/// | A  0  | | λ | = | b |
/// ```
///
/// # Errors
///
/// Returns `InvalidInput` when there are more constraints than unknowns,
/// `DimensionMismatch` for inconsistent shapes and `SingularMatrix` when the
/// objective does not pin down the directions left free by the constraints.
pub fn minimize_quadratic_with_constraints(
    h: &DMatrix<f64>,
    g: &DVector<f64>,
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> MathResult<ConstrainedMinimum> {
    let n = h.nrows();
    let m = a.nrows();

    if h.ncols() != n || g.len() != n {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: h.ncols(),
            rows2: g.len(),
            cols2: 1,
        });
    }
    if m > 0 && a.ncols() != n {
        return Err(MathError::DimensionMismatch {
            rows1: m,
            cols1: a.ncols(),
            rows2: n,
            cols2: n,
        });
    }
    if b.len() != m {
        return Err(MathError::DimensionMismatch {
            rows1: m,
            cols1: n,
            rows2: b.len(),
            cols2: 1,
        });
    }
    if m > n {
        return Err(MathError::invalid_input(format!(
            "{m} constraints over-determine {n} unknowns"
        )));
    }

    let order = n + m;
    let mut kkt = DMatrix::zeros(order, order);
    let mut rhs = DVector::zeros(order);

    for i in 0..n {
        for j in 0..n {
            kkt[(i, j)] = h[(i, j)];
        }
        rhs[i] = g[i];
    }
    for r in 0..m {
        for j in 0..n {
            kkt[(n + r, j)] = a[(r, j)];
            kkt[(j, n + r)] = a[(r, j)];
        }
        rhs[n + r] = b[r];
    }

    let factorization = LuDecomposition::new(&kkt)?;
    let full = factorization.solve(&rhs)?;

    Ok(ConstrainedMinimum {
        solution: DVector::from_iterator(n, full.iter().take(n).copied()),
        multipliers: DVector::from_iterator(m, full.iter().skip(n).copied()),
        factorization,
        unknowns: n,
        constraints: m,
    })
}
