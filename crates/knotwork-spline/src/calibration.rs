//! Shared linear solve behind segment and stretch calibration.
//!
//! Without an objective the constraint rows must pin down every
//! coefficient and the square system is solved directly. With an objective
//! (best-fit residuals and/or roughness penalties) the rows become equality
//! constraints of a quadratic minimization.

use crate::error::{SplineError, SplineResult};
use knotwork_math::linear_algebra::{minimize_quadratic_with_constraints, LuDecomposition};
use nalgebra::{DMatrix, DVector};

/// Quadratic objective `½ cᵀ H c - gᵀ c`.
pub(crate) struct Objective {
    pub hessian: DMatrix<f64>,
    pub gradient: DVector<f64>,
}

impl Objective {
    pub fn zeros(unknowns: usize) -> Self {
        Self {
            hessian: DMatrix::zeros(unknowns, unknowns),
            gradient: DVector::zeros(unknowns),
        }
    }

    /// Adds `weight · (rowᵀ c - target)²`.
    pub fn add_residual(&mut self, offset: usize, row: &DVector<f64>, target: f64, weight: f64) {
        let n = row.len();
        for i in 0..n {
            self.gradient[offset + i] += weight * target * row[i];
            for j in 0..n {
                self.hessian[(offset + i, offset + j)] += weight * row[i] * row[j];
            }
        }
    }

    /// Adds `amplitude · cᵀ P c` on one block.
    pub fn add_penalty(&mut self, offset: usize, penalty: &DMatrix<f64>, amplitude: f64) {
        let n = penalty.nrows();
        for i in 0..n {
            for j in 0..n {
                self.hessian[(offset + i, offset + j)] += amplitude * penalty[(i, j)];
            }
        }
    }
}

/// Coefficients together with `d coefficient / d constraint value`.
pub(crate) struct LinearCalibration {
    pub coefficients: DVector<f64>,
    /// One column per constraint row.
    pub sensitivity: DMatrix<f64>,
}

pub(crate) fn solve(
    rows: &DMatrix<f64>,
    values: &DVector<f64>,
    objective: Option<&Objective>,
) -> SplineResult<LinearCalibration> {
    let constraints = rows.nrows();
    let unknowns = rows.ncols();

    match objective {
        None => {
            if constraints != unknowns {
                return Err(SplineError::UnderOrOverDeterminedSystem {
                    constraints,
                    dimension: unknowns,
                });
            }
            let lu = LuDecomposition::new(rows)?;
            let coefficients = lu.solve(values)?;
            let mut sensitivity = DMatrix::zeros(unknowns, constraints);
            for r in 0..constraints {
                sensitivity.set_column(r, &lu.solve_unit(r)?);
            }
            Ok(LinearCalibration {
                coefficients,
                sensitivity,
            })
        }
        Some(objective) => {
            if constraints > unknowns {
                return Err(SplineError::UnderOrOverDeterminedSystem {
                    constraints,
                    dimension: unknowns,
                });
            }
            let minimum = minimize_quadratic_with_constraints(
                &objective.hessian,
                &objective.gradient,
                rows,
                values,
            )?;
            let mut sensitivity = DMatrix::zeros(unknowns, constraints);
            for r in 0..constraints {
                sensitivity.set_column(r, &minimum.constraint_sensitivity(r)?);
            }
            Ok(LinearCalibration {
                coefficients: minimum.solution,
                sensitivity,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_system_requires_exact_count() {
        let rows = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let values = DVector::from_vec(vec![1.0]);

        let err = solve(&rows, &values, None).err().unwrap();
        assert!(matches!(
            err,
            SplineError::UnderOrOverDeterminedSystem {
                constraints: 1,
                dimension: 2
            }
        ));
    }

    #[test]
    fn test_sensitivity_reproduces_linear_response() {
        let rows = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let values = DVector::from_vec(vec![2.0, 5.0]);

        let solved = solve(&rows, &values, None).unwrap();
        let bumped = solve(&rows, &DVector::from_vec(vec![2.0, 5.5]), None).unwrap();

        let predicted = &solved.coefficients + solved.sensitivity.column(1) * 0.5;
        assert_relative_eq!(predicted[0], bumped.coefficients[0], epsilon = 1e-12);
        assert_relative_eq!(predicted[1], bumped.coefficients[1], epsilon = 1e-12);
    }
}
