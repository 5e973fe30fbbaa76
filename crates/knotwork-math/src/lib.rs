//! # Knotwork Math
//!
//! Numerical kernels for the Knotwork curve calibration library.
//!
//! This crate provides:
//!
//! - **Linear Algebra**: Pivoted LU factorization and equality-constrained
//!   quadratic minimization (KKT systems)
//! - **Quadrature**: Composite Boole's rule for roughness penalty integrals
//! - **Solvers**: Root-finding algorithms (Newton-Raphson, Brent, hybrid)
//!
//! ## Design Philosophy
//!
//! - **Explicit failures**: every routine returns [`MathResult`], singular
//!   systems and non-convergence are errors, never silent NaNs
//! - **Reusable factorizations**: a factorized system can be re-solved for
//!   many right-hand sides, which is how calibration Jacobians are built

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

pub mod error;
pub mod linear_algebra;
pub mod quadrature;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{
        minimize_quadratic_with_constraints, solve_linear_system, ConstrainedMinimum,
        LuDecomposition,
    };
    pub use crate::quadrature::{boole_integrate, boole_nodes};
    pub use crate::solvers::{
        brent, hybrid, hybrid_numerical, newton_raphson, SolverConfig, SolverResult,
    };
}

pub use error::{MathError, MathResult};
