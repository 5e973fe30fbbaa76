//! Composite Boole's rule quadrature.
//!
//! Each panel spans four sub-intervals of width `h` and integrates with the
//! weights `2h/45 · (7, 32, 12, 32, 7)`, exact for polynomials up to degree
//! five. Penalty integrals over spline segments are evaluated on the nodes
//! returned by [`boole_nodes`] so that a matrix-valued integrand can be
//! accumulated with one basis evaluation per node.

use crate::error::{MathError, MathResult};

const BOOLE_WEIGHTS: [f64; 5] = [7.0, 32.0, 12.0, 32.0, 7.0];

/// Returns the `(abscissa, weight)` pairs of composite Boole's rule on
/// `[a, b]` with the given number of panels.
///
/// Nodes shared by adjacent panels appear once with the summed weight.
pub fn boole_nodes(a: f64, b: f64, panels: usize) -> MathResult<Vec<(f64, f64)>> {
    if panels == 0 {
        return Err(MathError::invalid_input("Boole's rule needs at least one panel"));
    }
    if !a.is_finite() || !b.is_finite() || b <= a {
        return Err(MathError::invalid_input(format!(
            "Invalid integration interval [{a}, {b}]"
        )));
    }

    let intervals = 4 * panels;
    let h = (b - a) / intervals as f64;
    let scale = 2.0 * h / 45.0;

    let mut nodes: Vec<(f64, f64)> = (0..=intervals)
        .map(|i| (a + h * i as f64, 0.0))
        .collect();
    // Pin the right end exactly
    nodes[intervals].0 = b;

    for panel in 0..panels {
        for (offset, weight) in BOOLE_WEIGHTS.iter().enumerate() {
            nodes[4 * panel + offset].1 += scale * weight;
        }
    }

    Ok(nodes)
}

/// Integrates `f` over `[a, b]` with composite Boole's rule.
pub fn boole_integrate<F>(f: F, a: f64, b: f64, panels: usize) -> MathResult<f64>
where
    F: Fn(f64) -> f64,
{
    Ok(boole_nodes(a, b, panels)?
        .into_iter()
        .map(|(x, w)| w * f(x))
        .sum())
}
