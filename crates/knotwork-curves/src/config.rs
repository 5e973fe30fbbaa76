//! Calibrator configuration.
//!
//! Every field has a serde default so partial JSON documents load.

use crate::error::{CurveError, CurveResult};
use knotwork_math::solvers::SolverConfig;
use knotwork_spline::basis::BasisSetParams;
use knotwork_spline::segment::{
    FlexurePenaltyControl, SegmentCustomBuilderControl, SegmentInelasticDesignControl,
};
use knotwork_spline::stretch::BoundarySettings;
use serde::{Deserialize, Serialize};

// =============================================================================
// CALIBRATOR CONFIGURATION
// =============================================================================

/// Settings of the [`LinearCurveCalibrator`](crate::calibrator::LinearCurveCalibrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratorConfig {
    /// Residual tolerance of the per-instrument root search.
    #[serde(default = "default_solver_tolerance")]
    pub solver_tolerance: f64,

    /// Iteration cap of the per-instrument root search.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Largest acceptable `|model - quote|` in the repricing report.
    #[serde(default = "default_repricing_tolerance")]
    pub repricing_tolerance: f64,

    /// Control of every bootstrapped segment.
    #[serde(default = "default_segment_control")]
    pub segment_control: SegmentCustomBuilderControl,

    /// Quote bump of the finite-difference quote Jacobian.
    #[serde(default = "default_jacobian_bump")]
    pub jacobian_bump: f64,
}

fn default_solver_tolerance() -> f64 {
    1e-12
}

fn default_max_iterations() -> u32 {
    100
}

fn default_repricing_tolerance() -> f64 {
    1e-8
}

/// Cubic, `C^1`, with a unit curvature penalty choosing the smoothest
/// coefficients left free by the constraints.
fn default_segment_control() -> SegmentCustomBuilderControl {
    SegmentCustomBuilderControl {
        basis: BasisSetParams::cubic(),
        inelastic: SegmentInelasticDesignControl {
            curvature: FlexurePenaltyControl {
                derivative_order: 2,
                amplitude: 1.0,
            },
            ..SegmentInelasticDesignControl::unpenalized(1)
        },
        shape: None,
    }
}

fn default_jacobian_bump() -> f64 {
    1e-6
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            solver_tolerance: default_solver_tolerance(),
            max_iterations: default_max_iterations(),
            repricing_tolerance: default_repricing_tolerance(),
            segment_control: default_segment_control(),
            jacobian_bump: default_jacobian_bump(),
        }
    }
}

impl CalibratorConfig {
    /// Sets the solver tolerance.
    #[must_use]
    pub fn with_solver_tolerance(mut self, tolerance: f64) -> Self {
        self.solver_tolerance = tolerance;
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the repricing tolerance.
    #[must_use]
    pub fn with_repricing_tolerance(mut self, tolerance: f64) -> Self {
        self.repricing_tolerance = tolerance;
        self
    }

    /// Sets the segment control.
    #[must_use]
    pub fn with_segment_control(mut self, control: SegmentCustomBuilderControl) -> Self {
        self.segment_control = control;
        self
    }

    /// Sets the quote Jacobian bump.
    #[must_use]
    pub fn with_jacobian_bump(mut self, bump: f64) -> Self {
        self.jacobian_bump = bump;
        self
    }

    /// Solver settings for the per-instrument root search.
    #[must_use]
    pub fn solver(&self) -> SolverConfig {
        SolverConfig::new(self.solver_tolerance, self.max_iterations)
    }

    /// Checks tolerances, iteration cap and segment control.
    pub fn validate(&self) -> CurveResult<()> {
        for (field, value) in [
            ("solver_tolerance", self.solver_tolerance),
            ("repricing_tolerance", self.repricing_tolerance),
            ("jacobian_bump", self.jacobian_bump),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CurveError::config(format!(
                    "{field} must be positive and finite, got {value}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(CurveError::config("max_iterations must be at least 1"));
        }
        self.segment_control
            .validate()
            .map_err(|e| CurveError::config(format!("segment_control: {e}")))?;
        Ok(())
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> CurveResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CurveError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> CurveResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CurveError::config(e.to_string()))
    }
}

// =============================================================================
// SMOOTHING SETTINGS
// =============================================================================

/// Settings of the opt-in best-fit smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSettings {
    /// Samples of the exact curve per segment, edges included.
    #[serde(default = "default_samples_per_segment")]
    pub samples_per_segment: usize,

    /// Continuity order of the smoothed stretches.
    #[serde(default = "default_smoothing_ck")]
    pub ck: usize,

    /// Curvature penalty amplitude.
    #[serde(default = "default_smoothing_curvature")]
    pub curvature_amplitude: f64,

    /// Length penalty amplitude.
    #[serde(default)]
    pub length_amplitude: f64,

    /// Boundary condition of each smoothed stretch.
    #[serde(default = "default_smoothing_boundary")]
    pub boundary: BoundarySettings,
}

fn default_samples_per_segment() -> usize {
    5
}

fn default_smoothing_ck() -> usize {
    2
}

fn default_smoothing_curvature() -> f64 {
    1e-4
}

fn default_smoothing_boundary() -> BoundarySettings {
    BoundarySettings::Natural
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            samples_per_segment: default_samples_per_segment(),
            ck: default_smoothing_ck(),
            curvature_amplitude: default_smoothing_curvature(),
            length_amplitude: 0.0,
            boundary: default_smoothing_boundary(),
        }
    }
}

impl SmoothingSettings {
    /// Cubic control carrying the smoothing penalties.
    pub fn segment_control(&self) -> CurveResult<SegmentCustomBuilderControl> {
        if self.samples_per_segment < 2 {
            return Err(CurveError::config(format!(
                "samples_per_segment must be at least 2, got {}",
                self.samples_per_segment
            )));
        }
        let inelastic = SegmentInelasticDesignControl::create(
            self.ck,
            self.curvature_amplitude,
            self.length_amplitude,
        )?;
        Ok(SegmentCustomBuilderControl::new(
            BasisSetParams::cubic(),
            inelastic,
            None,
        )?)
    }
}
