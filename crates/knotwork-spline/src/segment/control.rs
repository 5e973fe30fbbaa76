//! Segment design controls.

use crate::basis::{BasisSet, BasisSetParams, ShapeControl};
use crate::error::{SplineError, SplineResult};
use serde::{Deserialize, Serialize};

fn default_curvature_order() -> usize {
    2
}

fn default_length_order() -> usize {
    1
}

/// Quadratic roughness penalty `amplitude · ∫ (R^{(p)}(u))² du`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexurePenaltyControl {
    /// Derivative order `p` being penalized.
    pub derivative_order: usize,
    /// Penalty weight, zero disables the term.
    pub amplitude: f64,
}

impl FlexurePenaltyControl {
    /// Creates a penalty on derivative `derivative_order`.
    pub fn new(derivative_order: usize, amplitude: f64) -> SplineResult<Self> {
        let control = Self {
            derivative_order,
            amplitude,
        };
        control.validate()?;
        Ok(control)
    }

    /// Curvature penalty (second derivative).
    pub fn curvature(amplitude: f64) -> SplineResult<Self> {
        Self::new(default_curvature_order(), amplitude)
    }

    /// Length penalty (first derivative).
    pub fn length(amplitude: f64) -> SplineResult<Self> {
        Self::new(default_length_order(), amplitude)
    }

    /// Validates order and amplitude.
    pub fn validate(&self) -> SplineResult<()> {
        if self.derivative_order == 0 {
            return Err(SplineError::invalid_input(
                "Penalty derivative order must be at least 1",
            ));
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(SplineError::invalid_input(format!(
                "Penalty amplitude must be finite and non-negative, got {}",
                self.amplitude
            )));
        }
        Ok(())
    }

    /// Returns true if the penalty contributes to the objective.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.amplitude > 0.0
    }
}

/// Continuity order and roughness penalties of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentInelasticDesignControl {
    /// Continuity order `k`: `C^0..C^k` is enforced with the previous segment.
    pub ck: usize,
    /// Curvature penalty.
    #[serde(default = "zero_curvature")]
    pub curvature: FlexurePenaltyControl,
    /// Length penalty.
    #[serde(default = "zero_length")]
    pub length: FlexurePenaltyControl,
}

fn zero_curvature() -> FlexurePenaltyControl {
    FlexurePenaltyControl {
        derivative_order: default_curvature_order(),
        amplitude: 0.0,
    }
}

fn zero_length() -> FlexurePenaltyControl {
    FlexurePenaltyControl {
        derivative_order: default_length_order(),
        amplitude: 0.0,
    }
}

impl SegmentInelasticDesignControl {
    /// Creates a control from explicit penalties.
    pub fn new(
        ck: usize,
        curvature: FlexurePenaltyControl,
        length: FlexurePenaltyControl,
    ) -> SplineResult<Self> {
        let control = Self {
            ck,
            curvature,
            length,
        };
        control.validate()?;
        Ok(control)
    }

    /// `C^k` continuity with curvature and length penalty amplitudes.
    pub fn create(ck: usize, curvature_amplitude: f64, length_amplitude: f64) -> SplineResult<Self> {
        Self::new(
            ck,
            FlexurePenaltyControl::curvature(curvature_amplitude)?,
            FlexurePenaltyControl::length(length_amplitude)?,
        )
    }

    /// `C^k` continuity without penalties.
    #[must_use]
    pub fn unpenalized(ck: usize) -> Self {
        Self {
            ck,
            curvature: zero_curvature(),
            length: zero_length(),
        }
    }

    /// Validates both penalties.
    pub fn validate(&self) -> SplineResult<()> {
        self.curvature.validate()?;
        self.length.validate()
    }

    /// Returns true if any penalty contributes to the objective.
    #[must_use]
    pub fn has_penalty(&self) -> bool {
        self.curvature.is_active() || self.length.is_active()
    }
}

/// Everything needed to build a segment: basis, inelastic control and an
/// optional shape controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCustomBuilderControl {
    /// Basis family.
    pub basis: BasisSetParams,
    /// Continuity and penalties.
    pub inelastic: SegmentInelasticDesignControl,
    /// Optional shape controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeControl>,
}

impl SegmentCustomBuilderControl {
    /// Creates a validated control.
    pub fn new(
        basis: BasisSetParams,
        inelastic: SegmentInelasticDesignControl,
        shape: Option<ShapeControl>,
    ) -> SplineResult<Self> {
        let control = Self {
            basis,
            inelastic,
            shape,
        };
        control.validate()?;
        Ok(control)
    }

    /// Cubic polynomial with the given continuity and no penalties.
    #[must_use]
    pub fn cubic(ck: usize) -> Self {
        Self {
            basis: BasisSetParams::cubic(),
            inelastic: SegmentInelasticDesignControl::unpenalized(ck),
            shape: None,
        }
    }

    /// Validates every component, building the basis to do so.
    pub fn validate(&self) -> SplineResult<BasisSet> {
        let basis = self.basis.build()?;
        self.inelastic.validate()?;
        if let Some(shape) = &self.shape {
            shape.validate()?;
        }
        Ok(basis)
    }
}
