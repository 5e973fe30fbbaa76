//! Floating-for-floating basis swap.

use super::{
    annuity, check_name, check_period, floating_leg, payment_schedule, unsupported,
    CalibratableInstrument,
};
use crate::context::PricingCurves;
use crate::error::{CurveError, CurveResult};
use crate::measure::ManifestMeasure;

/// Exchanges a reference index for a derived index plus a spread, both
/// legs on the same grid and discounted on the funding curve.
///
/// ```text
/// spread = (PV_reference - PV_derived) / annuity
/// ```
#[derive(Debug, Clone)]
pub struct FloatFloatBasisSwap {
    name: String,
    grid: Vec<f64>,
    reference_index: String,
    derived_index: String,
}

impl FloatFloatBasisSwap {
    /// Creates a basis swap between two distinct indices.
    pub fn new(
        name: impl Into<String>,
        effective: f64,
        maturity: f64,
        frequency: u32,
        reference_index: impl Into<String>,
        derived_index: impl Into<String>,
    ) -> CurveResult<Self> {
        let name = name.into();
        let reference_index = reference_index.into();
        let derived_index = derived_index.into();
        check_name(&name)?;
        check_period(&name, effective, maturity)?;
        if reference_index.trim().is_empty() || derived_index.trim().is_empty() {
            return Err(CurveError::invalid_input("Basis swap indices must not be empty"));
        }
        if reference_index == derived_index {
            return Err(CurveError::invalid_input(format!(
                "Basis swap '{name}' needs two different indices"
            )));
        }
        Ok(Self {
            grid: payment_schedule(effective, maturity, frequency)?,
            name,
            reference_index,
            derived_index,
        })
    }
}

impl CalibratableInstrument for FloatFloatBasisSwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn maturity(&self) -> f64 {
        self.grid[self.grid.len() - 1]
    }

    fn supported_measures(&self) -> &'static [ManifestMeasure] {
        &[ManifestMeasure::DerivedParBasisSpread]
    }

    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        if measure != ManifestMeasure::DerivedParBasisSpread {
            return Err(unsupported(&self.name, measure));
        }
        let funding = curves.funding()?;
        let reference = floating_leg(curves.projection(Some(&self.reference_index))?, funding, &self.grid)?;
        let derived = floating_leg(curves.projection(Some(&self.derived_index))?, funding, &self.grid)?;
        Ok((reference - derived) / annuity(funding, &self.grid)?)
    }
}
