//! Fixed-for-floating interest rate swap.

use super::{
    annuity, check_name, check_period, floating_leg, payment_schedule, unsupported,
    CalibratableInstrument,
};
use crate::context::PricingCurves;
use crate::error::{CurveError, CurveResult};
use crate::measure::ManifestMeasure;

/// A vanilla swap paying fixed against a floating index.
///
/// Without a forward index the floating leg telescopes to
/// `P(effective) - P(maturity)` on the funding curve. `PV` is per unit
/// notional from the floating receiver's side.
#[derive(Debug, Clone)]
pub struct FixFloatSwap {
    name: String,
    fixed_grid: Vec<f64>,
    float_grid: Vec<f64>,
    index: Option<String>,
    fixed_rate: f64,
}

impl FixFloatSwap {
    /// Creates a swap with the given payments per year on each leg.
    pub fn new(
        name: impl Into<String>,
        effective: f64,
        maturity: f64,
        fixed_frequency: u32,
        float_frequency: u32,
    ) -> CurveResult<Self> {
        let name = name.into();
        check_name(&name)?;
        check_period(&name, effective, maturity)?;
        Ok(Self {
            fixed_grid: payment_schedule(effective, maturity, fixed_frequency)?,
            float_grid: payment_schedule(effective, maturity, float_frequency)?,
            name,
            index: None,
            fixed_rate: 0.0,
        })
    }

    /// Projects the floating leg off the forward curve of `index`.
    pub fn with_index(mut self, index: impl Into<String>) -> CurveResult<Self> {
        let index = index.into();
        if index.trim().is_empty() {
            return Err(CurveError::invalid_input("Forward index must not be empty"));
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Sets the contractual fixed rate used by `PV`.
    pub fn with_fixed_rate(mut self, fixed_rate: f64) -> CurveResult<Self> {
        if !fixed_rate.is_finite() {
            return Err(CurveError::invalid_input("Fixed rate must be finite"));
        }
        self.fixed_rate = fixed_rate;
        Ok(self)
    }

    fn effective(&self) -> f64 {
        self.float_grid[0]
    }

    fn legs(&self, curves: &PricingCurves<'_>) -> CurveResult<(f64, f64)> {
        let funding = curves.funding()?;
        let floating = match self.index.as_deref() {
            None => funding.factor(self.effective())? - funding.factor(self.maturity())?,
            Some(index) => floating_leg(curves.projection(Some(index))?, funding, &self.float_grid)?,
        };
        Ok((floating, annuity(funding, &self.fixed_grid)?))
    }
}

impl CalibratableInstrument for FixFloatSwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn maturity(&self) -> f64 {
        self.fixed_grid[self.fixed_grid.len() - 1]
    }

    fn supported_measures(&self) -> &'static [ManifestMeasure] {
        &[ManifestMeasure::SwapRate, ManifestMeasure::PV]
    }

    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        let (floating, annuity) = self.legs(curves)?;
        match measure {
            ManifestMeasure::SwapRate => Ok(floating / annuity),
            ManifestMeasure::PV => Ok(floating - self.fixed_rate * annuity),
            other => Err(unsupported(&self.name, other)),
        }
    }
}
