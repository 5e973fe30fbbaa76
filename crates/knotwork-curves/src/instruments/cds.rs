//! Credit default swap.

use super::{check_name, check_period, payment_schedule, unsupported, CalibratableInstrument};
use crate::context::PricingCurves;
use crate::curve::LatentCurve;
use crate::error::{CurveError, CurveResult};
use crate::latent_state::LatentState;
use crate::measure::ManifestMeasure;

/// Protection on a reference entity with premium paid on a regular grid.
///
/// Default is assumed at period ends, accrued premium on default pays half
/// a period:
///
/// ```text
/// protection = (1 - R) Σ P(t_i) (Q(t_{i-1}) - Q(t_i))
/// risky annuity = Σ τ_i P(t_i) (Q(t_{i-1}) + Q(t_i)) / 2
/// ```
#[derive(Debug, Clone)]
pub struct CreditDefaultSwap {
    name: String,
    grid: Vec<f64>,
    reference: LatentState,
    recovery: f64,
    coupon: f64,
}

impl CreditDefaultSwap {
    /// Creates a CDS on `reference` with the given recovery rate.
    pub fn new(
        name: impl Into<String>,
        effective: f64,
        maturity: f64,
        frequency: u32,
        reference: impl Into<String>,
        recovery: f64,
    ) -> CurveResult<Self> {
        let name = name.into();
        check_name(&name)?;
        check_period(&name, effective, maturity)?;
        let reference = LatentState::credit(reference);
        reference.validate()?;
        if !(0.0..1.0).contains(&recovery) {
            return Err(CurveError::invalid_input(format!(
                "Recovery must lie in [0, 1), got {recovery}"
            )));
        }
        Ok(Self {
            grid: payment_schedule(effective, maturity, frequency)?,
            name,
            reference,
            recovery,
            coupon: 0.0,
        })
    }

    /// Sets the running coupon used by `PV`.
    pub fn with_coupon(mut self, coupon: f64) -> CurveResult<Self> {
        if !coupon.is_finite() {
            return Err(CurveError::invalid_input("CDS coupon must be finite"));
        }
        self.coupon = coupon;
        Ok(self)
    }

    fn legs(&self, funding: &dyn LatentCurve, credit: &dyn LatentCurve) -> CurveResult<(f64, f64)> {
        let mut protection = 0.0;
        let mut risky_annuity = 0.0;
        let mut survival_start = credit.factor(self.grid[0])?;
        for period in self.grid.windows(2) {
            let discount = funding.factor(period[1])?;
            let survival_end = credit.factor(period[1])?;
            protection += discount * (survival_start - survival_end);
            risky_annuity += (period[1] - period[0]) * discount * 0.5 * (survival_start + survival_end);
            survival_start = survival_end;
        }
        Ok(((1.0 - self.recovery) * protection, risky_annuity))
    }
}

impl CalibratableInstrument for CreditDefaultSwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn maturity(&self) -> f64 {
        self.grid[self.grid.len() - 1]
    }

    fn supported_measures(&self) -> &'static [ManifestMeasure] {
        &[ManifestMeasure::ParSpread, ManifestMeasure::PV]
    }

    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64> {
        let funding = curves.funding()?;
        let credit = curves.curve(&self.reference)?;
        let (protection, risky_annuity) = self.legs(funding, credit)?;
        match measure {
            ManifestMeasure::ParSpread => Ok(protection / risky_annuity),
            ManifestMeasure::PV => Ok(protection - self.coupon * risky_annuity),
            other => Err(unsupported(&self.name, other)),
        }
    }
}
