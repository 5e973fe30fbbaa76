//! Calibration instruments.
//!
//! Every instrument reports its maturity and prices its supported
//! [`ManifestMeasure`]s off the curves in a [`PricingCurves`] set:
//!
//! - [`Deposit`]: funding curve, short end
//! - [`RateFuture`]: funding or forward index curve
//! - [`FixFloatSwap`]: funding curve, optionally a forward index curve
//! - [`FloatFloatBasisSwap`]: funding plus two forward index curves
//! - [`CreditDefaultSwap`]: funding plus a credit curve
//!
//! Schedules are plain year-fraction grids; accrual fractions are the grid
//! differences.

mod basis_swap;
mod cds;
mod deposit;
mod future;
mod swap;

pub use basis_swap::FloatFloatBasisSwap;
pub use cds::CreditDefaultSwap;
pub use deposit::Deposit;
pub use future::RateFuture;
pub use swap::FixFloatSwap;

use crate::context::PricingCurves;
use crate::curve::LatentCurve;
use crate::error::{CurveError, CurveResult};
use crate::measure::ManifestMeasure;
use std::fmt;

/// Grid points closer than this to the effective date are merged into it.
const STUB_TOLERANCE: f64 = 1e-8;

/// An instrument that can be calibrated to.
pub trait CalibratableInstrument: Send + Sync + fmt::Debug {
    /// Instrument name, used in reports and Jacobians.
    fn name(&self) -> &str;

    /// Last ordinate the instrument depends on.
    fn maturity(&self) -> f64;

    /// Measures [`measure_value`](Self::measure_value) can produce.
    fn supported_measures(&self) -> &'static [ManifestMeasure];

    /// Prices `measure` off `curves`.
    fn measure_value(&self, measure: ManifestMeasure, curves: &PricingCurves<'_>) -> CurveResult<f64>;

    /// Returns true if `measure` is supported.
    fn supports(&self, measure: ManifestMeasure) -> bool {
        self.supported_measures().contains(&measure)
    }
}

pub(crate) fn check_name(name: &str) -> CurveResult<()> {
    if name.trim().is_empty() {
        Err(CurveError::invalid_input("Instrument name must not be empty"))
    } else {
        Ok(())
    }
}

pub(crate) fn check_period(name: &str, start: f64, end: f64) -> CurveResult<()> {
    if !start.is_finite() || !end.is_finite() || end <= start {
        return Err(CurveError::invalid_input(format!(
            "Instrument '{name}' needs finite start < end, got [{start}, {end}]"
        )));
    }
    Ok(())
}

pub(crate) fn unsupported(name: &str, measure: ManifestMeasure) -> CurveError {
    CurveError::unsupported(name, measure)
}

/// Accrual grid `[effective, t_1, ..., maturity]` rolled back from the
/// maturity in steps of `1 / frequency`, with a short front stub.
pub(crate) fn payment_schedule(effective: f64, maturity: f64, frequency: u32) -> CurveResult<Vec<f64>> {
    if frequency == 0 {
        return Err(CurveError::invalid_input("Payment frequency must be positive"));
    }
    let step = 1.0 / f64::from(frequency);
    let mut grid = vec![maturity];
    let mut k = 1.0;
    loop {
        let t = maturity - k * step;
        if t <= effective + STUB_TOLERANCE {
            break;
        }
        grid.push(t);
        k += 1.0;
    }
    grid.push(effective);
    grid.reverse();
    Ok(grid)
}

/// `Σ τ_i P(t_i)` over the grid.
pub(crate) fn annuity(discount: &dyn LatentCurve, grid: &[f64]) -> CurveResult<f64> {
    grid.windows(2).try_fold(0.0, |acc, period| {
        Ok(acc + (period[1] - period[0]) * discount.factor(period[1])?)
    })
}

/// `Σ τ_i F_i P(t_i)` with simple forwards from `projection`.
pub(crate) fn floating_leg(
    projection: &dyn LatentCurve,
    discount: &dyn LatentCurve,
    grid: &[f64],
) -> CurveResult<f64> {
    grid.windows(2).try_fold(0.0, |acc, period| {
        let tau = period[1] - period[0];
        let forward = projection.forward_rate(period[0], period[1])?;
        Ok(acc + tau * forward * discount.factor(period[1])?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_schedule_regular() {
        let grid = payment_schedule(0.0, 2.0, 2).unwrap();
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(grid[1], 0.5, epsilon = 1e-15);
        assert_eq!(grid[4], 2.0);
    }

    #[test]
    fn test_schedule_front_stub() {
        let grid = payment_schedule(0.25, 2.0, 1).unwrap();
        assert_eq!(grid, vec![0.25, 1.0, 2.0]);
    }

    #[test]
    fn test_schedule_rejects_zero_frequency() {
        assert!(payment_schedule(0.0, 1.0, 0).is_err());
    }
}
