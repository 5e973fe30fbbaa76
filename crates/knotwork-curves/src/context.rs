//! Valuation and market inputs shared by calibration and pricing.

use crate::curve::{CalibratedCurve, LatentCurve};
use crate::error::{CurveError, CurveResult};
use crate::latent_state::LatentState;
use std::collections::HashMap;
use std::sync::Arc;

/// Where the curves start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValuationParams {
    valuation_ordinate: f64,
}

impl ValuationParams {
    /// Valuation at `valuation_ordinate`, the common origin of every curve.
    pub fn new(valuation_ordinate: f64) -> CurveResult<Self> {
        if !valuation_ordinate.is_finite() {
            return Err(CurveError::invalid_input(format!(
                "Valuation ordinate {valuation_ordinate} is not finite"
            )));
        }
        Ok(Self { valuation_ordinate })
    }

    /// Valuation ordinate.
    #[must_use]
    pub fn valuation_ordinate(&self) -> f64 {
        self.valuation_ordinate
    }
}

/// Already calibrated upstream curves, shared read-only.
#[derive(Debug, Clone, Default)]
pub struct MarketParams {
    curves: HashMap<LatentState, Arc<CalibratedCurve>>,
}

impl MarketParams {
    /// Creates an empty market.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `curve` under its latent state, replacing any previous one.
    #[must_use]
    pub fn with_curve(mut self, curve: Arc<CalibratedCurve>) -> Self {
        self.insert(curve);
        self
    }

    /// Adds `curve` under its latent state, replacing any previous one.
    pub fn insert(&mut self, curve: Arc<CalibratedCurve>) {
        self.curves.insert(curve.latent_state().clone(), curve);
    }

    /// Curve for `state`.
    pub fn curve(&self, state: &LatentState) -> CurveResult<&Arc<CalibratedCurve>> {
        self.curves
            .get(state)
            .ok_or_else(|| CurveError::curve_not_found(state))
    }

    /// Returns true if a curve for `state` is present.
    #[must_use]
    pub fn contains(&self, state: &LatentState) -> bool {
        self.curves.contains_key(state)
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Returns true if no curve is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Curves visible to an instrument: the curve under calibration plus the
/// market.
#[derive(Clone, Copy)]
pub struct PricingCurves<'a> {
    target: &'a dyn LatentCurve,
    market: &'a MarketParams,
}

impl<'a> PricingCurves<'a> {
    /// Prices against `target` for its own state and `market` otherwise.
    #[must_use]
    pub fn new(target: &'a dyn LatentCurve, market: &'a MarketParams) -> Self {
        Self { target, market }
    }

    /// Curve for `state`.
    pub fn curve(&self, state: &LatentState) -> CurveResult<&'a dyn LatentCurve> {
        if self.target.latent_state() == state {
            return Ok(self.target);
        }
        let curve: &'a CalibratedCurve = self.market.curve(state)?;
        Ok(curve as &dyn LatentCurve)
    }

    /// Funding curve.
    pub fn funding(&self) -> CurveResult<&'a dyn LatentCurve> {
        self.curve(&LatentState::Funding)
    }

    /// Projection curve of `index`, or the funding curve when `None`.
    pub fn projection(&self, index: Option<&str>) -> CurveResult<&'a dyn LatentCurve> {
        match index {
            Some(index) => self.curve(&LatentState::forward(index)),
            None => self.funding(),
        }
    }
}
