//! Stretch representation specs: instruments, measures and quotes bound to
//! one latent state.

use crate::curve::TurnAdjustment;
use crate::error::{CurveError, CurveResult};
use crate::instruments::CalibratableInstrument;
use crate::latent_state::{LatentState, QuantificationMetric};
use crate::measure::{LatentStateMetricMeasure, ManifestMeasure};
use std::sync::Arc;

/// Instruments are shared so specs can cross thread boundaries.
pub type SharedInstrument = Arc<dyn CalibratableInstrument>;

/// The instruments calibrating one stretch of a latent state.
///
/// Quotes may be NaN here; calibration rejects them as missing.
#[derive(Debug, Clone)]
pub struct StretchRepresentationSpec {
    name: String,
    latent_state: LatentState,
    metric: QuantificationMetric,
    instruments: Vec<SharedInstrument>,
    measures: Vec<ManifestMeasure>,
    quotes: Vec<f64>,
    turns: Vec<TurnAdjustment>,
}

impl StretchRepresentationSpec {
    /// Creates a validated spec.
    ///
    /// # Errors
    ///
    /// `InvalidConstructionInput` for a blank name or state label, empty or
    /// mismatched arrays; `IncompatibleMetric` when the metric cannot
    /// quantify the state; `UnsupportedMeasure` when an instrument cannot
    /// price its measure.
    pub fn new(
        name: impl Into<String>,
        latent_state: LatentState,
        metric: QuantificationMetric,
        instruments: Vec<SharedInstrument>,
        measures: Vec<ManifestMeasure>,
        quotes: Vec<f64>,
    ) -> CurveResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CurveError::invalid_input("Stretch name must not be empty"));
        }
        latent_state.validate()?;
        metric.check_state(&latent_state)?;
        if instruments.is_empty() {
            return Err(CurveError::invalid_input(format!(
                "Spec '{name}' needs at least one instrument"
            )));
        }
        if measures.len() != instruments.len() || quotes.len() != instruments.len() {
            return Err(CurveError::invalid_input(format!(
                "Spec '{name}' has {} instruments, {} measures and {} quotes",
                instruments.len(),
                measures.len(),
                quotes.len()
            )));
        }
        for (instrument, measure) in instruments.iter().zip(&measures) {
            if !instrument.supports(*measure) {
                return Err(CurveError::unsupported(instrument.name(), measure));
            }
        }

        Ok(Self {
            name,
            latent_state,
            metric,
            instruments,
            measures,
            quotes,
            turns: Vec::new(),
        })
    }

    /// Adds turn adjustments; credit states take none.
    pub fn with_turns(mut self, turns: Vec<TurnAdjustment>) -> CurveResult<Self> {
        if self.latent_state.is_credit() && !turns.is_empty() {
            return Err(CurveError::invalid_input(format!(
                "Turn adjustments do not apply to {}",
                self.latent_state
            )));
        }
        self.turns = turns;
        Ok(self)
    }

    /// Same spec with new quotes.
    pub fn with_quotes(&self, quotes: Vec<f64>) -> CurveResult<Self> {
        if quotes.len() != self.quotes.len() {
            return Err(CurveError::invalid_input(format!(
                "Spec '{}' needs {} quotes, got {}",
                self.name,
                self.quotes.len(),
                quotes.len()
            )));
        }
        Ok(Self {
            quotes,
            ..self.clone()
        })
    }

    /// Same spec with one quote shifted by `bump`.
    pub(crate) fn bumped(&self, index: usize, bump: f64) -> CurveResult<Self> {
        let mut quotes = self.quotes.clone();
        let quote = quotes.get_mut(index).ok_or_else(|| {
            CurveError::invalid_input(format!("Spec '{}' has no quote {index}", self.name))
        })?;
        *quote += bump;
        self.with_quotes(quotes)
    }

    /// Stretch name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latent state.
    #[must_use]
    pub fn latent_state(&self) -> &LatentState {
        &self.latent_state
    }

    /// Quantification metric.
    #[must_use]
    pub fn metric(&self) -> QuantificationMetric {
        self.metric
    }

    /// Instruments in calibration order.
    #[must_use]
    pub fn instruments(&self) -> &[SharedInstrument] {
        &self.instruments
    }

    /// Quoted measures.
    #[must_use]
    pub fn measures(&self) -> &[ManifestMeasure] {
        &self.measures
    }

    /// Quotes.
    #[must_use]
    pub fn quotes(&self) -> &[f64] {
        &self.quotes
    }

    /// Turn adjustments.
    #[must_use]
    pub fn turns(&self) -> &[TurnAdjustment] {
        &self.turns
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Always false: construction rejects empty specs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// One binding record per instrument.
    #[must_use]
    pub fn metric_measures(&self) -> Vec<LatentStateMetricMeasure> {
        self.instruments
            .iter()
            .zip(&self.measures)
            .zip(&self.quotes)
            .map(|((instrument, measure), quote)| LatentStateMetricMeasure {
                state: self.latent_state.clone(),
                metric: self.metric,
                instrument: instrument.name().to_string(),
                maturity: instrument.maturity(),
                measure: *measure,
                quote: *quote,
            })
            .collect()
    }
}
