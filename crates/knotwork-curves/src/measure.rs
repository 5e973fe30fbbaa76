//! Manifest measures and the latent-state metric measure binding.

use crate::error::{CurveError, CurveResult};
use crate::latent_state::{LatentState, QuantificationMetric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market-observable quantity an instrument is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestMeasure {
    /// Simple rate over the accrual period.
    Rate,
    /// Discount factor over the accrual period.
    DiscountFactor,
    /// Futures price, `100 · (1 - rate)`.
    Price,
    /// Par fixed rate of a swap.
    SwapRate,
    /// Present value per unit notional.
    PV,
    /// Spread over the derived leg that makes a basis swap par.
    DerivedParBasisSpread,
    /// Par CDS spread.
    ParSpread,
}

impl ManifestMeasure {
    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Rate => "Rate",
            Self::DiscountFactor => "DiscountFactor",
            Self::Price => "Price",
            Self::SwapRate => "SwapRate",
            Self::PV => "PV",
            Self::DerivedParBasisSpread => "DerivedParBasisSpread",
            Self::ParSpread => "ParSpread",
        }
    }
}

impl fmt::Display for ManifestMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ManifestMeasure {
    type Err = CurveError;

    fn from_str(s: &str) -> CurveResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CurveError::invalid_input("Manifest measure must not be empty"));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "rate" => Ok(Self::Rate),
            "discountfactor" | "df" => Ok(Self::DiscountFactor),
            "price" => Ok(Self::Price),
            "swaprate" => Ok(Self::SwapRate),
            "pv" => Ok(Self::PV),
            "derivedparbasisspread" => Ok(Self::DerivedParBasisSpread),
            "parspread" => Ok(Self::ParSpread),
            _ => Err(CurveError::invalid_input(format!(
                "Unknown manifest measure '{trimmed}'"
            ))),
        }
    }
}

/// One instrument bound to its target measure and quote on a latent state.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentStateMetricMeasure {
    /// Latent state being quantified.
    pub state: LatentState,
    /// Metric of the state's response.
    pub metric: QuantificationMetric,
    /// Instrument name.
    pub instrument: String,
    /// Instrument maturity.
    pub maturity: f64,
    /// Quoted measure.
    pub measure: ManifestMeasure,
    /// Quote value.
    pub quote: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_measures() {
        assert_eq!("SwapRate".parse::<ManifestMeasure>().unwrap(), ManifestMeasure::SwapRate);
        assert_eq!(" pv ".parse::<ManifestMeasure>().unwrap(), ManifestMeasure::PV);
        assert!(matches!(
            "".parse::<ManifestMeasure>(),
            Err(CurveError::InvalidConstructionInput { .. })
        ));
        assert!("Convexity".parse::<ManifestMeasure>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for measure in [
            ManifestMeasure::Rate,
            ManifestMeasure::DiscountFactor,
            ManifestMeasure::Price,
            ManifestMeasure::SwapRate,
            ManifestMeasure::PV,
            ManifestMeasure::DerivedParBasisSpread,
            ManifestMeasure::ParSpread,
        ] {
            assert_eq!(measure.to_string().parse::<ManifestMeasure>().unwrap(), measure);
        }
    }
}
