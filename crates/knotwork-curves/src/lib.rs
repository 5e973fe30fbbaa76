//! # Knotwork Curves
//!
//! Shape-preserving bootstrap of funding, forward and credit curves onto
//! spline stretches.
//!
//! A curve quantifies one [`LatentState`](latent_state::LatentState) in one
//! [`QuantificationMetric`](latent_state::QuantificationMetric). Its inputs
//! are [`StretchRepresentationSpec`](representation::StretchRepresentationSpec)s:
//! instruments, the measures they are quoted in and the quotes. The
//! [`LinearCurveCalibrator`](calibrator::LinearCurveCalibrator) turns each
//! spec into a calibrated stretch, one segment per instrument, and chains
//! the stretches into an immutable
//! [`CalibratedCurve`](curve::CalibratedCurve).
//!
//! This crate provides:
//!
//! - **Calibration**: sequential bootstrap with a hybrid Newton/Brent root
//!   search per instrument and a repricing report
//! - **Instruments**: deposits, rate futures, fix/float and basis swaps, CDS
//! - **Curves**: discount factors, zero and forward rates, survival
//!   probabilities and turn adjustments
//! - **Sensitivities**: finite-difference quote Jacobians, computed in
//!   parallel
//! - **Smoothing**: opt-in best-fit refit of a calibrated curve
//!
//! ## Example
//!
//! ```rust
//! use knotwork_curves::prelude::*;
//! use std::sync::Arc;
//!
//! let instruments: Vec<SharedInstrument> = vec![
//!     Arc::new(Deposit::new("6M", 0.0, 0.5).unwrap()),
//!     Arc::new(FixFloatSwap::new("2Y", 0.0, 2.0, 1, 2).unwrap()),
//!     Arc::new(FixFloatSwap::new("5Y", 0.0, 5.0, 1, 2).unwrap()),
//! ];
//! let spec = StretchRepresentationSpec::new(
//!     "funding",
//!     LatentState::Funding,
//!     QuantificationMetric::DiscountFactor,
//!     instruments,
//!     vec![ManifestMeasure::Rate, ManifestMeasure::SwapRate, ManifestMeasure::SwapRate],
//!     vec![0.030, 0.034, 0.037],
//! )
//! .unwrap();
//!
//! let curve = LinearCurveCalibrator::default()
//!     .calibrate(&[spec], &ValuationParams::default(), &MarketParams::new())
//!     .unwrap();
//!
//! let df = curve.discount_factor(5.0).unwrap();
//! assert!(df > 0.8 && df < 0.9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

pub mod calibrator;
pub mod config;
pub mod context;
pub mod curve;
pub mod error;
pub mod instruments;
pub mod latent_state;
pub mod measure;
pub mod representation;
pub mod repricing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calibrator::{
        CalibrationJob, LinearCurveCalibrator, QuoteJacobian, QuoteSensitivity,
    };
    pub use crate::config::{CalibratorConfig, SmoothingSettings};
    pub use crate::context::{MarketParams, PricingCurves, ValuationParams};
    pub use crate::curve::{CalibratedCurve, LatentCurve, TurnAdjustment};
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::instruments::{
        CalibratableInstrument, CreditDefaultSwap, Deposit, FixFloatSwap, FloatFloatBasisSwap,
        RateFuture,
    };
    pub use crate::latent_state::{LatentState, QuantificationMetric};
    pub use crate::measure::{LatentStateMetricMeasure, ManifestMeasure};
    pub use crate::representation::{SharedInstrument, StretchRepresentationSpec};
    pub use crate::repricing::{RepricingCheck, RepricingReport};
}

pub use error::{CurveError, CurveResult};
