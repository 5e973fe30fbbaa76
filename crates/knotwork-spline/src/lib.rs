//! # Knotwork Spline
//!
//! Piecewise spline representations for curve calibration.
//!
//! A [`Segment`](segment::Segment) carries a basis over `[x_i, x_{i+1}]` and
//! is calibrated from linear constraints on its response and derivatives,
//! optionally with best-fit targets and roughness penalties. Segments are
//! chained into a [`Stretch`](stretch::Stretch), calibrated locally
//! (Hermite), globally (continuity plus boundary conditions) or by
//! regression, and stretches are collected into a [`Span`](span::Span).
//!
//! ## Example
//!
//! ```rust
//! use knotwork_spline::prelude::*;
//!
//! let control = SegmentCustomBuilderControl::cubic(2);
//! let mut stretch = Stretch::with_uniform_control(
//!     "curve",
//!     &[0.0, 1.0, 2.0, 3.0],
//!     &control,
//!     CalibrationDetail::Calibrate,
//! )
//! .unwrap();
//!
//! let states = vec![
//!     vec![SegmentConstraint::response(1.0, 1.0)],
//!     vec![SegmentConstraint::response(2.0, 4.0)],
//!     vec![SegmentConstraint::response(3.0, 9.0)],
//! ];
//! stretch
//!     .setup(
//!         Some(&SegmentConstraint::response(0.0, 0.0)),
//!         &states,
//!         None,
//!         BoundarySettings::Natural,
//!     )
//!     .unwrap();
//!
//! assert!((stretch.response_value(2.0).unwrap() - 4.0).abs() < 1e-10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

mod calibration;

pub mod basis;
pub mod error;
pub mod local_control;
pub mod segment;
pub mod span;
pub mod stretch;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::basis::{BasisSet, BasisSetParams, ShapeControl};
    pub use crate::error::{SplineError, SplineResult};
    pub use crate::local_control::{LocalControlStretchBuilder, SlopeAlgorithm};
    pub use crate::segment::{
        FlexurePenaltyControl, MonotoneType, PredictorResponseDerivative, Segment,
        SegmentBestFitResponse, SegmentConstraint, SegmentCustomBuilderControl,
        SegmentInelasticDesignControl,
    };
    pub use crate::span::{Span, SpanResolution};
    pub use crate::stretch::{
        BoundarySettings, CalibrationDetail, Stretch, StretchBestFitResponse, StretchState,
    };
}

pub use error::{SplineError, SplineResult};
