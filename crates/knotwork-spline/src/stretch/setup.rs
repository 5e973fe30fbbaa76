//! Local (Hermite) and global stretch setups.

use super::{BoundarySettings, CalibrationDetail, Stretch, StretchBestFitResponse};
use crate::calibration::{self, Objective};
use crate::error::{SplineError, SplineResult};
use crate::segment::{PredictorResponseDerivative, Segment, SegmentConstraint};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

impl Stretch {
    /// Calibrates every segment independently from its edge states.
    ///
    /// Segment `i` is constrained by `left_states[i]` at its left edge,
    /// `right_states[i]` at its right edge and any extra `constraints[i]`.
    /// With `CalibrateJacobian` the inputs are the knot responses
    /// `y_0..=y_n`; edge slopes are held fixed.
    pub fn setup_hermite(
        &mut self,
        left_states: &[PredictorResponseDerivative],
        right_states: &[PredictorResponseDerivative],
        constraints: Option<&[Vec<SegmentConstraint>]>,
        best_fit: Option<&StretchBestFitResponse>,
    ) -> SplineResult<()> {
        self.setup_hermite_chained(left_states, right_states, constraints, best_fit, None)
    }

    /// Hermite setup whose edge slopes are functions of the knot responses.
    ///
    /// `slope_sensitivity[(k, j)]` is `d m_k / d y_j` for the first
    /// derivative of the state at knot `k`. It is chained into the input
    /// Jacobian alongside the direct response dependence.
    pub(crate) fn setup_hermite_chained(
        &mut self,
        left_states: &[PredictorResponseDerivative],
        right_states: &[PredictorResponseDerivative],
        constraints: Option<&[Vec<SegmentConstraint>]>,
        best_fit: Option<&StretchBestFitResponse>,
        slope_sensitivity: Option<&DMatrix<f64>>,
    ) -> SplineResult<()> {
        let count = self.segments.len();
        if let Some(d) = slope_sensitivity {
            if d.nrows() != count + 1 || d.ncols() != count + 1 {
                return Err(SplineError::invalid_input(format!(
                    "Slope sensitivity must be {}x{}, got {}x{}",
                    count + 1,
                    count + 1,
                    d.nrows(),
                    d.ncols()
                )));
            }
        }
        if left_states.len() != count || right_states.len() != count {
            return Err(SplineError::invalid_input(format!(
                "Hermite setup of {count} segments got {} left and {} right states",
                left_states.len(),
                right_states.len()
            )));
        }
        if let Some(extra) = constraints {
            if extra.len() != count {
                return Err(SplineError::invalid_input(format!(
                    "Hermite setup of {count} segments got {} constraint sets",
                    extra.len()
                )));
            }
        }
        if let Some(best_fit) = best_fit {
            best_fit.check_domain(self.left(), self.right())?;
        }

        let want_jacobian = self.detail == CalibrationDetail::CalibrateJacobian;
        let mut segments = self.segments.clone();
        let mut jacobian = Vec::with_capacity(if want_jacobian { count } else { 0 });

        for i in 0..count {
            let segment = &mut segments[i];
            let mut rows = left_states[i].constraints_at(segment.left());
            let right_value_row = rows.len();
            let right_rows = right_states[i].constraints_at(segment.right());
            let right_has_slope = right_rows.len() > 1;
            rows.extend(right_rows);
            if let Some(extra) = constraints {
                rows.extend(extra[i].iter().cloned());
            }
            let segment_fit = best_fit.and_then(|b| b.for_segment(i, &self.segments));

            segment
                .calibrate(&rows, segment_fit.as_ref())
                .map_err(|e| SplineError::at_segment(i, e))?;

            if want_jacobian {
                let sensitivity = segment
                    .constraint_sensitivity()
                    .ok_or_else(|| SplineError::at_segment(i, SplineError::singular("no sensitivity")))?;
                let mut block = DMatrix::zeros(segment.dimension(), count + 1);
                block.set_column(i, &sensitivity.column(0));
                block.set_column(i + 1, &sensitivity.column(right_value_row));
                if let Some(d) = slope_sensitivity {
                    if right_value_row > 1 {
                        block += sensitivity.column(1) * d.row(i);
                    }
                    if right_has_slope {
                        block += sensitivity.column(right_value_row + 1) * d.row(i + 1);
                    }
                }
                jacobian.push(block);
            }
        }

        debug!(stretch = %self.name, segments = count, "hermite setup complete");
        self.finish(segments, want_jacobian.then_some(jacobian));
        Ok(())
    }

    /// Calibrates all segments jointly.
    ///
    /// Rows, in order: the optional `leading` constraint, the per-segment
    /// `state_constraints` (empty, or one set per segment), `C^0..C^k`
    /// continuity at each interior knot with `k` taken from the right-hand
    /// segment, then the `boundary` rows. Without best-fit targets or
    /// penalties the row count must equal the total coefficient count.
    ///
    /// With `CalibrateJacobian` the inputs are the leading and state
    /// constraint values in row order.
    pub fn setup(
        &mut self,
        leading: Option<&SegmentConstraint>,
        state_constraints: &[Vec<SegmentConstraint>],
        best_fit: Option<&StretchBestFitResponse>,
        boundary: BoundarySettings,
    ) -> SplineResult<()> {
        let count = self.segments.len();
        if !state_constraints.is_empty() && state_constraints.len() != count {
            return Err(SplineError::invalid_input(format!(
                "Global setup of {count} segments got {} state constraint sets",
                state_constraints.len()
            )));
        }
        boundary.check(&self.segments)?;
        if let Some(best_fit) = best_fit {
            best_fit.check_domain(self.left(), self.right())?;
        }

        let offsets: Vec<usize> = self
            .segments
            .iter()
            .scan(0, |acc, s| {
                let offset = *acc;
                *acc += s.dimension();
                Some(offset)
            })
            .collect();
        let unknowns: usize = self.segments.iter().map(Segment::dimension).sum();

        let mut rows: Vec<DVector<f64>> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        if let Some(leading) = leading {
            rows.push(self.global_row(&offsets, unknowns, leading, None)?);
            values.push(leading.value());
        }
        for (i, set) in state_constraints.iter().enumerate() {
            for constraint in set {
                rows.push(self.global_row(&offsets, unknowns, constraint, Some(i))?);
                values.push(constraint.value());
            }
        }
        let inputs = rows.len();

        for i in 1..count {
            let knot = self.segments[i].left();
            for order in 0..=self.segments[i].inelastic().ck {
                rows.push(self.continuity_row(&offsets, unknowns, i, knot, order)?);
                values.push(0.0);
            }
        }

        self.push_boundary_rows(boundary, &offsets, unknowns, &mut rows, &mut values)?;

        let needs_objective = best_fit.is_some() || self.segments.iter().any(|s| s.inelastic().has_penalty());
        let objective = if needs_objective {
            let mut objective = Objective::zeros(unknowns);
            for (i, segment) in self.segments.iter().enumerate() {
                let segment_fit = best_fit.and_then(|b| b.for_segment(i, &self.segments));
                segment.add_objective_terms(&mut objective, offsets[i], segment_fit.as_ref())?;
            }
            Some(objective)
        } else {
            None
        };

        let mut matrix = DMatrix::zeros(rows.len(), unknowns);
        for (r, row) in rows.iter().enumerate() {
            matrix.set_row(r, &row.transpose());
        }
        let solved = calibration::solve(&matrix, &DVector::from_vec(values), objective.as_ref())?;

        let mut segments = self.segments.clone();
        for (i, segment) in segments.iter_mut().enumerate() {
            let block = solved.coefficients.rows(offsets[i], segment.dimension()).into_owned();
            segment
                .set_coefficients(block)
                .map_err(|e| SplineError::at_segment(i, e))?;
        }

        let jacobian = (self.detail == CalibrationDetail::CalibrateJacobian).then(|| {
            segments
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    solved
                        .sensitivity
                        .view((offsets[i], 0), (s.dimension(), inputs))
                        .into_owned()
                })
                .collect::<Vec<_>>()
        });

        debug!(
            stretch = %self.name,
            segments = count,
            constraints = matrix.nrows(),
            unknowns,
            %boundary,
            "global setup complete"
        );
        self.finish(segments, jacobian);
        Ok(())
    }

    /// Global regression setup: continuity and boundary rows only, with the
    /// coefficients fitted to `best_fit`.
    pub fn setup_best_fit(
        &mut self,
        best_fit: &StretchBestFitResponse,
        boundary: BoundarySettings,
    ) -> SplineResult<()> {
        self.setup(None, &[], Some(best_fit), boundary)
    }

    fn global_row(
        &self,
        offsets: &[usize],
        unknowns: usize,
        constraint: &SegmentConstraint,
        preferred: Option<usize>,
    ) -> SplineResult<DVector<f64>> {
        let mut row = DVector::zeros(unknowns);
        for term in constraint.terms() {
            let index = match preferred {
                Some(i) if self.segments[i].contains(term.ordinate) => i,
                _ => self.containing_index(term.ordinate, true, true)?,
            };
            let segment = &self.segments[index];
            let local = segment.basis_row(term.ordinate, term.derivative_order)? * term.weight;
            let mut block = row.rows_mut(offsets[index], segment.dimension());
            block += local;
        }
        Ok(row)
    }

    /// `R_{i-1}^{(order)}(knot) - R_i^{(order)}(knot) = 0`.
    fn continuity_row(
        &self,
        offsets: &[usize],
        unknowns: usize,
        right_index: usize,
        knot: f64,
        order: usize,
    ) -> SplineResult<DVector<f64>> {
        let left = &self.segments[right_index - 1];
        let right = &self.segments[right_index];
        let mut row = DVector::zeros(unknowns);
        row.rows_mut(offsets[right_index - 1], left.dimension())
            .copy_from(&left.basis_row(knot, order)?);
        row.rows_mut(offsets[right_index], right.dimension())
            .copy_from(&(-right.basis_row(knot, order)?));
        Ok(row)
    }

    fn edge_row(
        &self,
        offsets: &[usize],
        unknowns: usize,
        index: usize,
        x: f64,
        order: usize,
    ) -> SplineResult<DVector<f64>> {
        let segment = &self.segments[index];
        let mut row = DVector::zeros(unknowns);
        row.rows_mut(offsets[index], segment.dimension())
            .copy_from(&segment.basis_row(x, order)?);
        Ok(row)
    }

    fn push_boundary_rows(
        &self,
        boundary: BoundarySettings,
        offsets: &[usize],
        unknowns: usize,
        rows: &mut Vec<DVector<f64>>,
        values: &mut Vec<f64>,
    ) -> SplineResult<()> {
        let last = self.segments.len() - 1;
        let (left, right) = self.domain();
        let new_rows = match boundary {
            BoundarySettings::Floating => Vec::new(),
            BoundarySettings::Natural => vec![
                self.edge_row(offsets, unknowns, 0, left, 2)?,
                self.edge_row(offsets, unknowns, last, right, 2)?,
            ],
            BoundarySettings::Financial => vec![
                self.edge_row(offsets, unknowns, 0, left, 2)?,
                self.edge_row(offsets, unknowns, last, right, 1)?,
            ],
            BoundarySettings::NotAKnot => vec![
                self.continuity_row(offsets, unknowns, 1, self.segments[1].left(), 3)?,
                self.continuity_row(offsets, unknowns, last, self.segments[last].left(), 3)?,
            ],
        };
        values.extend(std::iter::repeat(0.0).take(new_rows.len()));
        rows.extend(new_rows);
        Ok(())
    }
}
