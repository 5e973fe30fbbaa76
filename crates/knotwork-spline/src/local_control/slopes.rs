//! Nodal slope estimators for shape-preserving Hermite splines.
//!
//! Every estimator maps knots `x_0..x_n` and responses `y_0..y_n` to one
//! slope per knot, built from the secant slopes
//! `Δ_i = (y_{i+1} - y_i) / h_i` of the neighbouring intervals.

/// Secant slopes and interval widths.
pub(crate) struct Secants {
    pub widths: Vec<f64>,
    pub slopes: Vec<f64>,
}

impl Secants {
    pub fn new(xs: &[f64], ys: &[f64]) -> Self {
        let widths: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let slopes = ys
            .windows(2)
            .zip(&widths)
            .map(|(y, h)| (y[1] - y[0]) / h)
            .collect();
        Self { widths, slopes }
    }

    fn intervals(&self) -> usize {
        self.slopes.len()
    }
}

fn same_sign(a: f64, b: f64) -> bool {
    a * b > 0.0
}

/// Three-point end slope from the two intervals next to an edge.
fn three_point(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1)
}

fn three_point_ends(s: &Secants) -> (f64, f64) {
    let n = s.intervals();
    let h = &s.widths;
    let d = &s.slopes;
    (
        three_point(h[0], h[1], d[0], d[1]),
        three_point(h[n - 1], h[n - 2], d[n - 1], d[n - 2]),
    )
}

/// Two knots leave nothing to estimate: both slopes are the secant.
fn single_interval(s: &Secants) -> Option<Vec<f64>> {
    (s.intervals() == 1).then(|| vec![s.slopes[0]; 2])
}

fn bessel_interior(s: &Secants, i: usize) -> f64 {
    let (h0, h1) = (s.widths[i - 1], s.widths[i]);
    (h1 * s.slopes[i - 1] + h0 * s.slopes[i]) / (h0 + h1)
}

/// Bessel: slope of the parabola through three neighbouring knots.
pub(crate) fn bessel(s: &Secants) -> Vec<f64> {
    if let Some(slopes) = single_interval(s) {
        return slopes;
    }
    let n = s.intervals();
    let (first, last) = three_point_ends(s);
    let mut m = Vec::with_capacity(n + 1);
    m.push(first);
    m.extend((1..n).map(|i| bessel_interior(s, i)));
    m.push(last);
    m
}

fn hyman_clamp(slope: f64, left: Option<f64>, right: Option<f64>, bound: f64) -> f64 {
    let reference = match (left, right) {
        (Some(a), Some(b)) if same_sign(a, b) => a,
        (Some(_), Some(_)) => return 0.0,
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => return slope,
    };
    if !same_sign(slope, reference) {
        return 0.0;
    }
    slope.signum() * slope.abs().min(bound)
}

fn neighbour_secants(s: &Secants, i: usize) -> (Option<f64>, Option<f64>) {
    let left = (i > 0).then(|| s.slopes[i - 1]);
    let right = (i < s.intervals()).then(|| s.slopes[i]);
    (left, right)
}

fn local_bound(left: Option<f64>, right: Option<f64>) -> f64 {
    3.0 * left
        .into_iter()
        .chain(right)
        .map(f64::abs)
        .fold(f64::INFINITY, f64::min)
}

/// Hyman (1983): Bessel slopes limited to `3 · min(|Δ_{i-1}|, |Δ_i|)`, zero
/// at data extrema.
pub(crate) fn hyman83(s: &Secants) -> Vec<f64> {
    bessel(s)
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let (left, right) = neighbour_secants(s, i);
            hyman_clamp(m, left, right, local_bound(left, right))
        })
        .collect()
}

/// Hyman (1989) with the Dougherty-Edelman extension: the limiter may be
/// widened to `1.5 · min(|p⁰|, |p^±|)` where the three-point estimates
/// from one side agree in sign with the curvature of the data. Interior
/// data extrema keep a limited nonzero slope; they are not forced flat.
pub(crate) fn hyman89(s: &Secants) -> Vec<f64> {
    let base = bessel(s);
    let n = s.intervals();
    if n < 2 {
        return base;
    }
    let d = &s.slopes;
    let h = &s.widths;

    base.iter()
        .enumerate()
        .map(|(i, &p0)| {
            let (left, right) = neighbour_secants(s, i);
            if i == 0 || i == n {
                return hyman_clamp(p0, left, right, local_bound(left, right));
            }

            let mut bound = 3.0 * d[i - 1].abs().min(d[i].abs()).min(p0.abs());
            if i >= 2 {
                let p_minus = three_point(h[i - 1], h[i - 2], d[i - 1], d[i - 2]);
                let (c0, c1) = (d[i - 1] - d[i - 2], d[i] - d[i - 1]);
                if same_sign(p0, p_minus) && same_sign(p0, c0) && same_sign(p0, c1) {
                    bound = bound.max(1.5 * p0.abs().min(p_minus.abs()));
                }
            }
            if i + 1 < n {
                let p_plus = three_point(h[i], h[i + 1], d[i], d[i + 1]);
                let (c0, c1) = (d[i] - d[i - 1], d[i + 1] - d[i]);
                if same_sign(p0, p_plus) && same_sign(-p0, c0) && same_sign(-p0, c1) {
                    bound = bound.max(1.5 * p0.abs().min(p_plus.abs()));
                }
            }
            p0.signum() * p0.abs().min(bound)
        })
        .collect()
}

/// pchip end slope: three-point estimate, zeroed or limited so it does not
/// overshoot.
fn pchip_end(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let m = three_point(h0, h1, d0, d1);
    if !same_sign(m, d0) {
        0.0
    } else if !same_sign(d0, d1) && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}

/// Fritsch-Butland weighted harmonic mean of the neighbouring secants.
pub(crate) fn harmonic(s: &Secants) -> Vec<f64> {
    if let Some(slopes) = single_interval(s) {
        return slopes;
    }
    let n = s.intervals();
    let h = &s.widths;
    let d = &s.slopes;

    let mut m = Vec::with_capacity(n + 1);
    m.push(pchip_end(h[0], h[1], d[0], d[1]));
    for i in 1..n {
        m.push(if same_sign(d[i - 1], d[i]) {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            (w1 + w2) / (w1 / d[i - 1] + w2 / d[i])
        } else {
            0.0
        });
    }
    m.push(pchip_end(h[n - 1], h[n - 2], d[n - 1], d[n - 2]));
    m
}

/// Van Leer limiter `(|Δ_i| Δ_{i-1} + |Δ_{i-1}| Δ_i) / (|Δ_{i-1}| + |Δ_i|)`,
/// secant slopes at the ends.
pub(crate) fn van_leer(s: &Secants) -> Vec<f64> {
    let n = s.intervals();
    let d = &s.slopes;
    let mut m = Vec::with_capacity(n + 1);
    m.push(d[0]);
    for i in 1..n {
        let denominator = d[i - 1].abs() + d[i].abs();
        m.push(if denominator == 0.0 {
            0.0
        } else {
            (d[i].abs() * d[i - 1] + d[i - 1].abs() * d[i]) / denominator
        });
    }
    m.push(d[n - 1]);
    m
}

/// Kruger (2002): harmonic mean of the secants, ends from the constrained
/// cubic condition `m_0 = 1.5 Δ_0 - 0.5 m_1`.
pub(crate) fn kruger(s: &Secants) -> Vec<f64> {
    if let Some(slopes) = single_interval(s) {
        return slopes;
    }
    let n = s.intervals();
    let d = &s.slopes;
    let mut m = vec![0.0; n + 1];
    for i in 1..n {
        if same_sign(d[i - 1], d[i]) {
            m[i] = 2.0 / (1.0 / d[i - 1] + 1.0 / d[i]);
        }
    }
    m[0] = 1.5 * d[0] - 0.5 * m[1];
    m[n] = 1.5 * d[n - 1] - 0.5 * m[n - 1];
    m
}

/// Akima (1970): weighted average of the neighbouring secants, extended by
/// two linearly extrapolated secants at each end.
pub(crate) fn akima(s: &Secants) -> Vec<f64> {
    if let Some(slopes) = single_interval(s) {
        return slopes;
    }
    let d = &s.slopes;
    let n = s.intervals();

    let mut extended = Vec::with_capacity(n + 4);
    extended.push(3.0 * d[0] - 2.0 * d[1]);
    extended.push(2.0 * d[0] - d[1]);
    extended.extend_from_slice(d);
    extended.push(2.0 * d[n - 1] - d[n - 2]);
    extended.push(3.0 * d[n - 1] - 2.0 * d[n - 2]);

    (0..=n)
        .map(|i| {
            let k = i + 2;
            let w_left = (extended[k + 1] - extended[k]).abs();
            let w_right = (extended[k - 1] - extended[k - 2]).abs();
            if w_left + w_right < 1e-30 {
                0.5 * (extended[k - 1] + extended[k])
            } else {
                (w_left * extended[k - 1] + w_right * extended[k]) / (w_left + w_right)
            }
        })
        .collect()
}

/// Zeroes slopes that would create an extremum absent from the data.
pub(crate) fn eliminate_spurious_extrema(s: &Secants, slopes: &mut [f64]) {
    for (i, m) in slopes.iter_mut().enumerate() {
        let (left, right) = neighbour_secants(s, i);
        let reference = match (left, right) {
            (Some(a), Some(b)) if same_sign(a, b) => a,
            (Some(_), Some(_)) => continue,
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => continue,
        };
        if *m * reference < 0.0 {
            *m = 0.0;
        }
    }
}

/// Fritsch-Carlson / Hyman monotone filter: zero slope at data extrema and
/// flat intervals, otherwise `|m_i| <= 3 · min(|Δ_{i-1}|, |Δ_i|)` with the
/// sign of the data.
pub(crate) fn apply_monotone_filter(s: &Secants, slopes: &mut [f64]) {
    for (i, m) in slopes.iter_mut().enumerate() {
        let (left, right) = neighbour_secants(s, i);
        *m = hyman_clamp(*m, left, right, local_bound(left, right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn secants(xs: &[f64], ys: &[f64]) -> Secants {
        Secants::new(xs, ys)
    }

    #[test]
    fn test_bessel_exact_for_parabola() {
        let xs = [0.0, 0.5, 1.5, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();

        let m = bessel(&secants(&xs, &ys));

        for (x, slope) in xs.iter().zip(m) {
            assert_relative_eq!(slope, 2.0 * x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_extremum_gets_zero_slope() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.0, 0.0, 1.0];
        let s = secants(&xs, &ys);

        for estimator in [hyman83, harmonic, van_leer, kruger] {
            let m = estimator(&s);
            assert_eq!(m[1], 0.0);
            assert_eq!(m[2], 0.0);
        }
    }

    #[test]
    fn test_hyman89_keeps_slope_at_extremum() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.0, 0.5, 2.0];
        let s = secants(&xs, &ys);

        // Bessel gives 0.25 at the local maximum, inside the 3 · min bound
        assert_relative_eq!(hyman89(&s)[1], 0.25, epsilon = 1e-12);
        assert_eq!(hyman83(&s)[1], 0.0);
    }

    #[test]
    fn test_akima_linear_data() {
        let xs = [0.0, 1.0, 2.0, 4.0, 5.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 1.0).collect();

        for slope in akima(&secants(&xs, &ys)) {
            assert_relative_eq!(slope, 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_monotone_filter_clamps() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 0.1, 5.0];
        let s = secants(&xs, &ys);
        let mut m = vec![1.0, 4.0, -1.0];

        apply_monotone_filter(&s, &mut m);

        assert_relative_eq!(m[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(m[1], 0.3, epsilon = 1e-12);
        assert_eq!(m[2], 0.0);
    }

    #[test]
    fn test_spurious_extrema_removed() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 1.0, 2.0];
        let s = secants(&xs, &ys);
        let mut m = vec![-0.5, 1.0, 2.0];

        eliminate_spurious_extrema(&s, &mut m);

        assert_eq!(m, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_two_knots_use_secant() {
        let s = secants(&[0.0, 2.0], &[1.0, 2.0]);
        for estimator in [bessel, hyman83, hyman89, harmonic, van_leer, kruger, akima] {
            assert_eq!(estimator(&s), vec![0.5, 0.5]);
        }
    }
}
