use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("Abscissa and ordinate arrays differ in length ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("Curve abscissae must be strictly increasing (violated at index {index})")]
    NotIncreasing { index: usize },
}

/// A sampled function `y(x)` with strictly increasing abscissae.
///
/// Tabulated pair potentials are stored as curves on a uniform grid, where the fractional index
/// `x / delta` addresses the table directly (see [`Curve::interpolate_index`]). Curves on arbitrary
/// grids, such as externally supplied corrections, are evaluated with [`Curve::approximate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Curve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, CurveError> {
        if x.len() != y.len() {
            return Err(CurveError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(CurveError::NotIncreasing { index: index + 1 });
        }
        Ok(Self { x, y })
    }

    /// A zero-valued curve with `n_points` abscissae at `n * delta`.
    pub fn uniform(n_points: usize, delta: f64) -> Self {
        Self {
            x: (0..n_points).map(|n| n as f64 * delta).collect(),
            y: vec![0.0; n_points],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    #[inline]
    pub fn y_mut(&mut self) -> &mut [f64] {
        &mut self.y
    }

    #[inline]
    pub fn value(&self, index: usize) -> f64 {
        self.y[index]
    }

    /// Three-point interpolation at a fractional index into a uniformly spaced table.
    ///
    /// Indices inside the final three points return the last tabulated value.
    pub fn interpolate_index(&self, fractional_index: f64) -> f64 {
        let n = self.y.len();
        if n == 0 {
            return 0.0;
        }
        if n < 3 || fractional_index < 0.0 {
            return if fractional_index < 0.0 { self.y[0] } else { self.y[n - 1] };
        }

        let interval = fractional_index.floor() as usize;
        if interval >= n - 3 {
            return self.y[n - 1];
        }

        let ppp = fractional_index - interval as f64;
        three_point(
            self.y[interval],
            self.y[interval + 1],
            self.y[interval + 2],
            ppp,
        )
    }

    /// Interpolated value at an arbitrary abscissa, located by binary chop.
    ///
    /// Values outside the sampled range are clamped to the first or last ordinate.
    pub fn approximate(&self, x: f64) -> f64 {
        let n = self.x.len();
        if n == 0 {
            return 0.0;
        }
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }

        let mut lower = 0;
        let mut upper = n - 1;
        while upper - lower > 1 {
            let middle = (lower + upper) / 2;
            if self.x[middle] > x {
                upper = middle;
            } else {
                lower = middle;
            }
        }

        let ppp = (x - self.x[lower]) / (self.x[upper] - self.x[lower]);
        if lower + 2 >= n {
            return self.y[lower] + (self.y[upper] - self.y[lower]) * ppp;
        }
        three_point(self.y[lower], self.y[lower + 1], self.y[lower + 2], ppp)
    }

    /// Adds `factor * source(x)` at every abscissa of this curve.
    pub fn add_interpolated(&mut self, source: &Curve, factor: f64) {
        for (x, y) in self.x.iter().zip(self.y.iter_mut()) {
            *y += source.approximate(*x) * factor;
        }
    }
}

#[inline]
fn three_point(y0: f64, y1: f64, y2: f64, ppp: f64) -> f64 {
    let t1 = y0 + (y1 - y0) * ppp;
    let t2 = y1 + (y2 - y1) * (ppp - 1.0);
    t1 + (t2 - t1) * ppp * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn quadratic_curve(n_points: usize, delta: f64) -> Curve {
        let mut curve = Curve::uniform(n_points, delta);
        let xs = curve.x().to_vec();
        for (y, x) in curve.y_mut().iter_mut().zip(xs) {
            *y = 2.0 * x * x - 3.0 * x + 1.0;
        }
        curve
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        let result = Curve::new(vec![0.0, 1.0], vec![0.0]);
        assert_eq!(result, Err(CurveError::LengthMismatch { x: 2, y: 1 }));
    }

    #[test]
    fn new_rejects_non_increasing_abscissae() {
        let result = Curve::new(vec![0.0, 1.0, 1.0], vec![0.0; 3]);
        assert_eq!(result, Err(CurveError::NotIncreasing { index: 2 }));
    }

    #[test]
    fn uniform_curve_places_points_on_grid() {
        let curve = Curve::uniform(4, 0.5);
        assert_eq!(curve.x(), &[0.0, 0.5, 1.0, 1.5]);
        assert!(curve.y().iter().all(|&y| y == 0.0));
    }

    #[test]
    fn interpolate_index_reproduces_grid_values() {
        let curve = quadratic_curve(20, 0.1);
        for n in 0..15 {
            assert!(f64_approx_equal(
                curve.interpolate_index(n as f64),
                curve.value(n)
            ));
        }
    }

    #[test]
    fn interpolate_index_is_exact_for_quadratics() {
        let curve = quadratic_curve(20, 0.1);
        let x: f64 = 0.537;
        let expected = 2.0 * x * x - 3.0 * x + 1.0;
        assert!((curve.interpolate_index(x / 0.1) - expected).abs() < 1e-10);
    }

    #[test]
    fn interpolate_index_returns_last_value_near_end_of_table() {
        let curve = quadratic_curve(10, 1.0);
        assert_eq!(curve.interpolate_index(7.2), curve.value(9));
        assert_eq!(curve.interpolate_index(100.0), curve.value(9));
    }

    #[test]
    fn approximate_clamps_outside_range() {
        let curve = Curve::new(vec![1.0, 2.0, 4.0], vec![5.0, 6.0, 8.0]).unwrap();
        assert_eq!(curve.approximate(0.0), 5.0);
        assert_eq!(curve.approximate(10.0), 8.0);
    }

    #[test]
    fn approximate_interpolates_linear_data_exactly() {
        let curve = Curve::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 2.0, 4.0, 6.0]).unwrap();
        assert!(f64_approx_equal(curve.approximate(1.25), 2.5));
        assert!(f64_approx_equal(curve.approximate(2.5), 5.0));
    }

    #[test]
    fn add_interpolated_scales_source_onto_target_grid() {
        let mut target = Curve::uniform(5, 1.0);
        let source = Curve::new(vec![0.0, 2.0, 4.0], vec![1.0, 1.0, 1.0]).unwrap();
        target.add_interpolated(&source, 0.5);
        assert!(target.y().iter().all(|&y| f64_approx_equal(y, 0.5)));
    }
}
