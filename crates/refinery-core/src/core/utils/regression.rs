/// Least-squares straight line through `values` sampled at `x = 0, 1, 2, ...`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub mean: f64,
}

/// Fits a line to the trailing `window` points of `values`.
///
/// Returns `None` when fewer than `window` points are available or `window < 2`.
pub fn linear_fit_tail(values: &[f64], window: usize) -> Option<LinearFit> {
    if window < 2 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    let n = window as f64;

    let x_mean = (n - 1.0) / 2.0;
    let y_mean = tail.iter().sum::<f64>() / n;

    let (sxy, sxx) = tail
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
        mean: y_mean,
    })
}
