use std::f64::consts::PI;

/// Coulomb's constant, `1 / (4 pi eps0)`, in kJ·Å/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 1389.35458;

/// Molar gas constant in kJ/(mol·K).
pub const GAS_CONSTANT: f64 = 0.008314462618;

/// `U = 4 eps [(sigma/r)^12 - (sigma/r)^6]`
#[inline]
pub fn lennard_jones_12_6(r: f64, epsilon: f64, sigma: f64) -> f64 {
    let sr6 = (sigma / r).powi(6);
    4.0 * epsilon * (sr6 * sr6 - sr6)
}

/// `dU/dr` of [`lennard_jones_12_6`].
#[inline]
pub fn lennard_jones_12_6_derivative(r: f64, epsilon: f64, sigma: f64) -> f64 {
    let sr6 = (sigma / r).powi(6);
    24.0 * epsilon * (sr6 - 2.0 * sr6 * sr6) / r
}

/// Bare Coulomb energy for a charge product `qiqj` (e²) at distance `r`.
#[inline]
pub fn coulomb(r: f64, qiqj: f64) -> f64 {
    COULOMB_CONSTANT * qiqj / r
}

/// `dU/dr` of [`coulomb`].
#[inline]
pub fn coulomb_derivative(r: f64, qiqj: f64) -> f64 {
    -COULOMB_CONSTANT * qiqj / (r * r)
}

/// Shifted-force Coulomb, `k qiqj (1/r + r/rc^2 - 2/rc)`.
///
/// Written so that both value and slope are exactly zero at `r == range`.
#[inline]
pub fn shifted_coulomb(r: f64, qiqj: f64, range: f64) -> f64 {
    COULOMB_CONSTANT * qiqj * ((1.0 / r - 1.0 / range) + (r - range) / (range * range))
}

/// `dU/dr` of [`shifted_coulomb`].
#[inline]
pub fn shifted_coulomb_derivative(r: f64, qiqj: f64, range: f64) -> f64 {
    -COULOMB_CONSTANT * qiqj * (1.0 / (r * r) - 1.0 / (range * range))
}

/// Cosine taper: 1 below `range - width`, `0.5 (cos(pi x / width) + 1)` across the strip, 0 beyond.
#[inline]
pub fn cosine_taper(r: f64, range: f64, width: f64) -> f64 {
    let x = r - (range - width);
    if x <= 0.0 {
        1.0
    } else if x >= width {
        0.0
    } else {
        0.5 * ((PI * x / width).cos() + 1.0)
    }
}

/// `dT/dr` of [`cosine_taper`].
#[inline]
pub fn cosine_taper_derivative(r: f64, range: f64, width: f64) -> f64 {
    let x = r - (range - width);
    if x <= 0.0 || x >= width {
        0.0
    } else {
        -0.5 * PI / width * (PI * x / width).sin()
    }
}
