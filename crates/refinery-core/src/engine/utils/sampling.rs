use crate::core::forcefield::potentials::GAS_CONSTANT;
use rand::Rng;
use tracing::instrument;

/// Inverse thermal energy `1 / (R T)` in mol/kJ for a temperature in Kelvin.
#[inline]
pub fn beta(temperature: f64) -> f64 {
    1.0 / (GAS_CONSTANT * temperature)
}

/// Metropolis criterion: always accepts a move that does not raise the energy, otherwise accepts
/// with probability `exp(-delta * beta)`.
#[instrument(level = "trace", skip_all, fields(delta))]
pub fn metropolis_accept(delta: f64, beta: f64, rng: &mut impl Rng) -> bool {
    if delta <= 0.0 {
        return true;
    }
    rng.r#gen::<f64>() < (-delta * beta).exp()
}
