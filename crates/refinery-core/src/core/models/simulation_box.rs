use super::error::ModelError;
use crate::core::utils::geometry::{angle_between, dihedral_angle};
use nalgebra::{Point3, Vector3};

/// The cell containing a configuration.
///
/// Separation vectors always follow the minimum image convention: for a periodic axis of length
/// `L`, each component is wrapped into `[-L/2, L/2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationBox {
    /// An isolated system with no periodic images.
    NonPeriodic,
    /// A periodic box with orthogonal axes.
    Orthorhombic { lengths: Vector3<f64> },
}

impl SimulationBox {
    pub fn cubic(length: f64) -> Result<Self, ModelError> {
        Self::orthorhombic(length, length, length)
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, ModelError> {
        for length in [a, b, c] {
            if !(length.is_finite() && length > 0.0) {
                return Err(ModelError::InvalidBoxLength(length));
            }
        }
        Ok(Self::Orthorhombic {
            lengths: Vector3::new(a, b, c),
        })
    }

    pub fn volume(&self) -> Option<f64> {
        match self {
            Self::NonPeriodic => None,
            Self::Orthorhombic { lengths } => Some(lengths.x * lengths.y * lengths.z),
        }
    }

    /// Largest pair potential range for which each atom sees at most one image of any other atom.
    pub fn inscribed_radius(&self) -> Option<f64> {
        match self {
            Self::NonPeriodic => None,
            Self::Orthorhombic { lengths } => Some(0.5 * lengths.min()),
        }
    }

    /// Minimum image vector pointing from `from` to `to`.
    #[inline]
    pub fn minimum_vector(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        let delta = to - from;
        match self {
            Self::NonPeriodic => delta,
            Self::Orthorhombic { lengths } => Vector3::new(
                delta.x - lengths.x * (delta.x / lengths.x).round(),
                delta.y - lengths.y * (delta.y / lengths.y).round(),
                delta.z - lengths.z * (delta.z / lengths.z).round(),
            ),
        }
    }

    #[inline]
    pub fn minimum_distance_squared(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_vector(a, b).norm_squared()
    }

    #[inline]
    pub fn minimum_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_vector(a, b).norm()
    }

    /// Angle `i-j-k` in degrees, with `j` the central atom.
    pub fn angle(&self, i: &Point3<f64>, j: &Point3<f64>, k: &Point3<f64>) -> f64 {
        angle_between(&self.minimum_vector(j, i), &self.minimum_vector(j, k))
    }

    /// Dihedral angle `i-j-k-l` in degrees.
    pub fn dihedral(
        &self,
        i: &Point3<f64>,
        j: &Point3<f64>,
        k: &Point3<f64>,
        l: &Point3<f64>,
    ) -> f64 {
        dihedral_angle(
            &self.minimum_vector(i, j),
            &self.minimum_vector(j, k),
            &self.minimum_vector(k, l),
        )
    }

    /// Maps a position back into the primary cell `[0, L)` along each periodic axis.
    pub fn fold(&self, position: &Point3<f64>) -> Point3<f64> {
        match self {
            Self::NonPeriodic => *position,
            Self::Orthorhombic { lengths } => Point3::new(
                position.x - lengths.x * (position.x / lengths.x).floor(),
                position.y - lengths.y * (position.y / lengths.y).floor(),
                position.z - lengths.z * (position.z / lengths.z).floor(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn orthorhombic_rejects_non_positive_lengths() {
        assert_eq!(
            SimulationBox::orthorhombic(10.0, 0.0, 10.0),
            Err(ModelError::InvalidBoxLength(0.0))
        );
        assert!(SimulationBox::cubic(f64::NAN).is_err());
    }

    #[test]
    fn minimum_vector_wraps_across_periodic_boundary() {
        let cell = SimulationBox::cubic(10.0).unwrap();
        let v = cell.minimum_vector(&Point3::new(0.5, 5.0, 9.0), &Point3::new(9.5, 5.0, 1.0));
        assert!((v.x + 1.0).abs() < TOLERANCE);
        assert!(v.y.abs() < TOLERANCE);
        assert!((v.z - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn non_periodic_box_returns_plain_difference() {
        let v = SimulationBox::NonPeriodic
            .minimum_vector(&Point3::new(0.5, 0.0, 0.0), &Point3::new(9.5, 0.0, 0.0));
        assert!((v.x - 9.0).abs() < TOLERANCE);
    }

    #[test]
    fn minimum_distance_never_exceeds_half_diagonal() {
        let cell = SimulationBox::orthorhombic(8.0, 10.0, 12.0).unwrap();
        let d = cell.minimum_distance(&Point3::new(0.0, 0.0, 0.0), &Point3::new(7.0, 9.0, 11.0));
        assert!((d - 3.0f64.sqrt()).abs() < TOLERANCE);
    }

    #[test]
    fn angle_uses_minimum_image_arms() {
        let cell = SimulationBox::cubic(10.0).unwrap();
        let angle = cell.angle(
            &Point3::new(9.5, 0.0, 0.0),
            &Point3::new(0.5, 0.0, 0.0),
            &Point3::new(0.5, 1.0, 0.0),
        );
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn fold_maps_positions_into_primary_cell() {
        let cell = SimulationBox::cubic(10.0).unwrap();
        let folded = cell.fold(&Point3::new(-1.0, 12.0, 5.0));
        assert!((folded.x - 9.0).abs() < TOLERANCE);
        assert!((folded.y - 2.0).abs() < TOLERANCE);
        assert!((folded.z - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn volume_and_inscribed_radius_of_periodic_box() {
        let cell = SimulationBox::orthorhombic(8.0, 10.0, 12.0).unwrap();
        assert_eq!(cell.volume(), Some(960.0));
        assert_eq!(cell.inscribed_radius(), Some(4.0));
        assert_eq!(SimulationBox::NonPeriodic.volume(), None);
    }
}
