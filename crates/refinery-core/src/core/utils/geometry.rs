use nalgebra::{Rotation3, Unit, Vector3};

const DEGENERATE_AXIS_NORM: f64 = 1e-12;

/// Builds a rotation of `angle_degrees` about `axis`.
///
/// Returns `None` when the axis has (numerically) zero length, e.g. for the normal of a linear
/// angle, where no unique rotation axis exists.
pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Option<Rotation3<f64>> {
    Unit::try_new(*axis, DEGENERATE_AXIS_NORM)
        .map(|unit| Rotation3::from_axis_angle(&unit, angle_degrees.to_radians()))
}

/// Angle between two vectors in degrees, in `[0, 180]`.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denominator = a.norm() * b.norm();
    if denominator < DEGENERATE_AXIS_NORM {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Dihedral angle in degrees, in `(-180, 180]`, defined by the three consecutive bond vectors
/// `b1 = j - i`, `b2 = k - j`, `b3 = l - k`.
pub fn dihedral_angle(b1: &Vector3<f64>, b2: &Vector3<f64>, b3: &Vector3<f64>) -> f64 {
    let m = b1.cross(b2);
    let n = b2.cross(b3);
    let y = b2.norm() * b1.dot(&n);
    let x = m.dot(&n);
    y.atan2(x).to_degrees()
}
