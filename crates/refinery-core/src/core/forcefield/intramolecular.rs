//! Bonded (intramolecular) functional forms.
//!
//! Bond energies are functions of the bond length in Angstroms. Angle and torsion energies take
//! their geometric argument in degrees, but their derivatives are always reported per radian so
//! that they combine directly with Cartesian gradients of the angle.

use phf::phf_map;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Unrecognised {kind} functional form '{keyword}'")]
    UnknownKeyword { kind: &'static str, keyword: String },

    #[error(
        "{kind} form '{keyword}' requires {expected} parameter(s), but {found} were supplied"
    )]
    ParameterCount {
        kind: &'static str,
        keyword: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondKeyword {
    None,
    Harmonic,
    Morse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AngleKeyword {
    None,
    Harmonic,
    Cosine,
    Cos2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TorsionKeyword {
    None,
    Cosine,
    Cos3,
    Cos3C,
    UffCosine,
}

static BOND_KEYWORDS: phf::Map<&'static str, BondKeyword> = phf_map! {
    "none" => BondKeyword::None,
    "harmonic" => BondKeyword::Harmonic,
    "morse" => BondKeyword::Morse,
};

static ANGLE_KEYWORDS: phf::Map<&'static str, AngleKeyword> = phf_map! {
    "none" => AngleKeyword::None,
    "harmonic" => AngleKeyword::Harmonic,
    "cos" => AngleKeyword::Cosine,
    "cosine" => AngleKeyword::Cosine,
    "cos2" => AngleKeyword::Cos2,
};

static TORSION_KEYWORDS: phf::Map<&'static str, TorsionKeyword> = phf_map! {
    "none" => TorsionKeyword::None,
    "cos" => TorsionKeyword::Cosine,
    "cosine" => TorsionKeyword::Cosine,
    "cos3" => TorsionKeyword::Cos3,
    "cos3c" => TorsionKeyword::Cos3C,
    "uffcosine" => TorsionKeyword::UffCosine,
};

fn lookup<T: Copy>(
    table: &phf::Map<&'static str, T>,
    kind: &'static str,
    keyword: &str,
) -> Result<T, FormError> {
    table
        .get(keyword.to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| FormError::UnknownKeyword {
            kind,
            keyword: keyword.to_string(),
        })
}

fn take<const N: usize>(
    kind: &'static str,
    keyword: &str,
    parameters: &[f64],
) -> Result<[f64; N], FormError> {
    parameters
        .try_into()
        .map_err(|_| FormError::ParameterCount {
            kind,
            keyword: keyword.to_string(),
            expected: N,
            found: parameters.len(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BondForm {
    #[default]
    None,
    /// `U = 0.5 k (r - eq)^2`
    Harmonic { k: f64, eq: f64 },
    /// `U = D (1 - exp(-alpha (r - eq)))^2`
    Morse { d: f64, alpha: f64, eq: f64 },
}

impl BondForm {
    /// Parameters: Harmonic `[k, eq]`, Morse `[D, alpha, eq]`.
    pub fn from_keyword(keyword: &str, parameters: &[f64]) -> Result<Self, FormError> {
        const KIND: &str = "bond";
        Ok(match lookup(&BOND_KEYWORDS, KIND, keyword)? {
            BondKeyword::None => Self::None,
            BondKeyword::Harmonic => {
                let [k, eq] = take(KIND, keyword, parameters)?;
                Self::Harmonic { k, eq }
            }
            BondKeyword::Morse => {
                let [d, alpha, eq] = take(KIND, keyword, parameters)?;
                Self::Morse { d, alpha, eq }
            }
        })
    }

    pub fn energy(&self, r: f64) -> f64 {
        match *self {
            Self::None => 0.0,
            Self::Harmonic { k, eq } => 0.5 * k * (r - eq).powi(2),
            Self::Morse { d, alpha, eq } => d * (1.0 - (-alpha * (r - eq)).exp()).powi(2),
        }
    }

    /// `dU/dr`
    pub fn derivative(&self, r: f64) -> f64 {
        match *self {
            Self::None => 0.0,
            Self::Harmonic { k, eq } => k * (r - eq),
            Self::Morse { d, alpha, eq } => {
                let decay = (-alpha * (r - eq)).exp();
                2.0 * d * alpha * decay * (1.0 - decay)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AngleForm {
    #[default]
    None,
    /// `U = 0.5 k (theta - eq)^2`, with the difference taken in radians.
    Harmonic { k: f64, eq: f64 },
    /// `U = k (1 + s cos(n theta - eq))`
    Cosine { k: f64, n: f64, eq: f64, s: f64 },
    /// `U = k (C0 + C1 cos(theta) + C2 cos(2 theta))`
    Cos2 { k: f64, c0: f64, c1: f64, c2: f64 },
}

impl AngleForm {
    /// Parameters: Harmonic `[k, eq]`, Cosine `[k, n, eq, s]`, Cos2 `[k, C0, C1, C2]`.
    pub fn from_keyword(keyword: &str, parameters: &[f64]) -> Result<Self, FormError> {
        const KIND: &str = "angle";
        Ok(match lookup(&ANGLE_KEYWORDS, KIND, keyword)? {
            AngleKeyword::None => Self::None,
            AngleKeyword::Harmonic => {
                let [k, eq] = take(KIND, keyword, parameters)?;
                Self::Harmonic { k, eq }
            }
            AngleKeyword::Cosine => {
                let [k, n, eq, s] = take(KIND, keyword, parameters)?;
                Self::Cosine { k, n, eq, s }
            }
            AngleKeyword::Cos2 => {
                let [k, c0, c1, c2] = take(KIND, keyword, parameters)?;
                Self::Cos2 { k, c0, c1, c2 }
            }
        })
    }

    pub fn energy(&self, theta_degrees: f64) -> f64 {
        let theta = theta_degrees.to_radians();
        match *self {
            Self::None => 0.0,
            Self::Harmonic { k, eq } => 0.5 * k * (theta - eq.to_radians()).powi(2),
            Self::Cosine { k, n, eq, s } => k * (1.0 + s * (n * theta - eq.to_radians()).cos()),
            Self::Cos2 { k, c0, c1, c2 } => {
                k * (c0 + c1 * theta.cos() + c2 * (2.0 * theta).cos())
            }
        }
    }

    /// `dU/dtheta` per radian.
    pub fn derivative(&self, theta_degrees: f64) -> f64 {
        let theta = theta_degrees.to_radians();
        match *self {
            Self::None => 0.0,
            Self::Harmonic { k, eq } => k * (theta - eq.to_radians()),
            Self::Cosine { k, n, eq, s } => -k * s * n * (n * theta - eq.to_radians()).sin(),
            Self::Cos2 { k, c1, c2, .. } => {
                -k * (c1 * theta.sin() + 2.0 * c2 * (2.0 * theta).sin())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TorsionForm {
    #[default]
    None,
    /// `U = k (1 + s cos(n phi - eq))`
    Cosine { k: f64, n: f64, eq: f64, s: f64 },
    /// `U = 0.5 (k1 (1 + cos phi) + k2 (1 - cos 2phi) + k3 (1 + cos 3phi))`
    Cos3 { k1: f64, k2: f64, k3: f64 },
    /// As [`TorsionForm::Cos3`] plus a constant `k0`.
    Cos3C { k0: f64, k1: f64, k2: f64, k3: f64 },
    /// `U = 0.5 k (1 - cos(n eq) cos(n phi))`
    UffCosine { k: f64, n: f64, eq: f64 },
}

impl TorsionForm {
    /// Parameters: Cosine `[k, n, eq, s]`, Cos3 `[k1, k2, k3]`, Cos3C `[k0, k1, k2, k3]`,
    /// UFFCosine `[k, n, eq]`.
    pub fn from_keyword(keyword: &str, parameters: &[f64]) -> Result<Self, FormError> {
        const KIND: &str = "torsion";
        Ok(match lookup(&TORSION_KEYWORDS, KIND, keyword)? {
            TorsionKeyword::None => Self::None,
            TorsionKeyword::Cosine => {
                let [k, n, eq, s] = take(KIND, keyword, parameters)?;
                Self::Cosine { k, n, eq, s }
            }
            TorsionKeyword::Cos3 => {
                let [k1, k2, k3] = take(KIND, keyword, parameters)?;
                Self::Cos3 { k1, k2, k3 }
            }
            TorsionKeyword::Cos3C => {
                let [k0, k1, k2, k3] = take(KIND, keyword, parameters)?;
                Self::Cos3C { k0, k1, k2, k3 }
            }
            TorsionKeyword::UffCosine => {
                let [k, n, eq] = take(KIND, keyword, parameters)?;
                Self::UffCosine { k, n, eq }
            }
        })
    }

    pub fn energy(&self, phi_degrees: f64) -> f64 {
        let phi = phi_degrees.to_radians();
        match *self {
            Self::None => 0.0,
            Self::Cosine { k, n, eq, s } => k * (1.0 + s * (n * phi - eq.to_radians()).cos()),
            Self::Cos3 { k1, k2, k3 } => cos3(k1, k2, k3, phi),
            Self::Cos3C { k0, k1, k2, k3 } => k0 + cos3(k1, k2, k3, phi),
            Self::UffCosine { k, n, eq } => {
                0.5 * k * (1.0 - (n * eq.to_radians()).cos() * (n * phi).cos())
            }
        }
    }

    /// `dU/dphi` per radian.
    pub fn derivative(&self, phi_degrees: f64) -> f64 {
        let phi = phi_degrees.to_radians();
        match *self {
            Self::None => 0.0,
            Self::Cosine { k, n, eq, s } => -k * s * n * (n * phi - eq.to_radians()).sin(),
            Self::Cos3 { k1, k2, k3 } | Self::Cos3C { k1, k2, k3, .. } => {
                0.5 * (-k1 * phi.sin() + 2.0 * k2 * (2.0 * phi).sin() - 3.0 * k3 * (3.0 * phi).sin())
            }
            Self::UffCosine { k, n, eq } => {
                0.5 * k * (n * eq.to_radians()).cos() * n * (n * phi).sin()
            }
        }
    }
}

#[inline]
fn cos3(k1: f64, k2: f64, k3: f64, phi: f64) -> f64 {
    0.5 * (k1 * (1.0 + phi.cos()) + k2 * (1.0 - (2.0 * phi).cos()) + k3 * (1.0 + (3.0 * phi).cos()))
}
