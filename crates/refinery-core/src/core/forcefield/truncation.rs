/// Truncation applied to the short-range part of every pair potential.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ShortRangeTruncation {
    /// Potential used as-is up to the range, then zero.
    None,
    /// Value and slope shifted so that both vanish at the range.
    #[default]
    Shifted,
    /// Smoothly tapered to zero over a strip of `width` Angstroms ending at the range.
    Cosine { width: f64 },
}

/// Truncation applied to the Coulomb part of every pair potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoulombTruncation {
    None,
    #[default]
    Shifted,
}

/// Truncation schemes shared by all pair potentials of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TruncationSettings {
    pub short_range: ShortRangeTruncation,
    pub coulomb: CoulombTruncation,
}

impl TruncationSettings {
    pub fn new(short_range: ShortRangeTruncation, coulomb: CoulombTruncation) -> Self {
        Self {
            short_range,
            coulomb,
        }
    }
}

/// Grid and physics options for tabulating a set of pair potentials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabulationSettings {
    /// Cutoff radius in Angstroms.
    pub range: f64,
    /// Grid spacing in Angstroms.
    pub delta: f64,
    /// Whether the atom type charges contribute a Coulomb term to the tabulated curve.
    pub include_coulomb: bool,
    pub truncation: TruncationSettings,
}

impl Default for TabulationSettings {
    fn default() -> Self {
        Self {
            range: 15.0,
            delta: 0.005,
            include_coulomb: true,
            truncation: TruncationSettings::default(),
        }
    }
}
