use super::params::{AtomType, ShortRangeForm};
use super::potentials::{
    coulomb, coulomb_derivative, cosine_taper, cosine_taper_derivative, lennard_jones_12_6,
    lennard_jones_12_6_derivative, shifted_coulomb, shifted_coulomb_derivative,
};
use super::truncation::{CoulombTruncation, ShortRangeTruncation, TruncationSettings};
use crate::core::utils::interpolation::Curve;
use thiserror::Error;
use tracing::{debug, warn};

/// Minimum number of grid points a tabulated potential must contain.
const MIN_POINTS: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum PairPotentialError {
    #[error("Pair potential has no atom type assigned to its {0} slot")]
    MissingAtomType(&'static str),

    #[error("Atom type '{0}' is not defined in the forcefield")]
    UnknownAtomType(String),

    #[error("Atom type index {index} is out of range for {n_types} type(s)")]
    TypeIndexOutOfRange { index: usize, n_types: usize },

    #[error("Atom type '{name}' uses the {form} form but defines no short-range parameters")]
    EmptyParameters { name: String, form: ShortRangeForm },

    #[error(
        "Atom type '{name}' uses the {form} form, which needs {expected} parameter(s), but only {found} were given"
    )]
    InsufficientParameters {
        name: String,
        form: ShortRangeForm,
        expected: usize,
        found: usize,
    },

    #[error(
        "Cannot combine short-range forms {form_i} ('{type_i}') and {form_j} ('{type_j}')"
    )]
    IncompatibleForms {
        type_i: String,
        form_i: ShortRangeForm,
        type_j: String,
        form_j: ShortRangeForm,
    },

    #[error("Pair potential {type_i}-{type_j} has not been tabulated")]
    NotTabulated { type_i: String, type_j: String },

    #[error(
        "Invalid tabulation grid: range {range} with spacing {delta} gives {n_points} point(s), at least 3 are required"
    )]
    InvalidGrid {
        range: f64,
        delta: f64,
        n_points: usize,
    },

    #[error(
        "Additional potential for {type_i}-{type_j} has {found} point(s) but the table has {expected}"
    )]
    AdditionalLengthMismatch {
        type_i: String,
        type_j: String,
        expected: usize,
        found: usize,
    },
}

/// The combined short-range interaction between two atom types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortRangeInteraction {
    None,
    LennardJones { epsilon: f64, sigma: f64 },
}

impl ShortRangeInteraction {
    /// Combines the short-range parameters of two atom types.
    ///
    /// Both Lennard-Jones types use Lorentz-Berthelot rules (`eps = sqrt(eps_i eps_j)`,
    /// `sigma = (sigma_i + sigma_j) / 2`); both geometric types take geometric means of both
    /// parameters; a mixed pair falls back to Lorentz-Berthelot. Any other mismatch is an error.
    pub fn combine(type_i: &AtomType, type_j: &AtomType) -> Result<Self, PairPotentialError> {
        use ShortRangeForm as F;

        let lorentz_berthelot = match (type_i.form, type_j.form) {
            (F::None, F::None) => return Ok(Self::None),
            (F::LennardJones, F::LennardJones) => true,
            (F::LennardJonesGeometric, F::LennardJonesGeometric) => false,
            (F::LennardJones, F::LennardJonesGeometric)
            | (F::LennardJonesGeometric, F::LennardJones) => {
                warn!(
                    type_i = %type_i.name,
                    type_j = %type_j.name,
                    "Mixed {} / {} short-range forms; defaulting to Lorentz-Berthelot rules.",
                    type_i.form,
                    type_j.form
                );
                true
            }
            _ => {
                return Err(PairPotentialError::IncompatibleForms {
                    type_i: type_i.name.clone(),
                    form_i: type_i.form,
                    type_j: type_j.name.clone(),
                    form_j: type_j.form,
                });
            }
        };

        let [eps_i, sigma_i] = lennard_jones_parameters(type_i)?;
        let [eps_j, sigma_j] = lennard_jones_parameters(type_j)?;
        let sigma = if lorentz_berthelot {
            0.5 * (sigma_i + sigma_j)
        } else {
            (sigma_i * sigma_j).sqrt()
        };
        Ok(Self::LennardJones {
            epsilon: (eps_i * eps_j).sqrt(),
            sigma,
        })
    }

    /// Untruncated energy.
    #[inline]
    pub fn energy(&self, r: f64) -> f64 {
        match *self {
            Self::None => 0.0,
            Self::LennardJones { epsilon, sigma } => lennard_jones_12_6(r, epsilon, sigma),
        }
    }

    /// Untruncated `dU/dr`.
    #[inline]
    pub fn force(&self, r: f64) -> f64 {
        match *self {
            Self::None => 0.0,
            Self::LennardJones { epsilon, sigma } => {
                lennard_jones_12_6_derivative(r, epsilon, sigma)
            }
        }
    }
}

fn lennard_jones_parameters(atom_type: &AtomType) -> Result<[f64; 2], PairPotentialError> {
    match atom_type.form {
        ShortRangeForm::None => Err(PairPotentialError::EmptyParameters {
            name: atom_type.name.clone(),
            form: atom_type.form,
        }),
        form => match atom_type.parameters.as_slice() {
            [] => Err(PairPotentialError::EmptyParameters {
                name: atom_type.name.clone(),
                form,
            }),
            [epsilon, sigma, ..] => Ok([*epsilon, *sigma]),
            short => Err(PairPotentialError::InsufficientParameters {
                name: atom_type.name.clone(),
                form,
                expected: form.n_parameters(),
                found: short.len(),
            }),
        },
    }
}

/// Energies and forces evaluated at the cutoff with no truncation applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CutoffValues {
    pub short_range_energy: f64,
    pub short_range_force: f64,
    pub coulomb_energy: f64,
    pub coulomb_force: f64,
}

/// A tabulated interaction between one unordered pair of atom types.
///
/// `u_original` holds the analytic (truncated) short-range plus Coulomb energy on the grid
/// `r = n * delta`, `u_additional` an externally refined correction, `u_full` their sum and
/// `du_full` its numerical derivative. Index 0 is never evaluated analytically and always holds ten
/// times the value at index 1.
///
/// All "force" quantities are `dU/dr`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairPotential {
    type_i: Option<AtomType>,
    type_j: Option<AtomType>,
    short_range: ShortRangeInteraction,
    charge_product: f64,
    truncation: TruncationSettings,
    include_coulomb: bool,
    range: f64,
    delta: f64,
    r_delta: f64,
    n_points: usize,
    cutoff: CutoffValues,
    u_original: Curve,
    u_additional: Curve,
    u_full: Curve,
    du_full: Curve,
}

impl PairPotential {
    /// An empty potential with no atom types assigned.
    pub fn new(truncation: TruncationSettings) -> Self {
        Self {
            type_i: None,
            type_j: None,
            short_range: ShortRangeInteraction::None,
            charge_product: 0.0,
            truncation,
            include_coulomb: false,
            range: 0.0,
            delta: 0.0,
            r_delta: 0.0,
            n_points: 0,
            cutoff: CutoffValues::default(),
            u_original: Curve::default(),
            u_additional: Curve::default(),
            u_full: Curve::default(),
            du_full: Curve::default(),
        }
    }

    /// A potential between two atom types with combined parameters, ready for tabulation.
    pub fn between(
        type_i: &AtomType,
        type_j: &AtomType,
        truncation: TruncationSettings,
    ) -> Result<Self, PairPotentialError> {
        let mut potential = Self::new(truncation);
        potential.set_atom_types(type_i, type_j)?;
        Ok(potential)
    }

    /// Assigns the atom types and combines their short-range parameters.
    pub fn set_atom_types(
        &mut self,
        type_i: &AtomType,
        type_j: &AtomType,
    ) -> Result<(), PairPotentialError> {
        self.short_range = ShortRangeInteraction::combine(type_i, type_j)?;
        self.charge_product = type_i.charge * type_j.charge;
        self.type_i = Some(type_i.clone());
        self.type_j = Some(type_j.clone());
        Ok(())
    }

    /// Names of the two atom types, once assigned.
    pub fn type_names(&self) -> Option<(&str, &str)> {
        match (&self.type_i, &self.type_j) {
            (Some(i), Some(j)) => Some((i.name.as_str(), j.name.as_str())),
            _ => None,
        }
    }

    /// Whether this potential describes the unordered pair `(a, b)`.
    pub fn involves(&self, a: &str, b: &str) -> bool {
        self.type_names()
            .is_some_and(|(i, j)| (i == a && j == b) || (i == b && j == a))
    }

    fn pair_label(&self) -> (String, String) {
        match self.type_names() {
            Some((i, j)) => (i.to_string(), j.to_string()),
            None => ("?".to_string(), "?".to_string()),
        }
    }

    /// Builds the tables on a grid of `floor(range / delta)` points.
    pub fn tabulate(
        &mut self,
        range: f64,
        delta: f64,
        include_coulomb: bool,
    ) -> Result<(), PairPotentialError> {
        if self.type_i.is_none() {
            return Err(PairPotentialError::MissingAtomType("first"));
        }
        if self.type_j.is_none() {
            return Err(PairPotentialError::MissingAtomType("second"));
        }

        let n_points = if range.is_finite() && delta.is_finite() && range > 0.0 && delta > 0.0 {
            (range / delta).floor() as usize
        } else {
            0
        };
        if n_points < MIN_POINTS {
            return Err(PairPotentialError::InvalidGrid {
                range,
                delta,
                n_points,
            });
        }

        self.range = range;
        self.delta = delta;
        self.r_delta = 1.0 / delta;
        self.n_points = n_points;
        self.include_coulomb = include_coulomb;

        self.cutoff = CutoffValues {
            short_range_energy: self.short_range.energy(range),
            short_range_force: self.short_range.force(range),
            coulomb_energy: coulomb(range, self.charge_product),
            coulomb_force: coulomb_derivative(range, self.charge_product),
        };

        self.u_original = Curve::uniform(n_points, delta);
        let energies: Vec<f64> = (1..n_points)
            .map(|n| self.analytic_energy(n as f64 * delta))
            .collect();
        let table = self.u_original.y_mut();
        table[1..].copy_from_slice(&energies);
        table[0] = 10.0 * table[1];

        self.u_additional = Curve::uniform(n_points, delta);
        self.update_full();

        if let Some((i, j)) = self.type_names() {
            debug!(
                type_i = i,
                type_j = j,
                n_points,
                range,
                delta,
                include_coulomb,
                "Tabulated pair potential."
            );
        }
        Ok(())
    }

    #[inline]
    pub fn is_tabulated(&self) -> bool {
        self.n_points >= MIN_POINTS
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.range
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn short_range(&self) -> &ShortRangeInteraction {
        &self.short_range
    }

    pub fn charge_product(&self) -> f64 {
        self.charge_product
    }

    pub fn includes_coulomb(&self) -> bool {
        self.include_coulomb
    }

    pub fn truncation(&self) -> &TruncationSettings {
        &self.truncation
    }

    pub fn cutoff_values(&self) -> &CutoffValues {
        &self.cutoff
    }

    pub fn u_original(&self) -> &Curve {
        &self.u_original
    }

    pub fn u_additional(&self) -> &Curve {
        &self.u_additional
    }

    pub fn u_full(&self) -> &Curve {
        &self.u_full
    }

    pub fn du_full(&self) -> &Curve {
        &self.du_full
    }

    /// Short-range energy at `r` under `scheme`, using the cutoff values of the last tabulation.
    pub fn analytic_short_range_energy(&self, r: f64, scheme: ShortRangeTruncation) -> f64 {
        let energy = self.short_range.energy(r);
        match scheme {
            ShortRangeTruncation::None => energy,
            ShortRangeTruncation::Shifted => {
                energy
                    - (r - self.range) * self.cutoff.short_range_force
                    - self.cutoff.short_range_energy
            }
            ShortRangeTruncation::Cosine { width } => {
                energy * cosine_taper(r, self.range, width)
            }
        }
    }

    /// Short-range `dU/dr` at `r` under `scheme`.
    pub fn analytic_short_range_force(&self, r: f64, scheme: ShortRangeTruncation) -> f64 {
        let force = self.short_range.force(r);
        match scheme {
            ShortRangeTruncation::None => force,
            ShortRangeTruncation::Shifted => force - self.cutoff.short_range_force,
            ShortRangeTruncation::Cosine { width } => {
                force * cosine_taper(r, self.range, width)
                    + self.short_range.energy(r) * cosine_taper_derivative(r, self.range, width)
            }
        }
    }

    /// Coulomb energy for charge product `qiqj` at `r` under `scheme`.
    pub fn analytic_coulomb_energy(&self, qiqj: f64, r: f64, scheme: CoulombTruncation) -> f64 {
        match scheme {
            CoulombTruncation::None => coulomb(r, qiqj),
            CoulombTruncation::Shifted => shifted_coulomb(r, qiqj, self.range),
        }
    }

    /// Coulomb `dU/dr` for charge product `qiqj` at `r` under `scheme`.
    pub fn analytic_coulomb_force(&self, qiqj: f64, r: f64, scheme: CoulombTruncation) -> f64 {
        match scheme {
            CoulombTruncation::None => coulomb_derivative(r, qiqj),
            CoulombTruncation::Shifted => shifted_coulomb_derivative(r, qiqj, self.range),
        }
    }

    /// Full analytic energy (short-range plus optional Coulomb) with this potential's truncation.
    pub fn analytic_energy(&self, r: f64) -> f64 {
        let mut energy = self.analytic_short_range_energy(r, self.truncation.short_range);
        if self.include_coulomb {
            energy += self.analytic_coulomb_energy(self.charge_product, r, self.truncation.coulomb);
        }
        energy
    }

    /// Full analytic `dU/dr` with this potential's truncation.
    pub fn analytic_force(&self, r: f64) -> f64 {
        let mut force = self.analytic_short_range_force(r, self.truncation.short_range);
        if self.include_coulomb {
            force += self.analytic_coulomb_force(self.charge_product, r, self.truncation.coulomb);
        }
        force
    }

    /// Interpolated energy from `u_full`; zero at and beyond the range.
    pub fn energy(&self, r: f64) -> Result<f64, PairPotentialError> {
        self.ensure_tabulated()?;
        Ok(self.lookup_energy(r))
    }

    /// Interpolated `dU/dr` from `du_full`; zero at and beyond the range.
    pub fn force(&self, r: f64) -> Result<f64, PairPotentialError> {
        self.ensure_tabulated()?;
        Ok(self.lookup_force(r))
    }

    #[inline]
    pub(crate) fn lookup_energy(&self, r: f64) -> f64 {
        if r >= self.range {
            return 0.0;
        }
        self.u_full.interpolate_index(r * self.r_delta)
    }

    #[inline]
    pub(crate) fn lookup_force(&self, r: f64) -> f64 {
        if r >= self.range {
            return 0.0;
        }
        self.du_full.interpolate_index(r * self.r_delta)
    }

    fn ensure_tabulated(&self) -> Result<(), PairPotentialError> {
        if self.is_tabulated() {
            Ok(())
        } else {
            let (type_i, type_j) = self.pair_label();
            Err(PairPotentialError::NotTabulated { type_i, type_j })
        }
    }

    /// Replaces the additional potential with `values`, given on this potential's grid.
    pub fn set_u_additional(&mut self, values: &[f64]) -> Result<(), PairPotentialError> {
        self.ensure_tabulated()?;
        if values.len() != self.n_points {
            let (type_i, type_j) = self.pair_label();
            return Err(PairPotentialError::AdditionalLengthMismatch {
                type_i,
                type_j,
                expected: self.n_points,
                found: values.len(),
            });
        }
        self.u_additional.y_mut().copy_from_slice(values);
        self.update_full();
        Ok(())
    }

    /// Adds `factor` times `data`, interpolated onto this potential's grid, to the additional
    /// potential.
    pub fn adjust_u_additional(
        &mut self,
        data: &Curve,
        factor: f64,
    ) -> Result<(), PairPotentialError> {
        self.ensure_tabulated()?;
        self.u_additional.add_interpolated(data, factor);
        self.update_full();
        Ok(())
    }

    /// Zeroes the additional potential.
    pub fn reset_u_additional(&mut self) {
        self.u_additional.y_mut().fill(0.0);
        if self.is_tabulated() {
            self.update_full();
        }
    }

    fn update_full(&mut self) {
        let mut full = self.u_original.clone();
        for (u, additional) in full.y_mut().iter_mut().zip(self.u_additional.y()) {
            *u += additional;
        }
        self.u_full = full;
        self.calculate_du_full();
    }

    /// Numerical derivative of `u_full`: five-point central differences in the interior,
    /// three-point next to each end, `10 x du[1]` at the origin and a copy of the neighbour at the
    /// last point.
    fn calculate_du_full(&mut self) {
        let u = self.u_full.y();
        let n = u.len();
        let mut du = Curve::uniform(n, self.delta);
        {
            let d = du.y_mut();
            for i in 1..n - 1 {
                d[i] = if i == 1 || i == n - 2 {
                    (u[i + 1] - u[i - 1]) / (2.0 * self.delta)
                } else {
                    (-u[i + 2] + 8.0 * u[i + 1] - 8.0 * u[i - 1] + u[i - 2]) / (12.0 * self.delta)
                };
            }
            d[0] = 10.0 * d[1];
            d[n - 1] = d[n - 2];
        }
        self.du_full = du;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lj_type(name: &str, epsilon: f64, sigma: f64) -> AtomType {
        AtomType::new(name, ShortRangeForm::LennardJones, vec![epsilon, sigma], 0.0)
    }

    fn shifted() -> TruncationSettings {
        TruncationSettings::new(ShortRangeTruncation::Shifted, CoulombTruncation::Shifted)
    }

    fn untruncated() -> TruncationSettings {
        TruncationSettings::new(ShortRangeTruncation::None, CoulombTruncation::None)
    }

    #[test]
    fn lorentz_berthelot_combination() {
        let a = lj_type("A", 1.0, 1.0);
        let b = lj_type("B", 4.0, 3.0);
        assert_eq!(
            ShortRangeInteraction::combine(&a, &b).unwrap(),
            ShortRangeInteraction::LennardJones {
                epsilon: 2.0,
                sigma: 2.0
            }
        );
    }

    #[test]
    fn geometric_combination_uses_geometric_means() {
        let a = AtomType::new("A", ShortRangeForm::LennardJonesGeometric, vec![1.0, 1.0], 0.0);
        let b = AtomType::new("B", ShortRangeForm::LennardJonesGeometric, vec![4.0, 4.0], 0.0);
        assert_eq!(
            ShortRangeInteraction::combine(&a, &b).unwrap(),
            ShortRangeInteraction::LennardJones {
                epsilon: 2.0,
                sigma: 2.0
            }
        );
    }

    #[test]
    fn mixed_lennard_jones_forms_fall_back_to_lorentz_berthelot() {
        let a = lj_type("A", 1.0, 1.0);
        let b = AtomType::new("B", ShortRangeForm::LennardJonesGeometric, vec![4.0, 3.0], 0.0);
        assert_eq!(
            ShortRangeInteraction::combine(&a, &b).unwrap(),
            ShortRangeInteraction::LennardJones {
                epsilon: 2.0,
                sigma: 2.0
            }
        );
    }

    #[test]
    fn mismatched_forms_are_rejected() {
        let a = lj_type("A", 1.0, 1.0);
        let b = AtomType::new("B", ShortRangeForm::None, vec![], 1.0);
        assert_eq!(
            ShortRangeInteraction::combine(&a, &b),
            Err(PairPotentialError::IncompatibleForms {
                type_i: "A".to_string(),
                form_i: ShortRangeForm::LennardJones,
                type_j: "B".to_string(),
                form_j: ShortRangeForm::None,
            })
        );
    }

    #[test]
    fn empty_parameters_are_rejected() {
        let a = lj_type("A", 1.0, 1.0);
        let b = AtomType::new("B", ShortRangeForm::LennardJones, vec![], 0.0);
        assert!(matches!(
            ShortRangeInteraction::combine(&a, &b),
            Err(PairPotentialError::EmptyParameters { .. })
        ));
    }

    #[test]
    fn two_none_types_have_no_short_range_interaction() {
        let a = AtomType::new("A", ShortRangeForm::None, vec![], 1.0);
        let b = AtomType::new("B", ShortRangeForm::None, vec![], -1.0);
        assert_eq!(
            ShortRangeInteraction::combine(&a, &b).unwrap(),
            ShortRangeInteraction::None
        );
    }

    #[test]
    fn tabulate_fails_without_atom_types() {
        let mut potential = PairPotential::new(shifted());
        assert_eq!(
            potential.tabulate(10.0, 0.01, false),
            Err(PairPotentialError::MissingAtomType("first"))
        );
    }

    #[test]
    fn tabulate_rejects_degenerate_grids() {
        let a = lj_type("A", 1.0, 1.0);
        let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
        assert!(matches!(
            potential.tabulate(0.025, 0.01, false),
            Err(PairPotentialError::InvalidGrid { n_points: 2, .. })
        ));
        assert!(matches!(
            potential.tabulate(10.0, 0.0, false),
            Err(PairPotentialError::InvalidGrid { .. })
        ));
        assert!(!potential.is_tabulated());
    }

    #[test]
    fn lookups_fail_before_tabulation() {
        let a = lj_type("A", 1.0, 1.0);
        let potential = PairPotential::between(&a, &a, shifted()).unwrap();
        assert!(matches!(
            potential.energy(1.0),
            Err(PairPotentialError::NotTabulated { .. })
        ));
        assert!(matches!(
            potential.force(1.0),
            Err(PairPotentialError::NotTabulated { .. })
        ));
    }

    #[test]
    fn tabulated_grid_size_and_origin_convention() {
        let a = lj_type("A", 0.5, 3.0);
        let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
        let (range, delta) = (12.0, 0.05);
        potential.tabulate(range, delta, false).unwrap();

        assert_eq!(potential.n_points(), (range / delta).floor() as usize);
        assert_eq!(potential.u_full().len(), potential.n_points());
        assert_eq!(potential.u_full().value(0), 10.0 * potential.u_full().value(1));
        assert_eq!(potential.du_full().value(0), 10.0 * potential.du_full().value(1));
        let last = potential.n_points() - 1;
        assert_eq!(potential.du_full().value(last), potential.du_full().value(last - 1));
        assert!(potential.u_additional().y().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn shifted_short_range_energy_and_force_vanish_at_range() {
        for (epsilon, sigma) in [(1.0, 1.0), (0.5, 3.0), (0.238, 3.4)] {
            let a = lj_type("A", epsilon, sigma);
            let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
            potential.tabulate(10.0, 0.01, false).unwrap();
            let range = potential.range();
            assert!(
                potential
                    .analytic_short_range_energy(range, ShortRangeTruncation::Shifted)
                    .abs()
                    < 1e-15
            );
            assert!(
                potential
                    .analytic_short_range_force(range, ShortRangeTruncation::Shifted)
                    .abs()
                    < 1e-15
            );
        }
    }

    #[test]
    fn shifted_coulomb_energy_is_exactly_zero_at_range() {
        let a = AtomType::new("A", ShortRangeForm::None, vec![], 0.8);
        let b = AtomType::new("B", ShortRangeForm::None, vec![], -0.4);
        let mut potential = PairPotential::between(&a, &b, shifted()).unwrap();
        potential.tabulate(9.7, 0.01, true).unwrap();
        for qiqj in [-3.0, -0.32, 0.5, 2.25] {
            assert_eq!(
                potential.analytic_coulomb_energy(qiqj, 9.7, CoulombTruncation::Shifted),
                0.0
            );
            assert_eq!(
                potential.analytic_coulomb_force(qiqj, 9.7, CoulombTruncation::Shifted),
                0.0
            );
        }
    }

    #[test]
    fn lennard_jones_minimum_is_minus_epsilon() {
        let a = lj_type("A", 1.0, 1.0);
        let potential = PairPotential::between(&a, &a, untruncated()).unwrap();
        let r_min = 2.0f64.powf(1.0 / 6.0);
        let energy = potential.analytic_short_range_energy(r_min, ShortRangeTruncation::None);
        let force = potential.analytic_short_range_force(r_min, ShortRangeTruncation::None);
        assert!((energy + 1.0).abs() < 1e-12);
        assert!(force.abs() < 1e-12);
    }

    #[test]
    fn numerical_derivative_matches_analytic_force() {
        let a = lj_type("A", 1.0, 1.0);
        let mut potential = PairPotential::between(&a, &a, untruncated()).unwrap();
        potential.tabulate(15.0, 0.01, false).unwrap();

        let n_points = potential.n_points();
        for n in 2..n_points - 2 {
            let r = n as f64 * potential.delta();
            if r < 0.9 {
                continue;
            }
            let analytic = potential.analytic_force(r);
            let numerical = potential.du_full().value(n);
            if analytic.abs() >= 1.0 {
                assert!(
                    ((numerical - analytic) / analytic).abs() < 1e-3,
                    "r = {r}: numerical {numerical} vs analytic {analytic}"
                );
            } else {
                assert!(
                    (numerical - analytic).abs() < 1e-3,
                    "r = {r}: numerical {numerical} vs analytic {analytic}"
                );
            }
        }
    }

    #[test]
    fn cosine_truncation_derivative_uses_product_rule() {
        let a = lj_type("A", 1.0, 1.0);
        let settings = TruncationSettings::new(
            ShortRangeTruncation::Cosine { width: 1.0 },
            CoulombTruncation::None,
        );
        let mut potential = PairPotential::between(&a, &a, settings).unwrap();
        potential.tabulate(2.5, 0.001, false).unwrap();

        for n in [1600, 1800, 2000, 2200, 2400] {
            let r = n as f64 * potential.delta();
            let analytic = potential.analytic_force(r);
            let numerical = potential.du_full().value(n);
            assert!(
                (numerical - analytic).abs() < 1e-6,
                "r = {r}: numerical {numerical} vs analytic {analytic}"
            );
        }
        assert!(potential.analytic_energy(2.5).abs() < 1e-15);
    }

    #[test]
    fn shifted_lennard_jones_end_to_end() {
        let a = lj_type("A", 0.5, 3.0);
        let b = lj_type("B", 0.5, 3.0);
        let mut potential = PairPotential::between(&a, &b, shifted()).unwrap();
        potential.tabulate(12.0, 0.05, false).unwrap();

        assert_eq!(potential.energy(12.0).unwrap(), 0.0);
        assert_eq!(potential.force(12.0).unwrap(), 0.0);
        let r_min = 3.0 * 2.0f64.powf(1.0 / 6.0);
        let energy = potential.energy(r_min).unwrap();
        assert!((energy + 0.5).abs() < 0.01, "energy at minimum was {energy}");
        assert!(potential.force(r_min).unwrap().abs() < 0.01);
    }

    #[test]
    fn interpolated_energy_tracks_analytic_energy() {
        let a = lj_type("A", 0.5, 3.0);
        let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
        potential.tabulate(12.0, 0.01, false).unwrap();
        for r in [2.9, 3.3, 4.1, 6.75, 10.0] {
            let exact = potential.analytic_energy(r);
            assert!((potential.energy(r).unwrap() - exact).abs() < 1e-4);
        }
    }

    #[test]
    fn coulomb_contributes_only_when_included() {
        let a = AtomType::new("A", ShortRangeForm::None, vec![], 1.0);
        let b = AtomType::new("B", ShortRangeForm::None, vec![], -1.0);
        let mut with = PairPotential::between(&a, &b, shifted()).unwrap();
        with.tabulate(10.0, 0.01, true).unwrap();
        let mut without = PairPotential::between(&a, &b, shifted()).unwrap();
        without.tabulate(10.0, 0.01, false).unwrap();

        assert!(with.energy(3.0).unwrap() < 0.0);
        assert_eq!(without.energy(3.0).unwrap(), 0.0);
        assert_eq!(with.charge_product(), -1.0);
    }

    #[test]
    fn additional_potential_updates_full_and_derivative() {
        let a = lj_type("A", 0.5, 3.0);
        let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
        potential.tabulate(10.0, 0.1, false).unwrap();
        let original = potential.u_full().clone();
        let original_derivative = potential.du_full().clone();

        let correction = Curve::new(vec![0.0, 10.0], vec![0.25, 0.25]).unwrap();
        potential.adjust_u_additional(&correction, 2.0).unwrap();
        for n in 25..potential.n_points() {
            assert!((potential.u_full().value(n) - original.value(n) - 0.5).abs() < 1e-12);
        }
        let mid = potential.n_points() / 2;
        assert!(
            (potential.du_full().value(mid) - original_derivative.value(mid)).abs() < 1e-9
        );

        potential.reset_u_additional();
        assert_eq!(potential.u_full(), &original);
    }

    #[test]
    fn set_additional_requires_matching_grid() {
        let a = lj_type("A", 0.5, 3.0);
        let mut potential = PairPotential::between(&a, &a, shifted()).unwrap();
        potential.tabulate(10.0, 0.1, false).unwrap();
        assert!(matches!(
            potential.set_u_additional(&[1.0, 2.0]),
            Err(PairPotentialError::AdditionalLengthMismatch { found: 2, .. })
        ));

        let values = vec![1.0; potential.n_points()];
        potential.set_u_additional(&values).unwrap();
        assert!(
            (potential.u_full().value(50) - potential.u_original().value(50) - 1.0).abs() < 1e-12
        );
    }
}
