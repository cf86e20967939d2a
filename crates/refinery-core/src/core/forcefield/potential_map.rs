use super::pair_potential::{PairPotential, PairPotentialError, ShortRangeInteraction};
use super::params::Forcefield;
use super::truncation::TabulationSettings;
use crate::core::utils::interpolation::Curve;
use tracing::{debug, info};

/// Type-pair lookup over the tabulated potentials of one configuration.
///
/// Types are addressed by their index in the configuration's atom type list. Every unordered pair
/// maps to exactly one [`PairPotential`]; `lookup[i * n + j] == lookup[j * n + i]`.
#[derive(Debug, Clone)]
pub struct PotentialMap {
    type_names: Vec<String>,
    potentials: Vec<PairPotential>,
    lookup: Vec<usize>,
    settings: TabulationSettings,
}

impl PotentialMap {
    /// Tabulates a fresh potential for every unordered pair of `type_names`.
    pub fn build(
        forcefield: &Forcefield,
        type_names: &[String],
        settings: &TabulationSettings,
    ) -> Result<Self, PairPotentialError> {
        Self::build_with(&[], forcefield, type_names, settings)
    }

    /// Like [`PotentialMap::build`], but reuses any potential in `existing` that describes the same
    /// type pair with the same combined parameters and charges on the same grid, keeping its
    /// additional potential.
    pub fn build_with(
        existing: &[PairPotential],
        forcefield: &Forcefield,
        type_names: &[String],
        settings: &TabulationSettings,
    ) -> Result<Self, PairPotentialError> {
        let n_types = type_names.len();
        let mut potentials = Vec::with_capacity(n_types * (n_types + 1) / 2);
        let mut lookup = vec![0; n_types * n_types];
        let mut reused = 0;

        for i in 0..n_types {
            for j in i..n_types {
                let (name_i, name_j) = (&type_names[i], &type_names[j]);
                let type_i = forcefield
                    .atom_type(name_i)
                    .ok_or_else(|| PairPotentialError::UnknownAtomType(name_i.clone()))?;
                let type_j = forcefield
                    .atom_type(name_j)
                    .ok_or_else(|| PairPotentialError::UnknownAtomType(name_j.clone()))?;
                let short_range = ShortRangeInteraction::combine(type_i, type_j)?;
                let charge_product = type_i.charge * type_j.charge;

                let potential = match existing.iter().find(|p| {
                    p.involves(name_i, name_j)
                        && *p.short_range() == short_range
                        && p.charge_product() == charge_product
                        && matches_grid(p, settings)
                }) {
                    Some(found) => {
                        reused += 1;
                        found.clone()
                    }
                    None => {
                        let mut potential =
                            PairPotential::between(type_i, type_j, settings.truncation)?;
                        potential.tabulate(
                            settings.range,
                            settings.delta,
                            settings.include_coulomb,
                        )?;
                        potential
                    }
                };

                lookup[i * n_types + j] = potentials.len();
                lookup[j * n_types + i] = potentials.len();
                potentials.push(potential);
            }
        }

        info!(
            n_types,
            n_potentials = potentials.len(),
            reused,
            range = settings.range,
            delta = settings.delta,
            "Pair potentials ready."
        );

        Ok(Self {
            type_names: type_names.to_vec(),
            potentials,
            lookup,
            settings: *settings,
        })
    }

    #[inline]
    pub fn n_types(&self) -> usize {
        self.type_names.len()
    }

    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.type_names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.settings.range
    }

    pub fn settings(&self) -> &TabulationSettings {
        &self.settings
    }

    /// The potential between types `i` and `j` (in either order).
    ///
    /// # Panics
    ///
    /// Panics if either index is not below [`PotentialMap::n_types`].
    #[inline]
    pub fn potential(&self, i: usize, j: usize) -> &PairPotential {
        &self.potentials[self.lookup[i * self.type_names.len() + j]]
    }

    pub fn potentials(&self) -> &[PairPotential] {
        &self.potentials
    }

    /// Interpolated energy between types `i` and `j` at distance `r`.
    #[inline]
    pub fn energy(&self, i: usize, j: usize, r: f64) -> f64 {
        self.potential(i, j).lookup_energy(r)
    }

    /// Interpolated `dU/dr` between types `i` and `j` at distance `r`.
    #[inline]
    pub fn force(&self, i: usize, j: usize, r: f64) -> f64 {
        self.potential(i, j).lookup_force(r)
    }

    /// Analytic energy between types `i` and `j`; zero at and beyond the range.
    pub fn analytic_energy(&self, i: usize, j: usize, r: f64) -> f64 {
        if r >= self.range() {
            return 0.0;
        }
        self.potential(i, j).analytic_energy(r)
    }

    /// Analytic `dU/dr` between types `i` and `j`; zero at and beyond the range.
    pub fn analytic_force(&self, i: usize, j: usize, r: f64) -> f64 {
        if r >= self.range() {
            return 0.0;
        }
        self.potential(i, j).analytic_force(r)
    }

    fn potential_mut(&mut self, i: usize, j: usize) -> Result<&mut PairPotential, PairPotentialError> {
        let n_types = self.type_names.len();
        if let Some(&index) = [i, j].iter().find(|&&index| index >= n_types) {
            return Err(PairPotentialError::TypeIndexOutOfRange { index, n_types });
        }
        Ok(&mut self.potentials[self.lookup[i * n_types + j]])
    }

    pub fn set_u_additional(
        &mut self,
        i: usize,
        j: usize,
        values: &[f64],
    ) -> Result<(), PairPotentialError> {
        self.potential_mut(i, j)?.set_u_additional(values)
    }

    pub fn adjust_u_additional(
        &mut self,
        i: usize,
        j: usize,
        data: &Curve,
        factor: f64,
    ) -> Result<(), PairPotentialError> {
        self.potential_mut(i, j)?.adjust_u_additional(data, factor)
    }

    pub fn reset_u_additional(&mut self, i: usize, j: usize) -> Result<(), PairPotentialError> {
        self.potential_mut(i, j)?.reset_u_additional();
        Ok(())
    }

    /// Replaces the additional potential between `i` and `j` with `data` interpolated onto the
    /// table grid.
    pub fn replace_u_additional(
        &mut self,
        i: usize,
        j: usize,
        data: &Curve,
    ) -> Result<(), PairPotentialError> {
        let potential = self.potential_mut(i, j)?;
        potential.reset_u_additional();
        potential.adjust_u_additional(data, 1.0)?;
        if let Some((name_i, name_j)) = potential.type_names() {
            debug!(
                type_i = name_i,
                type_j = name_j,
                n_points = data.len(),
                "Replaced additional potential."
            );
        }
        Ok(())
    }

    pub fn reset_all_u_additional(&mut self) {
        for potential in &mut self.potentials {
            potential.reset_u_additional();
        }
    }
}

fn matches_grid(potential: &PairPotential, settings: &TabulationSettings) -> bool {
    potential.is_tabulated()
        && potential.range() == settings.range
        && potential.delta() == settings.delta
        && potential.includes_coulomb() == settings.include_coulomb
        && *potential.truncation() == settings.truncation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{AtomType, ShortRangeForm};

    fn forcefield() -> Forcefield {
        let mut forcefield = Forcefield::new();
        forcefield.insert(AtomType::new(
            "OW",
            ShortRangeForm::LennardJones,
            vec![0.65, 3.166],
            -0.82,
        ));
        forcefield.insert(AtomType::new(
            "Ar",
            ShortRangeForm::LennardJones,
            vec![0.99, 3.4],
            0.0,
        ));
        forcefield.insert(AtomType::new("HW", ShortRangeForm::None, vec![], 0.41));
        forcefield
    }

    fn settings() -> TabulationSettings {
        TabulationSettings {
            range: 10.0,
            delta: 0.01,
            ..TabulationSettings::default()
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn build_creates_one_potential_per_unordered_pair() {
        let map = PotentialMap::build(&forcefield(), &names(&["OW", "Ar"]), &settings()).unwrap();
        assert_eq!(map.n_types(), 2);
        assert_eq!(map.potentials().len(), 3);
        assert!(map.potential(0, 1).involves("OW", "Ar"));
        assert!(std::ptr::eq(map.potential(0, 1), map.potential(1, 0)));
        assert!(map.potentials().iter().all(PairPotential::is_tabulated));
    }

    #[test]
    fn lookups_are_symmetric_and_match_the_underlying_potential() {
        let map = PotentialMap::build(&forcefield(), &names(&["OW", "Ar"]), &settings()).unwrap();
        for r in [2.9, 3.5, 6.25] {
            assert_eq!(map.energy(0, 1, r), map.energy(1, 0, r));
            assert_eq!(map.energy(0, 1, r), map.potential(0, 1).energy(r).unwrap());
            assert_eq!(map.force(1, 1, r), map.potential(1, 1).force(r).unwrap());
        }
        assert_eq!(map.analytic_energy(0, 0, 10.0), 0.0);
        assert_eq!(map.energy(0, 0, 11.0), 0.0);
    }

    #[test]
    fn build_fails_for_type_missing_from_forcefield() {
        let result = PotentialMap::build(&forcefield(), &names(&["OW", "Xe"]), &settings());
        assert_eq!(
            result.unwrap_err(),
            PairPotentialError::UnknownAtomType("Xe".to_string())
        );
    }

    #[test]
    fn build_fails_for_incompatible_forms() {
        let result = PotentialMap::build(&forcefield(), &names(&["OW", "HW"]), &settings());
        assert!(matches!(
            result,
            Err(PairPotentialError::IncompatibleForms { .. })
        ));
    }

    #[test]
    fn build_with_reuses_potentials_on_the_same_grid() {
        let mut first =
            PotentialMap::build(&forcefield(), &names(&["OW", "Ar"]), &settings()).unwrap();
        let correction = Curve::new(vec![0.0, 10.0], vec![1.0, 1.0]).unwrap();
        first.adjust_u_additional(0, 1, &correction, 1.0).unwrap();

        let second = PotentialMap::build_with(
            first.potentials(),
            &forcefield(),
            &names(&["Ar", "OW"]),
            &settings(),
        )
        .unwrap();
        assert_eq!(second.potential(1, 0), first.potential(0, 1));

        let regridded = PotentialMap::build_with(
            first.potentials(),
            &forcefield(),
            &names(&["Ar", "OW"]),
            &TabulationSettings {
                delta: 0.02,
                ..settings()
            },
        )
        .unwrap();
        assert!(regridded.potential(0, 1).u_additional().y().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn build_with_retabulates_when_parameters_or_charges_change() {
        let mut first =
            PotentialMap::build(&forcefield(), &names(&["OW", "Ar"]), &settings()).unwrap();
        let correction = Curve::new(vec![0.0, 10.0], vec![1.0, 1.0]).unwrap();
        first.adjust_u_additional(0, 1, &correction, 1.0).unwrap();
        first.adjust_u_additional(1, 1, &correction, 1.0).unwrap();

        let mut recharged = forcefield();
        recharged.insert(AtomType::new(
            "Ar",
            ShortRangeForm::LennardJones,
            vec![0.99, 3.4],
            0.25,
        ));
        let second = PotentialMap::build_with(
            first.potentials(),
            &recharged,
            &names(&["OW", "Ar"]),
            &settings(),
        )
        .unwrap();
        assert_eq!(second.potential(0, 0), first.potential(0, 0));
        assert_eq!(second.potential(0, 1).charge_product(), -0.82 * 0.25);
        assert!(second.potential(0, 1).u_additional().y().iter().all(|&u| u == 0.0));
        assert_ne!(second.energy(0, 1, 4.0), first.energy(0, 1, 4.0));

        let mut resized = forcefield();
        resized.insert(AtomType::new(
            "Ar",
            ShortRangeForm::LennardJones,
            vec![0.99, 3.5],
            0.0,
        ));
        let third = PotentialMap::build_with(
            first.potentials(),
            &resized,
            &names(&["OW", "Ar"]),
            &settings(),
        )
        .unwrap();
        assert!(third.potential(1, 1).u_additional().y().iter().all(|&u| u == 0.0));
        let ShortRangeInteraction::LennardJones { epsilon, sigma } =
            *third.potential(1, 1).short_range()
        else {
            panic!("argon should keep a Lennard-Jones interaction");
        };
        assert!((epsilon - 0.99).abs() < 1e-12);
        assert_eq!(sigma, 3.5);
    }

    #[test]
    fn replace_u_additional_discards_previous_correction() {
        let mut map = PotentialMap::build(&forcefield(), &names(&["Ar"]), &settings()).unwrap();
        let first = Curve::new(vec![0.0, 10.0], vec![2.0, 2.0]).unwrap();
        let second = Curve::new(vec![0.0, 10.0], vec![0.5, 0.5]).unwrap();
        map.adjust_u_additional(0, 0, &first, 1.0).unwrap();
        map.replace_u_additional(0, 0, &second).unwrap();
        assert!(map.potential(0, 0).u_additional().y().iter().all(|&u| u == 0.5));

        map.reset_all_u_additional();
        assert!(map.potential(0, 0).u_additional().y().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn additional_potential_rejects_out_of_range_type_index() {
        let mut map = PotentialMap::build(&forcefield(), &names(&["Ar"]), &settings()).unwrap();
        assert_eq!(
            map.reset_u_additional(0, 3),
            Err(PairPotentialError::TypeIndexOutOfRange {
                index: 3,
                n_types: 1
            })
        );
    }
}
