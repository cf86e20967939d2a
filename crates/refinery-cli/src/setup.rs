use crate::config::{PartialBox, PartialInputFile, PartialSpecies};
use crate::error::{CliError, Result};
use nalgebra::Point3;
use refinery::core::forcefield::intramolecular::{AngleForm, BondForm, TorsionForm};
use refinery::core::forcefield::params::Forcefield;
use refinery::core::forcefield::potential_map::PotentialMap;
use refinery::core::io::curve::read_curve_csv;
use refinery::core::models::configuration::Configuration;
use refinery::core::models::simulation_box::SimulationBox;
use refinery::core::models::species::{DEFAULT_SCALE_14, Species, SpeciesBuilder};
use refinery::engine::error::EngineError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a command needs to operate on one configuration.
pub struct Simulation {
    pub configuration: Configuration,
    pub potentials: PotentialMap,
}

pub fn build_simulation(input: &PartialInputFile) -> Result<Simulation> {
    let forcefield_path = input.forcefield_path()?;
    info!("Loading forcefield from {:?}", forcefield_path);
    let forcefield = Forcefield::load(&forcefield_path).map_err(EngineError::from)?;

    let species = input
        .species()
        .iter()
        .map(|s| build_species(s).map(|species| (s.name.clone(), Arc::new(species))))
        .collect::<Result<HashMap<_, _>>>()?;

    let simulation_box = match input.cell()? {
        PartialBox::NonPeriodic => SimulationBox::NonPeriodic,
        PartialBox::Cubic { length } => SimulationBox::cubic(length).map_err(EngineError::from)?,
        PartialBox::Orthorhombic { lengths: [a, b, c] } => {
            SimulationBox::orthorhombic(a, b, c).map_err(EngineError::from)?
        }
    };

    let mut configuration =
        Configuration::new(&input.name(), simulation_box, input.temperature())
            .map_err(EngineError::from)?;
    for molecule in input.molecules() {
        let template = species.get(&molecule.species).ok_or_else(|| {
            CliError::Config(format!(
                "Molecule refers to unknown species '{}'.",
                molecule.species
            ))
        })?;
        let positions: Vec<Point3<f64>> = molecule
            .positions
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        configuration
            .add_molecule(template, &positions)
            .map_err(EngineError::from)?;
    }
    if configuration.n_molecules() == 0 {
        return Err(CliError::Config(
            "The configuration contains no molecules.".to_string(),
        ));
    }
    info!(
        molecules = configuration.n_molecules(),
        atoms = configuration.n_atoms(),
        "Configuration '{}' assembled.",
        configuration.name()
    );

    let settings = input.tabulation();
    let mut potentials = PotentialMap::build(&forcefield, configuration.atom_types(), &settings)
        .map_err(EngineError::from)?;
    debug!(
        types = potentials.n_types(),
        range = settings.range,
        delta = settings.delta,
        "Pair potentials tabulated."
    );

    for additional in input.additional() {
        let [type_i, type_j] = &additional.types;
        let index = |name: &str| {
            potentials.type_index(name).ok_or_else(|| {
                CliError::Config(format!(
                    "Additional potential refers to atom type '{name}', which is not present in the configuration."
                ))
            })
        };
        let (i, j) = (index(type_i)?, index(type_j)?);
        let path = input.resolve(&additional.path);
        let curve = read_curve_csv(&path).map_err(EngineError::from)?;
        potentials
            .replace_u_additional(i, j, &curve)
            .map_err(EngineError::from)?;
        info!("Applied additional potential {type_i}-{type_j} from {:?}", path);
    }

    Ok(Simulation {
        configuration,
        potentials,
    })
}

fn build_species(partial: &PartialSpecies) -> Result<Species> {
    let form_error = |e: refinery::core::forcefield::intramolecular::FormError| {
        CliError::Config(format!("Species '{}': {e}", partial.name))
    };

    let mut builder = SpeciesBuilder::new(&partial.name);
    for atom_type in &partial.atoms {
        builder.add_atom(atom_type);
    }
    for bond in &partial.bonds {
        let form = BondForm::from_keyword(&bond.form, &bond.parameters).map_err(form_error)?;
        builder.add_bond(bond.atoms[0], bond.atoms[1], form);
    }
    for angle in &partial.angles {
        let form = AngleForm::from_keyword(&angle.form, &angle.parameters).map_err(form_error)?;
        let [i, j, k] = angle.atoms;
        builder.add_angle(i, j, k, form);
    }
    for torsion in &partial.torsions {
        let form =
            TorsionForm::from_keyword(&torsion.form, &torsion.parameters).map_err(form_error)?;
        builder.add_torsion(
            torsion.atoms,
            form,
            torsion.scale_14.unwrap_or(DEFAULT_SCALE_14),
        );
    }
    Ok(builder.build().map_err(EngineError::from)?)
}
