//! # Core Models Module
//!
//! Data structures describing what is being simulated.
//!
//! ## Overview
//!
//! A [`configuration::Configuration`] owns a flat array of [`atom::Atom`]s, the
//! [`molecule::Molecule`]s that partition them and the periodic
//! [`simulation_box::SimulationBox`] they live in. Every molecule is an instance of a
//! [`species::Species`] template, which carries the bonded terms, the rigid sub-trees ("attached"
//! atoms) on either side of each term, and the intramolecular pair scaling matrix.
//!
//! ## Key Components
//!
//! - [`atom`] - Position, atom type index and owning molecule of a single atom
//! - [`species`] - Molecular templates with bonds, angles, torsions and derived topology
//! - [`molecule`] - A species instance mapping local atom indices onto configuration atoms
//! - [`configuration`] - The complete simulated system
//! - [`simulation_box`] - Minimum-image geometry for periodic and non-periodic cells
//!
//! ## Usage
//!
//! ```ignore
//! use refinery::core::models::species::SpeciesBuilder;
//!
//! let mut builder = SpeciesBuilder::new("Water");
//! let o = builder.add_atom("OW");
//! let h1 = builder.add_atom("HW");
//! builder.add_bond(o, h1, BondForm::Harmonic { k: 4431.53, eq: 1.0 });
//! let water = Arc::new(builder.build()?);
//!
//! let mut configuration = Configuration::new("Bulk", SimulationBox::cubic(20.0)?, 300.0)?;
//! configuration.add_molecule(&water, &positions)?;
//! ```

pub mod atom;
pub mod configuration;
pub mod error;
pub mod molecule;
pub mod simulation_box;
pub mod species;
