//! Numerical helpers shared by the forcefield and engine layers.

pub mod geometry;
pub mod interpolation;
pub mod regression;
