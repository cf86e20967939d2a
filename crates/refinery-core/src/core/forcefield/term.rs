use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Bonded energy of one molecule or a whole configuration, split by term kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntramolecularEnergy {
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
}

impl IntramolecularEnergy {
    pub fn new(bond: f64, angle: f64, torsion: f64) -> Self {
        Self {
            bond,
            angle,
            torsion,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.bond + self.angle + self.torsion
    }
}

impl Add for IntramolecularEnergy {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            bond: self.bond + rhs.bond,
            angle: self.angle + rhs.angle,
            torsion: self.torsion + rhs.torsion,
        }
    }
}

impl AddAssign for IntramolecularEnergy {
    fn add_assign(&mut self, rhs: Self) {
        self.bond += rhs.bond;
        self.angle += rhs.angle;
        self.torsion += rhs.torsion;
    }
}

impl Sum for IntramolecularEnergy {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
