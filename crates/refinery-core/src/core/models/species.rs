use super::error::ModelError;
use crate::core::forcefield::intramolecular::{AngleForm, BondForm, TorsionForm};
use std::collections::VecDeque;

/// Default scaling applied to 1-4 pair interactions defined by a torsion.
pub const DEFAULT_SCALE_14: f64 = 0.5;

/// The two rigid sub-trees either side of a bonded term.
///
/// Side `0` contains the atoms that move with the first atom(s) of the term, side `1` those that
/// move with the last. A term whose two ends remain connected once the term is cut lies in a ring
/// and has no rigid sub-tree, so each side holds only the term's terminal atom.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attachment {
    sides: [Vec<usize>; 2],
    in_cycle: bool,
}

impl Attachment {
    #[inline]
    pub fn side(&self, terminus: usize) -> &[usize] {
        &self.sides[terminus]
    }

    #[inline]
    pub fn is_in_cycle(&self) -> bool {
        self.in_cycle
    }

    fn terminal(first: usize, last: usize) -> Self {
        Self {
            sides: [vec![first], vec![last]],
            in_cycle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesBond {
    pub indices: [usize; 2],
    pub form: BondForm,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesAngle {
    pub indices: [usize; 3],
    pub form: AngleForm,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesTorsion {
    pub indices: [usize; 4],
    pub form: TorsionForm,
    /// Scaling applied to the pair interaction between the two terminal atoms.
    pub scale_14: f64,
    pub attachment: Attachment,
}

/// A molecular template shared by every molecule of the same kind.
///
/// Constructed through [`SpeciesBuilder`], which derives the attached atom lists of every term and
/// the intramolecular pair scaling matrix: directly bonded (1-2) and angle-separated (1-3) pairs are
/// excluded entirely, 1-4 pairs take the scaling of the torsion that spans them, and every other
/// pair is counted in full.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    name: String,
    atom_types: Vec<String>,
    bonds: Vec<SpeciesBond>,
    angles: Vec<SpeciesAngle>,
    torsions: Vec<SpeciesTorsion>,
    scaling: Vec<f64>,
}

impl Species {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.atom_types.len()
    }

    /// Atom type names, indexed by local atom index.
    pub fn atom_types(&self) -> &[String] {
        &self.atom_types
    }

    pub fn bonds(&self) -> &[SpeciesBond] {
        &self.bonds
    }

    pub fn angles(&self) -> &[SpeciesAngle] {
        &self.angles
    }

    pub fn torsions(&self) -> &[SpeciesTorsion] {
        &self.torsions
    }

    /// Intramolecular scaling factor for the pair of local atom indices `i` and `j`.
    #[inline]
    pub fn scaling(&self, i: usize, j: usize) -> f64 {
        self.scaling[i * self.n_atoms() + j]
    }
}

#[derive(Debug, Clone)]
pub struct SpeciesBuilder {
    name: String,
    atom_types: Vec<String>,
    bonds: Vec<([usize; 2], BondForm)>,
    angles: Vec<([usize; 3], AngleForm)>,
    torsions: Vec<([usize; 4], TorsionForm, f64)>,
}

impl SpeciesBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            atom_types: Vec::new(),
            bonds: Vec::new(),
            angles: Vec::new(),
            torsions: Vec::new(),
        }
    }

    /// Appends an atom of the named type and returns its local index.
    pub fn add_atom(&mut self, type_name: &str) -> usize {
        self.atom_types.push(type_name.to_string());
        self.atom_types.len() - 1
    }

    pub fn add_bond(&mut self, i: usize, j: usize, form: BondForm) -> &mut Self {
        self.bonds.push(([i, j], form));
        self
    }

    pub fn add_angle(&mut self, i: usize, j: usize, k: usize, form: AngleForm) -> &mut Self {
        self.angles.push(([i, j, k], form));
        self
    }

    pub fn add_torsion(
        &mut self,
        indices: [usize; 4],
        form: TorsionForm,
        scale_14: f64,
    ) -> &mut Self {
        self.torsions.push((indices, form, scale_14));
        self
    }

    pub fn build(self) -> Result<Species, ModelError> {
        let n_atoms = self.atom_types.len();
        self.validate_indices(n_atoms)?;

        let graph = BondGraph::new(n_atoms, self.bonds.iter().map(|(indices, _)| *indices));

        let bonds = self
            .bonds
            .iter()
            .map(|&([i, j], form)| SpeciesBond {
                indices: [i, j],
                form,
                attachment: graph.split_at_bond(i, j),
            })
            .collect();

        let angles = self
            .angles
            .iter()
            .map(|&([i, j, k], form)| SpeciesAngle {
                indices: [i, j, k],
                form,
                attachment: graph.split_at_atom(i, j, k),
            })
            .collect();

        let torsions: Vec<SpeciesTorsion> = self
            .torsions
            .iter()
            .map(|&(indices, form, scale_14)| SpeciesTorsion {
                indices,
                form,
                scale_14,
                attachment: graph.split_at_torsion(indices),
            })
            .collect();

        let scaling = graph.scaling_matrix(&torsions);

        Ok(Species {
            name: self.name,
            atom_types: self.atom_types,
            bonds,
            angles,
            torsions,
            scaling,
        })
    }

    fn validate_indices(&self, n_atoms: usize) -> Result<(), ModelError> {
        let terms = self
            .bonds
            .iter()
            .map(|(indices, _)| indices.as_slice())
            .chain(self.angles.iter().map(|(indices, _)| indices.as_slice()))
            .chain(self.torsions.iter().map(|(indices, _, _)| indices.as_slice()));

        for indices in terms {
            for (position, &index) in indices.iter().enumerate() {
                if index >= n_atoms {
                    return Err(ModelError::AtomIndexOutOfRange {
                        species: self.name.clone(),
                        index,
                        n_atoms,
                    });
                }
                if indices[..position].contains(&index) {
                    return Err(ModelError::DegenerateTerm {
                        species: self.name.clone(),
                        index,
                    });
                }
            }
        }
        Ok(())
    }
}

struct BondGraph {
    neighbours: Vec<Vec<usize>>,
}

impl BondGraph {
    fn new(n_atoms: usize, bonds: impl Iterator<Item = [usize; 2]>) -> Self {
        let mut neighbours = vec![Vec::new(); n_atoms];
        for [i, j] in bonds {
            if !neighbours[i].contains(&j) {
                neighbours[i].push(j);
                neighbours[j].push(i);
            }
        }
        Self { neighbours }
    }

    /// Atoms reachable from `start` without traversing the edge `cut` or visiting `blocked`.
    fn reachable(
        &self,
        start: usize,
        cut: Option<(usize, usize)>,
        blocked: Option<usize>,
    ) -> Vec<usize> {
        let mut visited = vec![false; self.neighbours.len()];
        if let Some(b) = blocked {
            visited[b] = true;
        }
        visited[start] = true;

        let mut queue = VecDeque::from([start]);
        let mut found = vec![start];
        while let Some(current) = queue.pop_front() {
            for &next in &self.neighbours[current] {
                let crosses_cut = cut.is_some_and(|(a, b)| {
                    (current == a && next == b) || (current == b && next == a)
                });
                if visited[next] || crosses_cut {
                    continue;
                }
                visited[next] = true;
                found.push(next);
                queue.push_back(next);
            }
        }
        found.sort_unstable();
        found
    }

    fn split_at_bond(&self, a: usize, b: usize) -> Attachment {
        let side_a = self.reachable(a, Some((a, b)), None);
        if side_a.binary_search(&b).is_ok() {
            return Attachment::terminal(a, b);
        }
        let side_b = self.reachable(b, Some((a, b)), None);
        Attachment {
            sides: [side_a, side_b],
            in_cycle: false,
        }
    }

    fn split_at_atom(&self, first: usize, pivot: usize, last: usize) -> Attachment {
        let side_first = self.reachable(first, None, Some(pivot));
        if side_first.binary_search(&last).is_ok() {
            return Attachment::terminal(first, last);
        }
        let side_last = self.reachable(last, None, Some(pivot));
        Attachment {
            sides: [side_first, side_last],
            in_cycle: false,
        }
    }

    /// Torsions rotate about their central bond; in a ring only the two end atoms move.
    fn split_at_torsion(&self, [i, j, k, l]: [usize; 4]) -> Attachment {
        let attachment = self.split_at_bond(j, k);
        if attachment.is_in_cycle() {
            Attachment::terminal(i, l)
        } else {
            attachment
        }
    }

    fn scaling_matrix(&self, torsions: &[SpeciesTorsion]) -> Vec<f64> {
        let n = self.neighbours.len();
        let mut scaling = vec![1.0; n * n];

        for i in 0..n {
            let mut depth = vec![usize::MAX; n];
            depth[i] = 0;
            let mut queue = VecDeque::from([i]);
            while let Some(current) = queue.pop_front() {
                if depth[current] == 2 {
                    continue;
                }
                for &next in &self.neighbours[current] {
                    if depth[next] == usize::MAX {
                        depth[next] = depth[current] + 1;
                        queue.push_back(next);
                    }
                }
            }
            for j in 0..n {
                if j != i && depth[j] <= 2 {
                    scaling[i * n + j] = 0.0;
                }
            }
        }

        for torsion in torsions {
            let [i, _, _, l] = torsion.indices;
            if scaling[i * n + l] == 1.0 {
                scaling[i * n + l] = torsion.scale_14;
                scaling[l * n + i] = torsion.scale_14;
            }
        }

        scaling
    }
}
