use super::error::EngineError;
use nalgebra::Vector3;
use std::iter::{StepBy, Sum};
use std::ops::Range;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A fixed set of cooperating ranks that split work and meet at collective operations.
///
/// Every rank runs the same closure over its own interleaved share of the work. Results are
/// gathered in rank order before being combined, so a reduction is deterministic for a given
/// number of ranks whether or not the ranks actually run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessPool {
    n_processes: usize,
}

impl ProcessPool {
    /// Creates a pool of `n_processes` ranks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Initialization`] when `n_processes` is zero.
    pub fn new(n_processes: usize) -> Result<Self, EngineError> {
        if n_processes == 0 {
            return Err(EngineError::Initialization(
                "a process pool needs at least one rank".to_string(),
            ));
        }
        debug!(n_processes, "Created process pool.");
        Ok(Self { n_processes })
    }

    /// A single-rank pool.
    pub fn serial() -> Self {
        Self { n_processes: 1 }
    }

    #[inline]
    pub fn n_processes(&self) -> usize {
        self.n_processes
    }

    /// Item indices handled by `rank`: `rank, rank + n, rank + 2n, ...` below `n_items`.
    #[inline]
    pub fn partition(&self, rank: usize, n_items: usize) -> StepBy<Range<usize>> {
        (rank.min(n_items)..n_items).step_by(self.n_processes)
    }

    fn gather<T, F>(&self, work: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        let gathered = (0..self.n_processes).into_par_iter().map(work).collect();
        #[cfg(not(feature = "parallel"))]
        let gathered = (0..self.n_processes).map(work).collect();
        gathered
    }

    /// Sum-reduction of one contribution per rank.
    pub fn all_sum<T, F>(&self, work: F) -> T
    where
        T: Send + Sum,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.gather(work).into_iter().sum()
    }

    /// Sum-reduction of per-atom force arrays; each rank accumulates into its own zeroed buffer.
    pub fn all_sum_forces<F>(&self, n_atoms: usize, work: F) -> Vec<Vector3<f64>>
    where
        F: Fn(usize, &mut [Vector3<f64>]) + Sync + Send,
    {
        let partials = self.gather(|rank| {
            let mut forces = vec![Vector3::zeros(); n_atoms];
            work(rank, &mut forces);
            forces
        });

        let mut total = vec![Vector3::zeros(); n_atoms];
        for partial in partials {
            for (sum, force) in total.iter_mut().zip(partial) {
                *sum += force;
            }
        }
        total
    }

    /// `true` only if every rank reports `true`.
    pub fn all_true<F>(&self, decision: F) -> bool
    where
        F: Fn(usize) -> bool + Sync + Send,
    {
        self.gather(decision).into_iter().all(|ok| ok)
    }
}

impl Default for ProcessPool {
    fn default() -> Self {
        Self::serial()
    }
}
