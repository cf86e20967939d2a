pub mod export;
pub mod run;
pub mod test;

use crate::config::PartialInputFile;
use crate::error::Result;
use refinery::engine::process_pool::ProcessPool;
use tracing::info;

/// Sizes the process pool: `-j` first, then `processes` from the input file, then one rank per
/// Rayon worker thread.
pub(crate) fn process_pool(threads: Option<usize>, input: &PartialInputFile) -> Result<ProcessPool> {
    let n_processes = threads
        .or(input.processes())
        .unwrap_or_else(rayon::current_num_threads);
    info!("Using a process pool of {} rank(s).", n_processes);
    Ok(ProcessPool::new(n_processes)?)
}
