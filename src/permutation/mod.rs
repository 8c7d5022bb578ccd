//! Build a null distribution of maximum windowed statistics from random rearrangements of CNA
//! region blocks
//!

mod entropy;

use std::sync::mpsc::channel;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub use self::entropy::{EntropyAcceptanceFilter, get_normalized_entropy};
use crate::cna_region::{LengthSet, ProbeRange};
use crate::cna_settings::AlgorithmSettings;
use crate::errors::{CnaError, CnaResult};
use crate::log_utils::debug_msg;
use crate::probe_matrix::ProbeMatrix;

/// Source of independent random generators for each permutation attempt
///
/// Every attempt gets its own generator derived from the base seed, the exclusion pass index and
/// the attempt index, so trial results do not depend on how attempts are distributed over worker
/// threads.
///
#[derive(Clone, Debug)]
pub struct TrialRngSource {
    seed: u64,
}

impl TrialRngSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Independent source for one analysis stream, such as a detection branch
    pub fn get_stream_source(&self, stream_index: u64) -> Self {
        Self {
            seed: splitmix64(self.seed ^ splitmix64(stream_index.wrapping_add(1) << 48)),
        }
    }

    pub fn get_rng(&self, pass_index: usize, attempt_index: usize) -> StdRng {
        let stream = ((pass_index as u64) << 40) ^ (attempt_index as u64);
        StdRng::seed_from_u64(splitmix64(self.seed ^ splitmix64(stream)))
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Immutable snapshot of the CNA blocks still being permuted in one exclusion pass
#[derive(Clone, Debug)]
pub struct WorkingSetSnapshot {
    /// Blocks in region id order
    pub blocks: Vec<ProbeRange>,

    /// Length of each synthetic permuted column
    ///
    /// This is at least the total length of all blocks. Any remainder is zero-filled.
    pub active_probe_count: usize,
}

/// Shared inputs for building null statistic tables for one detection branch
pub struct PermutationContext<'a> {
    pub matrix: &'a ProbeMatrix,
    pub settings: &'a AlgorithmSettings,
    pub worker_pool: &'a rayon::ThreadPool,
    pub rng_source: &'a TrialRngSource,
}

/// Maximum windowed statistic for each accepted permutation trial (rows) and each region length
/// (columns)
///
#[derive(Clone, Debug, PartialEq)]
pub struct NullStatisticTable {
    length_set: LengthSet,
    trial_max_values: Vec<Vec<f64>>,
}

impl NullStatisticTable {
    pub fn new(length_set: LengthSet, trial_max_values: Vec<Vec<f64>>) -> Self {
        for row in trial_max_values.iter() {
            assert_eq!(row.len(), length_set.len());
        }
        Self {
            length_set,
            trial_max_values,
        }
    }

    pub fn trial_count(&self) -> usize {
        self.trial_max_values.len()
    }

    pub fn length_count(&self) -> usize {
        self.length_set.len()
    }

    /// Fraction of trials with a maximum statistic at `length` greater than `u_value`, with one
    /// pseudo-count added to the trial total
    ///
    pub fn get_empirical_p_value(&self, length: usize, u_value: f64) -> f64 {
        let column = self
            .length_set
            .column(length)
            .unwrap_or_else(|| panic!("Null statistic table has no column for length {length}"));
        let exceed_count = self
            .trial_max_values
            .iter()
            .filter(|row| row[column] > u_value)
            .count();
        exceed_count as f64 / (self.trial_count() + 1) as f64
    }
}

#[derive(Clone, Debug, Default)]
pub struct SamplerStats {
    pub attempt_count: usize,
    pub accepted_count: usize,
}

/// Per-probe sums over all samples of one synthetic permuted matrix
///
/// Each sample column is built independently by concatenating that column's values from every
/// block, in a random block order drawn separately for the column.
///
fn get_permuted_probe_sums(
    matrix: &ProbeMatrix,
    working_set: &WorkingSetSnapshot,
    rng: &mut StdRng,
) -> Vec<f64> {
    let mut probe_sums = vec![0.0; working_set.active_probe_count];
    let mut block_order = (0..working_set.blocks.len()).collect::<Vec<_>>();
    for sample_index in 0..matrix.sample_count() {
        block_order.shuffle(rng);
        let mut offset = 0;
        for &block_index in block_order.iter() {
            for probe_index in working_set.blocks[block_index].probe_indices() {
                probe_sums[offset] += matrix.get(probe_index, sample_index);
                offset += 1;
            }
        }
    }
    probe_sums
}

/// For each length in `length_set`, find the maximum over all window offsets of the window's
/// absolute mean value per sample and probe
///
fn get_max_window_statistics(
    probe_sums: &[f64],
    sample_count: usize,
    length_set: &LengthSet,
) -> Vec<f64> {
    let mut prefix_sums = Vec::with_capacity(probe_sums.len() + 1);
    prefix_sums.push(0.0);
    let mut total = 0.0;
    for &x in probe_sums {
        total += x;
        prefix_sums.push(total);
    }

    let probe_count = probe_sums.len();
    length_set
        .lengths()
        .iter()
        .map(|&length| {
            debug_assert!(length <= probe_count);
            let denom = (sample_count * length) as f64;
            (0..(probe_count + 1).saturating_sub(length))
                .map(|front| (prefix_sums[front + length] - prefix_sums[front]).abs() / denom)
                .fold(0.0, f64::max)
        })
        .collect()
}

struct TrialAttempt {
    attempt_index: usize,
    probe_sums: Vec<f64>,
    entropy: f64,
}

/// Run one batch of permutation attempts on the worker pool, returned in attempt order
fn run_attempt_batch(
    context: &PermutationContext,
    working_set: &WorkingSetSnapshot,
    pass_index: usize,
    attempt_indices: std::ops::Range<usize>,
) -> Vec<TrialAttempt> {
    let matrix = context.matrix;
    let rng_source = context.rng_source;
    let entropy_bin_count = context.settings.entropy_bin_count;
    let sample_count = matrix.sample_count() as f64;

    let (tx, rx) = channel();
    context.worker_pool.scope(move |scope| {
        for attempt_index in attempt_indices {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let mut rng = rng_source.get_rng(pass_index, attempt_index);
                let probe_sums = get_permuted_probe_sums(matrix, working_set, &mut rng);
                let probe_means = probe_sums
                    .iter()
                    .map(|x| x / sample_count)
                    .collect::<Vec<_>>();
                let entropy = get_normalized_entropy(&probe_means, entropy_bin_count);
                tx.send(TrialAttempt {
                    attempt_index,
                    probe_sums,
                    entropy,
                })
                .unwrap();
            });
        }
    });

    let mut attempts = rx.into_iter().collect::<Vec<_>>();
    attempts.sort_by_key(|x| x.attempt_index);
    attempts
}

/// Build the null statistic table for one exclusion pass
///
/// Permutation attempts are drawn until `permute_count` trials pass the entropy acceptance filter.
/// Acceptance is decided in attempt order, so the table is reproducible for a given seed.
///
/// # Arguments
/// * `length_set` - Region lengths which need a column in the table
/// * `pass_index` - Exclusion pass index, used to select an independent random stream per pass
///
pub fn build_null_statistic_table(
    context: &PermutationContext,
    working_set: &WorkingSetSnapshot,
    length_set: &LengthSet,
    pass_index: usize,
) -> CnaResult<(NullStatisticTable, SamplerStats)> {
    let debug = false;

    let settings = context.settings;
    let permute_count = settings.permute_count;
    let max_attempts = settings.max_permutation_attempts;
    let batch_size = std::cmp::max(context.worker_pool.current_num_threads() * 4, permute_count);

    assert!(
        working_set.blocks.iter().map(|x| x.len()).sum::<usize>()
            <= working_set.active_probe_count
    );

    let mut filter = EntropyAcceptanceFilter::default();
    let mut accepted_probe_sums = Vec::with_capacity(permute_count);
    let mut stats = SamplerStats::default();

    while accepted_probe_sums.len() < permute_count {
        if stats.attempt_count >= max_attempts {
            return Err(CnaError::PermutationConvergenceFailure {
                accepted: accepted_probe_sums.len(),
                requested: permute_count,
                attempts: stats.attempt_count,
            });
        }

        let batch_end = std::cmp::min(stats.attempt_count + batch_size, max_attempts);
        let batch = run_attempt_batch(
            context,
            working_set,
            pass_index,
            stats.attempt_count..batch_end,
        );
        for attempt in batch {
            stats.attempt_count += 1;
            let is_accepted = filter.offer(attempt.entropy);
            debug_msg!(
                debug,
                "pass {pass_index} attempt {}: entropy = {:.6}, mean = {:.6}, accepted = {}",
                attempt.attempt_index,
                attempt.entropy,
                filter.mean_entropy(),
                is_accepted
            );
            if is_accepted {
                accepted_probe_sums.push(attempt.probe_sums);
                if accepted_probe_sums.len() == permute_count {
                    break;
                }
            }
        }
    }
    stats.accepted_count = filter.accepted_count();

    let sample_count = context.matrix.sample_count();
    let trial_max_values = accepted_probe_sums
        .iter()
        .map(|x| get_max_window_statistics(x, sample_count, length_set))
        .collect();

    Ok((
        NullStatisticTable::new(length_set.clone(), trial_max_values),
        stats,
    ))
}
