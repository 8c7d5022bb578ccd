//! Parameters of the CNA detection engine, independent of the command-line interface
//!

use serde::{Deserialize, Serialize};

pub const DEFAULT_PCC_THRESHOLD: f64 = 0.9;
pub const DEFAULT_PERMUTE_COUNT: usize = 20;
pub const DEFAULT_SIG_VALUE_THRESHOLD: f64 = 0.0476;
pub const DEFAULT_MIN_CNA_LENGTH: usize = 6;
pub const DEFAULT_ENTROPY_BIN_COUNT: usize = 16;
pub const DEFAULT_MAX_PERMUTATION_ATTEMPTS: usize = 10000;

/// Thresholds used to split the input matrix into amplification and deletion matrices
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ThresholdSettings {
    /// Values at or below this level are zeroed in the amplification matrix
    pub amp_threshold: f64,

    /// Values at or above this level are zeroed in the deletion matrix
    pub del_threshold: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AlgorithmSettings {
    /// Adjacent probes with a sample value correlation below this level are split into
    /// different CNA regions
    pub pcc_threshold: f64,

    /// Number of accepted permutation trials used to build each null statistic table
    pub permute_count: usize,

    /// Regions with an empirical p-value below this level are significant
    pub sig_value_threshold: f64,

    /// Minimum CNA region length, in probes
    pub min_cna_length: usize,

    /// Number of bins used for the permutation trial entropy estimate
    pub entropy_bin_count: usize,

    /// Total permutation attempts allowed while building one null statistic table
    pub max_permutation_attempts: usize,
}

impl Default for AlgorithmSettings {
    fn default() -> Self {
        Self {
            pcc_threshold: DEFAULT_PCC_THRESHOLD,
            permute_count: DEFAULT_PERMUTE_COUNT,
            sig_value_threshold: DEFAULT_SIG_VALUE_THRESHOLD,
            min_cna_length: DEFAULT_MIN_CNA_LENGTH,
            entropy_bin_count: DEFAULT_ENTROPY_BIN_COUNT,
            max_permutation_attempts: DEFAULT_MAX_PERMUTATION_ATTEMPTS,
        }
    }
}
