//! Track stats for the whole cnasig run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::cna_detection::{BranchResult, DetectionResult};
use crate::detect::RUN_STATS_FILENAME;

#[derive(Default, Deserialize, Serialize)]
pub struct BranchRunStats {
    pub candidate_probe_count: usize,
    pub contiguous_block_count: usize,
    pub region_count: usize,
    pub significant_region_count: usize,

    /// Zero if the branch had too few regions for permutation testing
    pub exclusion_pass_count: usize,
    pub permutation_attempt_count: usize,
}

impl BranchRunStats {
    pub fn new(branch_result: &BranchResult) -> Self {
        let summary = branch_result
            .significance_summary
            .clone()
            .unwrap_or_default();
        Self {
            candidate_probe_count: branch_result.candidate_probe_count,
            contiguous_block_count: branch_result.block_count,
            region_count: branch_result.regions.len(),
            significant_region_count: branch_result
                .regions
                .iter()
                .filter(|x| x.is_significant())
                .count(),
            exclusion_pass_count: summary.exclusion_pass_count,
            permutation_attempt_count: summary.permutation_attempt_count,
        }
    }
}

#[derive(Deserialize, Serialize)]
pub struct DetectRunStats {
    pub probe_count: usize,
    pub sample_count: usize,
    pub amplification: BranchRunStats,
    pub deletion: BranchRunStats,
    pub merged_region_count: usize,
    pub total_detection_time_secs: f64,
}

impl DetectRunStats {
    pub fn new(
        probe_count: usize,
        sample_count: usize,
        result: &DetectionResult,
        total_detection_time_secs: f64,
    ) -> Self {
        Self {
            probe_count,
            sample_count,
            amplification: BranchRunStats::new(&result.amp),
            deletion: BranchRunStats::new(&result.del),
            merged_region_count: result.merged_regions.len(),
            total_detection_time_secs,
        }
    }
}

/// Write run_stats structure out in json format
pub fn write_detect_run_stats(output_dir: &Utf8Path, run_stats: &DetectRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CnaBranch;
    use crate::cna_region::{CnaRegion, ProbeRange, SignificanceTag};
    use crate::significance::SignificanceSummary;

    #[test]
    fn test_branch_run_stats() {
        let mut regions = vec![
            CnaRegion::new(0, ProbeRange::new(0, 5)),
            CnaRegion::new(1, ProbeRange::new(8, 20)),
        ];
        regions[1].tag = SignificanceTag::Significant;
        let branch_result = BranchResult {
            branch: CnaBranch::Deletion,
            candidate_probe_count: 25,
            block_count: 3,
            regions,
            significance_summary: Some(SignificanceSummary {
                exclusion_pass_count: 2,
                permutation_attempt_count: 90,
            }),
        };

        let stats = BranchRunStats::new(&branch_result);
        assert_eq!(stats.candidate_probe_count, 25);
        assert_eq!(stats.contiguous_block_count, 3);
        assert_eq!(stats.region_count, 2);
        assert_eq!(stats.significant_region_count, 1);
        assert_eq!(stats.exclusion_pass_count, 2);
        assert_eq!(stats.permutation_attempt_count, 90);
    }
}
