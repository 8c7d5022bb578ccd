//! Run CNA detection and significance testing on both the amplification and deletion branches,
//! and merge the results
//!

use log::info;
use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::classify::{CnaBranch, classify_probe_matrix};
use crate::cna_region::{CnaRegion, ProbeRange};
use crate::cna_settings::{AlgorithmSettings, ThresholdSettings};
use crate::errors::CnaResult;
use crate::merge_regions::merge_branch_regions;
use crate::permutation::{PermutationContext, TrialRngSource};
use crate::probe_matrix::ProbeMatrix;
use crate::region_segmenter::segment_cna_regions;
use crate::significance::{SignificanceSummary, assess_region_significance};

/// All detection results for one branch
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BranchResult {
    pub branch: CnaBranch,
    pub candidate_probe_count: usize,
    pub block_count: usize,

    /// All CNA regions found by segmentation, with their final significance values
    pub regions: Vec<CnaRegion>,

    /// Set if permutation testing was run, which requires at least 2 regions
    pub significance_summary: Option<SignificanceSummary>,
}

impl BranchResult {
    pub fn significant_ranges(&self) -> Vec<ProbeRange> {
        self.regions
            .iter()
            .filter(|x| x.is_significant())
            .map(|x| x.range)
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetectionResult {
    pub amp: BranchResult,
    pub del: BranchResult,
    pub merged_regions: Vec<ProbeRange>,
}

/// Shared inputs for both detection branches
pub struct DetectionContext<'a> {
    pub algorithm_settings: &'a AlgorithmSettings,
    pub worker_pool: &'a rayon::ThreadPool,
    pub rng_source: &'a TrialRngSource,
}

fn detect_branch_regions(
    context: &DetectionContext,
    branch: CnaBranch,
    matrix: &ProbeMatrix,
) -> CnaResult<BranchResult> {
    info!("Starting to process {branch} branch");

    let segmentation = segment_cna_regions(matrix, context.algorithm_settings);
    info!(
        "{branch}: {} candidate probes in {} contiguous blocks",
        segmentation.candidate_probe_count.separate_with_commas(),
        segmentation.blocks.len().separate_with_commas()
    );
    if segmentation.candidate_probe_count == 0 {
        info!("{branch}: no CNA probes found");
    }
    info!(
        "{branch}: {} CNA regions over {} probes, with {} distinct region lengths",
        segmentation.regions.len(),
        segmentation.active_probe_count().separate_with_commas(),
        segmentation.length_set().len()
    );

    let mut regions = segmentation.regions;
    let significance_summary = if regions.len() >= 2 {
        let rng_source = context.rng_source.get_stream_source(branch as u64);
        let permutation_context = PermutationContext {
            matrix,
            settings: context.algorithm_settings,
            worker_pool: context.worker_pool,
            rng_source: &rng_source,
        };
        Some(assess_region_significance(
            &permutation_context,
            &mut regions,
        )?)
    } else {
        info!("{branch}: not enough CNA regions to permute, skipping significance testing");
        None
    };

    let result = BranchResult {
        branch,
        candidate_probe_count: segmentation.candidate_probe_count,
        block_count: segmentation.blocks.len(),
        regions,
        significance_summary,
    };

    info!(
        "{branch}: {} significant regions",
        result.regions.iter().filter(|x| x.is_significant()).count()
    );
    for region in result.regions.iter() {
        log::debug!("{branch}: {region} {}", region.tag);
    }

    Ok(result)
}

/// Detect significant recurrent CNA regions in a probe by sample matrix
///
/// The matrix is split into amplification and deletion matrices, each is segmented and tested for
/// significance independently, and the significant regions of both are merged.
///
pub fn detect_significant_regions(
    context: &DetectionContext,
    matrix: &ProbeMatrix,
    thresholds: &ThresholdSettings,
) -> CnaResult<DetectionResult> {
    let classified = classify_probe_matrix(matrix, thresholds);

    let amp = detect_branch_regions(context, CnaBranch::Amplification, &classified.amp)?;
    let del = detect_branch_regions(context, CnaBranch::Deletion, &classified.del)?;

    let merged_regions = merge_branch_regions(&amp.significant_ranges(), &del.significant_ranges());

    Ok(DetectionResult {
        amp,
        del,
        merged_regions,
    })
}
