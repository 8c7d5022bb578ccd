//! Observed region statistics, the iterative significant-region exclusion loop and final scoring
//!

use log::info;
use serde::{Deserialize, Serialize};

use crate::cna_region::{CnaRegion, LengthSet, ProbeRange, SignificanceTag};
use crate::errors::CnaResult;
use crate::permutation::{
    NullStatisticTable, PermutationContext, WorkingSetSnapshot, build_null_statistic_table,
};
use crate::probe_matrix::ProbeMatrix;

/// Observed statistic of a region: the absolute mean of all values in the region's probes
pub fn get_region_u_value(matrix: &ProbeMatrix, range: &ProbeRange) -> f64 {
    let total: f64 = range.probe_indices().map(|x| matrix.probe_sum(x)).sum();
    (total / (range.len() * matrix.sample_count()) as f64).abs()
}

/// Regions still being permuted, and the synthetic column length used to permute them
///
/// This is the state carried from one exclusion pass to the next.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ExclusionState {
    /// Region ids in ascending order
    pub active_region_ids: Vec<usize>,
    pub active_probe_count: usize,
}

impl ExclusionState {
    pub fn new(regions: &[CnaRegion]) -> Self {
        Self {
            active_region_ids: regions.iter().map(|x| x.id).collect(),
            active_probe_count: regions.iter().map(|x| x.len()).sum(),
        }
    }

    /// Region ids are also indices into `regions`
    pub fn get_working_set(&self, regions: &[CnaRegion]) -> WorkingSetSnapshot {
        WorkingSetSnapshot {
            blocks: self
                .active_region_ids
                .iter()
                .map(|&id| regions[id].range)
                .collect(),
            active_probe_count: self.active_probe_count,
        }
    }
}

pub struct ExclusionPassResult {
    pub state: ExclusionState,

    /// Ids of regions removed from the working set in this pass
    pub excluded_region_ids: Vec<usize>,
}

/// Remove every active region which is significant against `table` from the working set
///
/// The synthetic column length is reduced by the length of each removed region, but only while
/// the remaining length stays above `max_length`, so that every table column can still be filled.
///
pub fn run_exclusion_pass(
    regions: &[CnaRegion],
    state: &ExclusionState,
    table: &NullStatisticTable,
    max_length: usize,
    sig_value_threshold: f64,
) -> ExclusionPassResult {
    let mut active_region_ids = Vec::new();
    let mut excluded_region_ids = Vec::new();
    let mut active_probe_count = state.active_probe_count;
    for &id in state.active_region_ids.iter() {
        let region = &regions[id];
        let sig_value = table.get_empirical_p_value(region.len(), region.u_value);
        if sig_value < sig_value_threshold {
            if active_probe_count - region.len() > max_length {
                active_probe_count -= region.len();
            }
            excluded_region_ids.push(id);
        } else {
            active_region_ids.push(id);
        }
    }

    ExclusionPassResult {
        state: ExclusionState {
            active_region_ids,
            active_probe_count,
        },
        excluded_region_ids,
    }
}

/// Set each region's p-value from `table` and tag it significant if the p-value is below
/// `sig_value_threshold`
pub fn score_regions(
    regions: &mut [CnaRegion],
    table: &NullStatisticTable,
    sig_value_threshold: f64,
) {
    for region in regions.iter_mut() {
        region.p_value = table.get_empirical_p_value(region.len(), region.u_value);
        region.tag = if region.p_value < sig_value_threshold {
            SignificanceTag::Significant
        } else {
            SignificanceTag::NotSignificant
        };
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SignificanceSummary {
    pub exclusion_pass_count: usize,
    pub permutation_attempt_count: usize,
}

/// Test all regions of one detection branch for significance
///
/// Regions must have sequential ids matching their index, as produced by the region segmenter.
/// Each region's u-value, p-value, tag and exclusion pass are updated in place.
///
/// The null statistic table is rebuilt on every exclusion pass from the regions which are not yet
/// significant, until a pass excludes no further region or fewer than 2 regions remain to
/// permute. All regions are then scored against the last table built.
///
pub fn assess_region_significance(
    context: &PermutationContext,
    regions: &mut [CnaRegion],
) -> CnaResult<SignificanceSummary> {
    assert!(regions.len() >= 2);
    for (index, region) in regions.iter().enumerate() {
        assert_eq!(index, region.id);
    }

    let matrix = context.matrix;
    let sig_value_threshold = context.settings.sig_value_threshold;

    for region in regions.iter_mut() {
        region.u_value = get_region_u_value(matrix, &region.range);
    }

    // Lengths of all regions, not just active regions, are kept so that every region can be
    // scored against the final table
    let length_set = LengthSet::from_regions(regions.iter());
    let max_length = length_set.max_length().unwrap();

    let mut summary = SignificanceSummary::default();
    let mut state = ExclusionState::new(regions);
    let table = loop {
        let pass_index = summary.exclusion_pass_count;
        let working_set = state.get_working_set(regions);
        let (table, sampler_stats) =
            build_null_statistic_table(context, &working_set, &length_set, pass_index)?;
        summary.exclusion_pass_count += 1;
        summary.permutation_attempt_count += sampler_stats.attempt_count;
        log::debug!(
            "Exclusion pass {pass_index}: built null statistic table with {} trials over {} region lengths from {} attempts",
            sampler_stats.accepted_count,
            table.length_count(),
            sampler_stats.attempt_count
        );

        let pass_result =
            run_exclusion_pass(regions, &state, &table, max_length, sig_value_threshold);
        for &id in pass_result.excluded_region_ids.iter() {
            regions[id].exclusion_pass = Some(pass_index);
        }
        info!(
            "Exclusion pass {pass_index}: excluded {} regions, {} regions remain active over {} probes",
            pass_result.excluded_region_ids.len(),
            pass_result.state.active_region_ids.len(),
            pass_result.state.active_probe_count
        );

        state = pass_result.state;
        if pass_result.excluded_region_ids.is_empty() || state.active_region_ids.len() < 2 {
            break table;
        }
    };

    score_regions(regions, &table, sig_value_threshold);

    Ok(summary)
}
