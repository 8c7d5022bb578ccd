//! Segment a thresholded probe matrix into candidate CNA regions
//!

use itertools::Itertools;
use statrs::statistics::Statistics;

use crate::cna_region::{CnaRegion, LengthSet, ProbeRange};
use crate::cna_settings::AlgorithmSettings;
use crate::probe_matrix::ProbeMatrix;

pub struct SegmentationResult {
    /// Number of probes with a nonzero value in any sample
    pub candidate_probe_count: usize,

    /// Maximal runs of adjacent candidate probes
    pub blocks: Vec<ProbeRange>,

    /// CNA regions found by splitting each block on low correlation between adjacent probes
    pub regions: Vec<CnaRegion>,
}

impl SegmentationResult {
    /// Total number of probes in all CNA regions
    pub fn active_probe_count(&self) -> usize {
        self.regions.iter().map(|x| x.len()).sum()
    }

    pub fn length_set(&self) -> LengthSet {
        LengthSet::from_regions(&self.regions)
    }
}

/// Indices of all probes with a nonzero value in at least one sample, in ascending order
pub fn get_candidate_probes(matrix: &ProbeMatrix) -> Vec<usize> {
    (0..matrix.probe_count())
        .filter(|&probe_index| matrix.probe_values(probe_index).iter().any(|&x| x != 0.0))
        .collect()
}

/// Group sorted probe indices into maximal runs of consecutive indices
pub fn get_contiguous_blocks(candidate_probes: &[usize]) -> Vec<ProbeRange> {
    let mut blocks = Vec::new();
    let mut probes = candidate_probes.iter().copied();
    let Some(first) = probes.next() else {
        return blocks;
    };

    let mut block_start = first;
    let mut block_end = first;
    for probe_index in probes {
        assert!(probe_index > block_end, "Candidate probes are not sorted");
        if probe_index != block_end + 1 {
            blocks.push(ProbeRange::new(block_start, block_end));
            block_start = probe_index;
        }
        block_end = probe_index;
    }
    blocks.push(ProbeRange::new(block_start, block_end));
    blocks
}

/// Pearson correlation coefficient of two equal length value vectors
///
/// Returns None if the correlation is undefined, which occurs when there are fewer than 2 values
/// or either vector has zero variance.
///
pub fn get_pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return None;
    }

    let x_std_dev = x.std_dev();
    let y_std_dev = y.std_dev();
    if !(x_std_dev > 0.0 && y_std_dev > 0.0) {
        return None;
    }
    Some(x.covariance(y) / (x_std_dev * y_std_dev))
}

/// Split one block of adjacent candidate probes wherever adjacent probe correlation drops below
/// `pcc_threshold`, keeping only sub-regions of at least `min_cna_length` probes
///
/// An undefined correlation never splits the block.
///
fn split_block_on_correlation(
    matrix: &ProbeMatrix,
    block: &ProbeRange,
    pcc_threshold: f64,
    min_cna_length: usize,
) -> Vec<ProbeRange> {
    let mut sub_regions = Vec::new();
    let mut add_sub_region = |start: usize, end: usize| {
        let sub_region = ProbeRange::new(start, end);
        if sub_region.len() >= min_cna_length {
            sub_regions.push(sub_region);
        }
    };

    let mut sub_region_start = block.start;
    for (probe_index, next_probe_index) in block.probe_indices().tuple_windows() {
        let correlation = get_pearson_correlation(
            matrix.probe_values(probe_index),
            matrix.probe_values(next_probe_index),
        );
        if let Some(correlation) = correlation
            && correlation < pcc_threshold
        {
            add_sub_region(sub_region_start, probe_index);
            sub_region_start = next_probe_index;
        }
    }
    add_sub_region(sub_region_start, block.end);

    sub_regions
}

/// Find all candidate CNA regions in a thresholded probe matrix
///
/// Regions are returned in probe order with sequential ids starting from 0.
///
pub fn segment_cna_regions(
    matrix: &ProbeMatrix,
    settings: &AlgorithmSettings,
) -> SegmentationResult {
    let candidate_probes = get_candidate_probes(matrix);
    let blocks = get_contiguous_blocks(&candidate_probes);
    let regions = blocks
        .iter()
        .flat_map(|block| {
            split_block_on_correlation(
                matrix,
                block,
                settings.pcc_threshold,
                settings.min_cna_length,
            )
        })
        .enumerate()
        .map(|(id, range)| CnaRegion::new(id, range))
        .collect();

    SegmentationResult {
        candidate_probe_count: candidate_probes.len(),
        blocks,
        regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_matrix(rows: &[&[f64]]) -> ProbeMatrix {
        ProbeMatrix::from_probe_rows(rows.iter().map(|x| x.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_get_contiguous_blocks() {
        let blocks = get_contiguous_blocks(&[1, 2, 3, 5, 8, 9]);
        assert_eq!(
            blocks,
            vec![
                ProbeRange::new(1, 3),
                ProbeRange::new(5, 5),
                ProbeRange::new(8, 9)
            ]
        );

        // A lone probe after a break must not be joined to the following probe
        let blocks = get_contiguous_blocks(&[0, 1, 4, 6, 7]);
        assert_eq!(
            blocks,
            vec![
                ProbeRange::new(0, 1),
                ProbeRange::new(4, 4),
                ProbeRange::new(6, 7)
            ]
        );

        assert!(get_contiguous_blocks(&[]).is_empty());
    }

    #[test]
    fn test_get_pearson_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let z = [4.0, 3.0, 2.0, 1.0];
        approx::assert_abs_diff_eq!(get_pearson_correlation(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(
            get_pearson_correlation(&x, &z).unwrap(),
            -1.0,
            epsilon = 1e-12
        );

        assert_eq!(get_pearson_correlation(&x, &[5.0; 4]), None);
        assert_eq!(get_pearson_correlation(&[1.0], &[2.0]), None);
    }

    #[test]
    fn test_uniform_block_scenario() {
        // 10 probes by 3 samples, rows 2-7 hold 5 in every sample
        let rows = (0..10)
            .map(|p| vec![if (2..=7).contains(&p) { 5.0 } else { 0.0 }; 3])
            .collect();
        let matrix = ProbeMatrix::from_probe_rows(rows).unwrap();

        let x = segment_cna_regions(&matrix, &AlgorithmSettings::default());
        assert_eq!(x.candidate_probe_count, 6);
        assert_eq!(x.blocks, vec![ProbeRange::new(2, 7)]);
        assert_eq!(x.regions.len(), 1);
        assert_eq!(x.regions[0].range, ProbeRange::new(2, 7));
        assert_eq!(x.active_probe_count(), 6);
        assert_eq!(x.length_set().lengths(), &[6]);
    }

    #[test]
    fn test_no_candidates() {
        let matrix = get_matrix(&[&[0.0, 0.0], &[0.0, 0.0]]);
        let x = segment_cna_regions(&matrix, &AlgorithmSettings::default());
        assert_eq!(x.candidate_probe_count, 0);
        assert!(x.blocks.is_empty());
        assert!(x.regions.is_empty());
        assert_eq!(x.active_probe_count(), 0);
    }

    #[test]
    fn test_correlation_split() {
        let up: &[f64] = &[1.0, 2.0, 3.0];
        let down: &[f64] = &[3.0, 2.0, 1.0];
        let zero: &[f64] = &[0.0, 0.0, 0.0];

        // Block [1,14] splits between probes 7/8 and 10/11
        let mut rows = vec![zero];
        rows.extend([up; 7]);
        rows.extend([down; 3]);
        rows.extend([up; 4]);
        rows.push(zero);
        let matrix = get_matrix(&rows);
        let settings = AlgorithmSettings {
            min_cna_length: 3,
            ..Default::default()
        };

        let x = segment_cna_regions(&matrix, &settings);
        assert_eq!(x.blocks, vec![ProbeRange::new(1, 14)]);
        let ranges = x.regions.iter().map(|r| r.range).collect::<Vec<_>>();
        assert_eq!(
            ranges,
            vec![
                ProbeRange::new(1, 7),
                ProbeRange::new(8, 10),
                ProbeRange::new(11, 14)
            ]
        );
        let ids = x.regions.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1, 2]);

        // The middle sub-region is dropped at a higher length threshold
        let settings = AlgorithmSettings {
            min_cna_length: 4,
            ..Default::default()
        };
        let x = segment_cna_regions(&matrix, &settings);
        let ranges = x.regions.iter().map(|r| r.range).collect::<Vec<_>>();
        assert_eq!(ranges, vec![ProbeRange::new(1, 7), ProbeRange::new(11, 14)]);
        assert_eq!(x.active_probe_count(), 11);
        assert_eq!(x.length_set().lengths(), &[4, 7]);

        // Every split point has adjacent correlation below the threshold
        for w in x.regions.windows(2) {
            let r = get_pearson_correlation(
                matrix.probe_values(w[0].range.end),
                matrix.probe_values(w[0].range.end + 1),
            );
            assert!(r.unwrap() < settings.pcc_threshold);
        }
    }
}
