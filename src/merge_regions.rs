use std::collections::BTreeSet;

use crate::cna_region::ProbeRange;

/// Merge significant regions from the amplification and deletion branches
///
/// All probe ids covered by either input are coalesced into the minimal set of ranges, such that
/// no two output ranges overlap or are adjacent. Output is sorted by start position.
///
pub fn merge_branch_regions(
    amp_ranges: &[ProbeRange],
    del_ranges: &[ProbeRange],
) -> Vec<ProbeRange> {
    let probe_ids = amp_ranges
        .iter()
        .chain(del_ranges.iter())
        .flat_map(|x| x.probe_indices())
        .collect::<BTreeSet<_>>();

    let mut merged_ranges = Vec::new();
    let mut current: Option<ProbeRange> = None;
    for probe_id in probe_ids {
        current = match current {
            Some(range) if probe_id == range.end + 1 => {
                Some(ProbeRange::new(range.start, probe_id))
            }
            Some(range) => {
                merged_ranges.push(range);
                Some(ProbeRange::new(probe_id, probe_id))
            }
            None => Some(ProbeRange::new(probe_id, probe_id)),
        };
    }
    if let Some(range) = current {
        merged_ranges.push(range);
    }
    merged_ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_branch_regions() {
        let amp = [ProbeRange::new(2, 7), ProbeRange::new(20, 30)];
        let del = [
            ProbeRange::new(8, 10),
            ProbeRange::new(12, 14),
            ProbeRange::new(25, 35),
        ];
        let x = merge_branch_regions(&amp, &del);
        assert_eq!(
            x,
            vec![
                ProbeRange::new(2, 10),
                ProbeRange::new(12, 14),
                ProbeRange::new(20, 35)
            ]
        );
    }

    #[test]
    fn test_merge_one_branch() {
        let amp = [ProbeRange::new(40, 45), ProbeRange::new(5, 9)];
        let x = merge_branch_regions(&amp, &[]);
        assert_eq!(x, vec![ProbeRange::new(5, 9), ProbeRange::new(40, 45)]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_branch_regions(&[], &[]).is_empty());
    }

    #[test]
    fn test_merge_matches_union() {
        let amp = [
            ProbeRange::new(0, 3),
            ProbeRange::new(10, 12),
            ProbeRange::new(50, 60),
        ];
        let del = [ProbeRange::new(5, 9), ProbeRange::new(14, 20)];
        let x = merge_branch_regions(&amp, &del);

        let expected_ids = amp
            .iter()
            .chain(del.iter())
            .flat_map(|r| r.probe_indices())
            .collect::<BTreeSet<_>>();
        let merged_ids = x
            .iter()
            .flat_map(|r| r.probe_indices())
            .collect::<BTreeSet<_>>();
        assert_eq!(merged_ids, expected_ids);

        for w in x.windows(2) {
            assert!(w[1].start > w[0].end + 1);
        }
        assert_eq!(
            x,
            vec![
                ProbeRange::new(0, 3),
                ProbeRange::new(5, 12),
                ProbeRange::new(14, 20),
                ProbeRange::new(50, 60)
            ]
        );
    }
}
