use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// An inclusive range of probe indices, [start, end]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProbeRange {
    pub start: usize,
    pub end: usize,
}

impl ProbeRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "Invalid probe range [{start}, {end}]");
        Self { start, end }
    }

    /// Number of probes in the range
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn probe_indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for ProbeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum SignificanceTag {
    #[default]
    NotSignificant,
    Significant,
}

/// A candidate copy number alteration region and its significance test state
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CnaRegion {
    pub id: usize,
    pub range: ProbeRange,

    /// Observed statistic: mean absolute value over all probes and samples in the region
    pub u_value: f64,

    /// Empirical significance from the final null statistic table
    pub p_value: f64,

    pub tag: SignificanceTag,

    /// Index of the exclusion pass which removed this region from the permutation working set,
    /// if it was removed
    pub exclusion_pass: Option<usize>,
}

impl CnaRegion {
    pub fn new(id: usize, range: ProbeRange) -> Self {
        Self {
            id,
            range,
            u_value: 0.0,
            p_value: 1.0,
            tag: SignificanceTag::NotSignificant,
            exclusion_pass: None,
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_significant(&self) -> bool {
        self.tag == SignificanceTag::Significant
    }
}

impl fmt::Display for CnaRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CNARegion{{ id = {}, {}, uValue = {:.4}, pValue = {:.4e} }}",
            self.id, self.range, self.u_value, self.p_value
        )
    }
}

/// Distinct region lengths in ascending order, with a direct lookup from length to column index
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LengthSet {
    lengths: Vec<usize>,
    columns: HashMap<usize, usize>,
}

impl LengthSet {
    pub fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let lengths = lengths
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let columns = lengths
            .iter()
            .enumerate()
            .map(|(column, &length)| (length, column))
            .collect();
        Self { lengths, columns }
    }

    pub fn from_regions<'a>(regions: impl IntoIterator<Item = &'a CnaRegion>) -> Self {
        Self::from_lengths(regions.into_iter().map(|x| x.len()))
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.lengths.last().copied()
    }

    pub fn column(&self, length: usize) -> Option<usize> {
        self.columns.get(&length).copied()
    }
}
