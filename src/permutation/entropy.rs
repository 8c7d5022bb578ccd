use statrs::statistics::Statistics;

/// Find the bin index of `value` among `bin_count` equal width bins spanning [min, max]
///
/// Each bin is closed at its upper edge, with values at `min` assigned to the first bin. All values
/// are assigned to the first bin when the range is empty.
///
fn get_bin_index(value: f64, min: f64, max: f64, bin_count: usize) -> usize {
    if max <= min {
        return 0;
    }
    let bin_width = (max - min) / bin_count as f64;
    let index = ((value - min) / bin_width).ceil() as i64 - 1;
    index.clamp(0, bin_count as i64 - 1) as usize
}

/// Shannon entropy of the binned value distribution, normalized by the log of the bin count
///
/// Bins whose members sum to zero are left out of the distribution. Returns zero for empty input.
///
pub fn get_normalized_entropy(values: &[f64], bin_count: usize) -> f64 {
    assert!(bin_count > 1);
    if values.is_empty() {
        return 0.0;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut bin_sizes = vec![0usize; bin_count];
    let mut bin_sums = vec![0.0; bin_count];
    for &value in values {
        let bin_index = get_bin_index(value, min, max, bin_count);
        bin_sizes[bin_index] += 1;
        bin_sums[bin_index] += value;
    }

    let bin_weights = bin_sizes
        .iter()
        .zip(bin_sums.iter())
        .map(|(&size, &sum)| if sum != 0.0 { size as f64 } else { 0.0 })
        .collect::<Vec<_>>();
    let total: f64 = bin_weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let entropy: f64 = bin_weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / total;
            -p * p.ln()
        })
        .sum();
    entropy / (bin_count as f64).ln()
}

/// Accept permutation trials only while their entropy stays below the running mean entropy of all
/// previously accepted trials
///
/// The first trial offered is always accepted.
///
#[derive(Default)]
pub struct EntropyAcceptanceFilter {
    accepted_entropy: Vec<f64>,
}

impl EntropyAcceptanceFilter {
    /// Return true if the trial with `entropy` is accepted
    pub fn offer(&mut self, entropy: f64) -> bool {
        let is_accepted = self.accepted_entropy.is_empty() || entropy < self.mean_entropy();
        if is_accepted {
            self.accepted_entropy.push(entropy);
        }
        is_accepted
    }

    /// Mean entropy of accepted trials, NaN if no trial has been accepted
    pub fn mean_entropy(&self) -> f64 {
        self.accepted_entropy.iter().mean()
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted_entropy.len()
    }
}
