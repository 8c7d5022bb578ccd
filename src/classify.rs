use serde::{Deserialize, Serialize};

use crate::cna_settings::ThresholdSettings;
use crate::probe_matrix::ProbeMatrix;

/// Direction of copy number change analyzed by one detection branch
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum CnaBranch {
    Amplification,
    Deletion,
}

pub struct ClassifiedMatrices {
    pub amp: ProbeMatrix,
    pub del: ProbeMatrix,
}

/// Split the input matrix into independent amplification and deletion matrices
///
/// Amplification keeps only values above the amplification threshold, deletion keeps only values
/// below the deletion threshold. All other values are set to zero.
///
pub fn classify_probe_matrix(
    matrix: &ProbeMatrix,
    thresholds: &ThresholdSettings,
) -> ClassifiedMatrices {
    let amp_threshold = thresholds.amp_threshold;
    let del_threshold = thresholds.del_threshold;
    ClassifiedMatrices {
        amp: matrix.map_values(|x| if x <= amp_threshold { 0.0 } else { x }),
        del: matrix.map_values(|x| if x >= del_threshold { 0.0 } else { x }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_probe_matrix() {
        let matrix = ProbeMatrix::from_probe_rows(vec![
            vec![0.5, -0.5, 0.1],
            vec![0.2, -0.2, 0.0],
            vec![1.5, -1.5, -0.1],
        ])
        .unwrap();
        let thresholds = ThresholdSettings {
            amp_threshold: 0.2,
            del_threshold: -0.2,
        };

        let x = classify_probe_matrix(&matrix, &thresholds);

        let expected_amp = ProbeMatrix::from_probe_rows(vec![
            vec![0.5, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![1.5, 0.0, 0.0],
        ])
        .unwrap();
        let expected_del = ProbeMatrix::from_probe_rows(vec![
            vec![0.0, -0.5, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, -1.5, 0.0],
        ])
        .unwrap();
        assert_eq!(x.amp, expected_amp);
        assert_eq!(x.del, expected_del);
    }

    #[test]
    fn test_classify_retention() {
        let rows = (0..20)
            .map(|p| (0..5).map(|s| ((p * 5 + s) as f64 - 50.0) / 25.0).collect())
            .collect();
        let matrix = ProbeMatrix::from_probe_rows(rows).unwrap();
        let thresholds = ThresholdSettings {
            amp_threshold: 0.4,
            del_threshold: -0.8,
        };

        let x = classify_probe_matrix(&matrix, &thresholds);
        for p in 0..matrix.probe_count() {
            for s in 0..matrix.sample_count() {
                let v = matrix.get(p, s);
                let amp = x.amp.get(p, s);
                let del = x.del.get(p, s);
                assert_eq!(amp, if v > 0.4 { v } else { 0.0 });
                assert_eq!(del, if v < -0.8 { v } else { 0.0 });
            }
        }
    }
}
