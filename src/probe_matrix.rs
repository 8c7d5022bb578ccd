//! Probe by sample measurement matrix, and reading it from delimited text files
//!

use std::fs::File;
use std::io::{BufRead, BufReader, Read};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use log::info;

use crate::errors::{CnaError, CnaResult};

/// Dense probe by sample matrix
///
/// Rows are probes in genomic order, so that the row index can be used as a position proxy.
/// Columns are samples. Values are stored in row-major order.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeMatrix {
    probe_count: usize,
    sample_count: usize,
    values: Vec<f64>,
}

impl ProbeMatrix {
    /// Build a matrix from one value vector per probe
    ///
    /// Fails if there are no probes or samples, if the probe rows do not all have the same
    /// sample count, or if any value is not finite.
    ///
    pub fn from_probe_rows(rows: Vec<Vec<f64>>) -> CnaResult<Self> {
        let probe_count = rows.len();
        let sample_count = rows.first().map(|x| x.len()).unwrap_or(0);
        if probe_count == 0 || sample_count == 0 {
            return Err(CnaError::EmptyInput);
        }

        let mut values = Vec::with_capacity(probe_count * sample_count);
        for (probe_index, row) in rows.into_iter().enumerate() {
            if row.len() != sample_count {
                return Err(CnaError::InvalidMatrixShape(format!(
                    "probe {probe_index} has {} sample values, expected {sample_count}",
                    row.len()
                )));
            }
            if let Some(sample_index) = row.iter().position(|x| !x.is_finite()) {
                return Err(CnaError::NonFiniteValue {
                    probe: probe_index,
                    sample: sample_index,
                });
            }
            values.extend(row);
        }

        Ok(Self {
            probe_count,
            sample_count,
            values,
        })
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn get(&self, probe_index: usize, sample_index: usize) -> f64 {
        self.values[probe_index * self.sample_count + sample_index]
    }

    /// All sample values for one probe
    pub fn probe_values(&self, probe_index: usize) -> &[f64] {
        let start = probe_index * self.sample_count;
        &self.values[start..start + self.sample_count]
    }

    /// Sum of all sample values for one probe
    pub fn probe_sum(&self, probe_index: usize) -> f64 {
        self.probe_values(probe_index).iter().sum()
    }

    /// Return a same-shape copy of the matrix with `f` applied to every value
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            probe_count: self.probe_count,
            sample_count: self.sample_count,
            values: self.values.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for sample_index in 0..self.sample_count {
            for probe_index in 0..self.probe_count {
                values.push(self.get(probe_index, sample_index));
            }
        }
        Self {
            probe_count: self.sample_count,
            sample_count: self.probe_count,
            values,
        }
    }
}

fn open_matrix_file(filename: &Utf8Path) -> CnaResult<Box<dyn BufRead>> {
    let file = File::open(filename)?;
    let reader: Box<dyn Read> = if filename.extension() == Some("gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn parse_matrix_rows(reader: impl BufRead, filename: &Utf8Path) -> CnaResult<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|word| {
                word.parse::<f64>().map_err(|_| CnaError::Parse {
                    filename: filename.to_owned(),
                    line: line_index + 1,
                    value: word.to_string(),
                })
            })
            .collect::<CnaResult<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a whitespace delimited numeric matrix file, optionally gzip compressed
///
/// Empty lines and lines starting with '#' are skipped.
///
/// # Arguments
/// * `samples_as_rows` - If true, each line of the file holds one sample and the matrix is
///   transposed after reading, otherwise each line holds one probe.
///
pub fn read_probe_matrix(filename: &Utf8Path, samples_as_rows: bool) -> CnaResult<ProbeMatrix> {
    info!("Reading probe matrix from file: '{filename}'");

    let reader = open_matrix_file(filename)?;
    let matrix = ProbeMatrix::from_probe_rows(parse_matrix_rows(reader, filename)?)?;
    let matrix = if samples_as_rows {
        matrix.transpose()
    } else {
        matrix
    };

    info!(
        "Probe matrix has {} probes and {} samples",
        matrix.probe_count(),
        matrix.sample_count()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probe_rows() {
        let m = ProbeMatrix::from_probe_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();
        assert_eq!(m.probe_count(), 3);
        assert_eq!(m.sample_count(), 2);
        assert_eq!(m.get(1, 1), 4.0);
        assert_eq!(m.probe_values(2), &[5.0, 6.0]);
        approx::assert_ulps_eq!(m.probe_sum(0), 3.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            ProbeMatrix::from_probe_rows(Vec::new()),
            Err(CnaError::EmptyInput)
        ));
        assert!(matches!(
            ProbeMatrix::from_probe_rows(vec![Vec::new(), Vec::new()]),
            Err(CnaError::EmptyInput)
        ));
    }

    #[test]
    fn test_ragged_rows() {
        let rc = ProbeMatrix::from_probe_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(rc, Err(CnaError::InvalidMatrixShape(_))));
    }

    #[test]
    fn test_non_finite_value() {
        let rc = ProbeMatrix::from_probe_rows(vec![vec![1.0, 2.0], vec![3.0, f64::NAN]]);
        assert!(matches!(
            rc,
            Err(CnaError::NonFiniteValue {
                probe: 1,
                sample: 1
            })
        ));
    }

    #[test]
    fn test_transpose() {
        let m = ProbeMatrix::from_probe_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .unwrap();
        let t = m.transpose();
        assert_eq!(t.probe_count(), 3);
        assert_eq!(t.sample_count(), 2);
        assert_eq!(t.probe_values(2), &[3.0, 6.0]);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_parse_matrix_rows() {
        let text = "# probe values\n0.5\t-0.25\n\n1 2\n";
        let rows = parse_matrix_rows(text.as_bytes(), Utf8Path::new("test.tsv")).unwrap();
        assert_eq!(rows, vec![vec![0.5, -0.25], vec![1.0, 2.0]]);

        let text = "0.5\tx\n";
        let rc = parse_matrix_rows(text.as_bytes(), Utf8Path::new("test.tsv"));
        assert!(matches!(rc, Err(CnaError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_read_gzipped_samples_as_rows() {
        use std::io::Write;

        use camino::Utf8PathBuf;
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let filename = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap()
            .join(format!("cnasig_matrix_{}.tsv.gz", std::process::id()));
        {
            let f = File::create(&filename).unwrap();
            let mut encoder = GzEncoder::new(f, Compression::default());
            encoder
                .write_all(b"# one row per sample\n1\t2\t3\n4\t5\t6\n")
                .unwrap();
            encoder.finish().unwrap();
        }

        let m = read_probe_matrix(&filename, true);
        std::fs::remove_file(&filename).unwrap();
        let m = m.unwrap();

        assert_eq!(m.probe_count(), 3);
        assert_eq!(m.sample_count(), 2);
        assert_eq!(m.probe_values(0), &[1.0, 4.0]);
        assert_eq!(m.probe_values(2), &[3.0, 6.0]);
    }
}
