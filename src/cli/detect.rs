use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::check_required_filename;
use crate::cna_settings::{
    AlgorithmSettings, DEFAULT_ENTROPY_BIN_COUNT, DEFAULT_MAX_PERMUTATION_ATTEMPTS,
    DEFAULT_MIN_CNA_LENGTH, DEFAULT_PCC_THRESHOLD, DEFAULT_PERMUTE_COUNT,
    DEFAULT_SIG_VALUE_THRESHOLD, ThresholdSettings,
};
use crate::detect::SETTINGS_FILENAME;

#[derive(Args, Deserialize, Serialize)]
pub struct DetectSettings {
    /// Directory for all detect command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_detect_output"))]
    pub output_dir: Utf8PathBuf,

    /// Copy number measurement matrix, with one row per probe in genomic order and one column per
    /// sample.
    ///
    /// Values are delimited by tabs or spaces, lines starting with '#' are skipped. The file may be
    /// gzip compressed.
    ///
    #[arg(long = "matrix", value_name = "FILE")]
    pub matrix_filename: Utf8PathBuf,

    /// Read the matrix file as one row per sample and one column per probe
    #[arg(long)]
    pub samples_as_rows: bool,

    /// Values above this level are treated as amplification evidence
    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub amp_threshold: f64,

    /// Values below this level are treated as deletion evidence
    #[arg(long, default_value_t = -0.2, allow_negative_numbers = true)]
    pub del_threshold: f64,

    /// Adjacent probes in a contiguous CNA block are split into separate regions when the
    /// correlation of their sample values falls below this level
    #[arg(
        hide = true,
        long,
        default_value_t = DEFAULT_PCC_THRESHOLD,
        allow_negative_numbers = true
    )]
    pub pcc_threshold: f64,

    /// Number of accepted permutation trials per null statistic table
    #[arg(hide = true, long, default_value_t = DEFAULT_PERMUTE_COUNT)]
    pub permute_count: usize,

    /// Regions with an empirical p-value below this level are reported as significant
    #[arg(hide = true, long, default_value_t = DEFAULT_SIG_VALUE_THRESHOLD)]
    pub sig_value_threshold: f64,

    /// Minimum CNA region length, in probes
    #[arg(hide = true, long, default_value_t = DEFAULT_MIN_CNA_LENGTH)]
    pub min_cna_length: usize,

    /// Number of bins used to estimate the entropy of each permutation trial
    #[arg(hide = true, long, default_value_t = DEFAULT_ENTROPY_BIN_COUNT)]
    pub entropy_bin_count: usize,

    /// Maximum number of permutation attempts used to fill one null statistic table
    #[arg(hide = true, long, default_value_t = DEFAULT_MAX_PERMUTATION_ATTEMPTS)]
    pub max_permutation_attempts: usize,

    /// Random seed for permutation trials
    #[arg(hide = true, long, default_value_t = 1)]
    pub seed: u64,
}

impl DetectSettings {
    pub fn get_threshold_settings(&self) -> ThresholdSettings {
        ThresholdSettings {
            amp_threshold: self.amp_threshold,
            del_threshold: self.del_threshold,
        }
    }

    pub fn get_algorithm_settings(&self) -> AlgorithmSettings {
        AlgorithmSettings {
            pcc_threshold: self.pcc_threshold,
            permute_count: self.permute_count,
            sig_value_threshold: self.sig_value_threshold,
            min_cna_length: self.min_cna_length,
            entropy_bin_count: self.entropy_bin_count,
            max_permutation_attempts: self.max_permutation_attempts,
        }
    }
}

/// Check all settings which don't depend on the matrix file contents
fn check_detect_parameters(settings: &DetectSettings) -> SimpleResult<()> {
    if !settings.amp_threshold.is_finite() {
        bail!("--amp-threshold argument must be a finite number");
    }
    if !settings.del_threshold.is_finite() {
        bail!("--del-threshold argument must be a finite number");
    }
    if !settings.pcc_threshold.is_finite() {
        bail!("--pcc-threshold argument must be a finite number");
    }
    if settings.permute_count == 0 {
        bail!("--permute-count argument must be greater than 0");
    }
    if settings.min_cna_length == 0 {
        bail!("--min-cna-length argument must be greater than 0");
    }
    if settings.entropy_bin_count < 2 {
        bail!("--entropy-bin-count argument must be at least 2");
    }
    if !(settings.sig_value_threshold > 0.0 && settings.sig_value_threshold <= 1.0) {
        bail!("--sig-value-threshold argument must be in (0,1]");
    }
    if settings.max_permutation_attempts < settings.permute_count {
        bail!(
            "--max-permutation-attempts argument must be at least the permute count of {}",
            settings.permute_count
        );
    }
    Ok(())
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_detect_settings(
    mut settings: DetectSettings,
) -> SimpleResult<DetectSettings> {
    check_required_filename(&settings.matrix_filename, "matrix")?;
    check_detect_parameters(&settings)?;

    settings.matrix_filename = match settings.matrix_filename.canonicalize_utf8() {
        Ok(x) => x,
        Err(e) => bail!(
            "Can't canonicalize matrix file path '{}': {e}",
            settings.matrix_filename
        ),
    };

    Ok(settings)
}

/// Write detect settings out in json format
pub fn write_detect_settings(output_dir: &Utf8Path, settings: &DetectSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing detect settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create detect settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        detect: DetectSettings,
    }

    fn parse_test_settings(args: &[&str]) -> DetectSettings {
        let args = std::iter::once("cnasig").chain(args.iter().copied());
        TestCli::try_parse_from(args).unwrap().detect
    }

    #[test]
    fn test_default_settings() {
        let settings = parse_test_settings(&["--matrix", "x.tsv"]);
        assert_eq!(settings.output_dir, Utf8PathBuf::from("cnasig_detect_output"));
        assert!(!settings.samples_as_rows);
        approx::assert_ulps_eq!(settings.amp_threshold, 0.2);
        approx::assert_ulps_eq!(settings.del_threshold, -0.2);

        let algorithm_settings = settings.get_algorithm_settings();
        assert_eq!(algorithm_settings.permute_count, 20);
        assert_eq!(algorithm_settings.min_cna_length, 6);
        assert_eq!(algorithm_settings.entropy_bin_count, 16);
        approx::assert_ulps_eq!(algorithm_settings.pcc_threshold, 0.9);
        approx::assert_ulps_eq!(algorithm_settings.sig_value_threshold, 0.0476);
        assert!(check_detect_parameters(&settings).is_ok());
    }

    #[test]
    fn test_negative_threshold_args() {
        let settings = parse_test_settings(&[
            "--matrix",
            "x.tsv",
            "--del-threshold",
            "-0.5",
            "--pcc-threshold",
            "-1",
        ]);
        approx::assert_ulps_eq!(settings.get_threshold_settings().del_threshold, -0.5);
        approx::assert_ulps_eq!(settings.pcc_threshold, -1.0);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut settings = parse_test_settings(&["--matrix", "x.tsv", "--permute-count", "0"]);
        assert!(check_detect_parameters(&settings).is_err());

        settings.permute_count = 20;
        settings.entropy_bin_count = 1;
        assert!(check_detect_parameters(&settings).is_err());

        settings.entropy_bin_count = 16;
        settings.sig_value_threshold = 0.0;
        assert!(check_detect_parameters(&settings).is_err());

        settings.sig_value_threshold = 0.05;
        settings.max_permutation_attempts = 10;
        assert!(check_detect_parameters(&settings).is_err());

        settings.max_permutation_attempts = 20;
        assert!(check_detect_parameters(&settings).is_ok());
    }

    #[test]
    fn test_missing_matrix_file() {
        let settings = parse_test_settings(&["--matrix", "./test_data/not_there.tsv"]);
        assert!(validate_and_fix_detect_settings(settings).is_err());
    }
}
