//! Run the detect command: read the probe matrix, find significant CNA regions and write all output
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use hhmmss::Hhmmss;
use log::info;
use unwrap::unwrap;

use crate::cli;
use crate::cna_detection::{DetectionContext, DetectionResult, detect_significant_regions};
use crate::cna_region::ProbeRange;
use crate::errors::CnaResult;
use crate::permutation::TrialRngSource;
use crate::probe_matrix::read_probe_matrix;
use crate::run_stats::{DetectRunStats, write_detect_run_stats};

pub const SETTINGS_FILENAME: &str = "detect.settings.json";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const REGIONS_FILENAME: &str = "cna.regions.json";
pub const SIGNIFICANT_REGIONS_FILENAME: &str = "significant.regions.tsv";

fn log_merged_regions(merged_regions: &[ProbeRange]) {
    info!("Merged significant regions: {}", merged_regions.len());
    for range in merged_regions {
        info!(
            "Region [{} : {} : {}] Length = {}",
            range.start,
            (range.start + range.end) / 2,
            range.end,
            range.len()
        );
    }
}

fn write_region_table(
    mut writer: impl Write,
    merged_regions: &[ProbeRange],
) -> std::io::Result<()> {
    writeln!(writer, "start_id\tend_id\tlength")?;
    for range in merged_regions {
        writeln!(writer, "{}\t{}\t{}", range.start, range.end, range.len())?;
    }
    writer.flush()
}

/// Write merged significant regions to a tab-delimited file with a header line
fn write_significant_regions(
    output_dir: &Utf8Path,
    merged_regions: &[ProbeRange],
) -> CnaResult<()> {
    let filename = output_dir.join(SIGNIFICANT_REGIONS_FILENAME);
    info!("Writing significant regions to file: '{filename}'");

    let f = File::create(&filename)?;
    write_region_table(BufWriter::new(f), merged_regions)?;
    Ok(())
}

/// Write all per-branch region details in json format
fn write_detection_result(output_dir: &Utf8Path, result: &DetectionResult) {
    let filename = output_dir.join(REGIONS_FILENAME);
    info!("Writing CNA region details to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create CNA region json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &result).unwrap();
}

pub fn run_detect(
    shared_settings: &cli::SharedSettings,
    settings: &cli::DetectSettings,
) -> CnaResult<()> {
    cli::write_detect_settings(&settings.output_dir, settings);

    let matrix = read_probe_matrix(&settings.matrix_filename, settings.samples_as_rows)?;

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shared_settings.thread_count)
        .build()
        .unwrap();
    let algorithm_settings = settings.get_algorithm_settings();
    let rng_source = TrialRngSource::new(settings.seed);
    let context = DetectionContext {
        algorithm_settings: &algorithm_settings,
        worker_pool: &worker_pool,
        rng_source: &rng_source,
    };

    let start = std::time::Instant::now();
    let result = detect_significant_regions(&context, &matrix, &settings.get_threshold_settings())?;
    let elapsed = start.elapsed();
    info!("Finished CNA detection. Time: {}", elapsed.hhmmssxxx());

    log_merged_regions(&result.merged_regions);

    write_significant_regions(&settings.output_dir, &result.merged_regions)?;
    write_detection_result(&settings.output_dir, &result);

    let run_stats = DetectRunStats::new(
        matrix.probe_count(),
        matrix.sample_count(),
        &result,
        elapsed.as_secs_f64(),
    );
    write_detect_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_region_table() {
        let mut buffer = Vec::new();
        write_region_table(
            &mut buffer,
            &[ProbeRange::new(2, 10), ProbeRange::new(14, 14)],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "start_id\tend_id\tlength\n2\t10\t9\n14\t14\t1\n"
        );
    }

    #[test]
    fn test_write_empty_region_table() {
        let mut buffer = Vec::new();
        write_region_table(&mut buffer, &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "start_id\tend_id\tlength\n");
    }
}
