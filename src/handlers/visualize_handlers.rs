//! `visualize` stage: aggregate a record table into chart-ready node sets.
//!
//! Four JSON files are written next to `out_prefix`:
//! - `{prefix}_sunburst.json`: bucket → extension tree, by count
//! - `{prefix}_sunburst_size.json`: same tree, by bytes
//! - `{prefix}_sankey.json`: total → extension flow, by count
//! - `{prefix}_sankey_size.json`: same flow, by bytes

use crate::{
    config::VisualizeConfig,
    errors::InventoryResult,
    models::aggregate::AggregationReport,
    services::{aggregator::Aggregator, record_table::read_records_from_path},
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub fn visualize(cfg: &VisualizeConfig) -> Result<Vec<PathBuf>> {
    let records = read_records_from_path(&cfg.csv)
        .with_context(|| format!("reading record table {}", cfg.csv.display()))?;
    if records.is_empty() {
        warn!("record table {} has no rows", cfg.csv.display());
    }
    info!(rows = records.len(), "total rows (files)");

    let report = Aggregator::new(cfg.top_n_extensions).aggregate(&records);
    let written = write_report(&report, &cfg.out_prefix)
        .with_context(|| format!("writing aggregation output for prefix {}", cfg.out_prefix))?;

    info!("Visualization data complete.");
    Ok(written)
}

/// Serialize all four artifacts; returns the paths written.
pub fn write_report(report: &AggregationReport, out_prefix: &str) -> InventoryResult<Vec<PathBuf>> {
    let prefix = Path::new(out_prefix);
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let outputs = [
        write_json(out_prefix, "sunburst", &report.count_tree)?,
        write_json(out_prefix, "sunburst_size", &report.byte_tree)?,
        write_json(out_prefix, "sankey", &report.count_flow)?,
        write_json(out_prefix, "sankey_size", &report.byte_flow)?,
    ];
    Ok(outputs.into())
}

fn write_json<T: Serialize>(out_prefix: &str, suffix: &str, value: &T) -> InventoryResult<PathBuf> {
    let path = PathBuf::from(format!("{out_prefix}_{suffix}.json"));
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    info!("{} written to {}", suffix, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const TABLE: &str = "\
bucket_url,bucket_name,key,last_modified,etag,size,storage_class,owner_id,owner_display_name,type
https://h/edna/,edna,a/1.csv,,,100,,,,
https://h/edna/,edna,a/2.CSV,,,50,,,,
https://h/envicloud/,envicloud,b/x.tif,,,oops,,,,
";

    fn read_json(path: &Path) -> Value {
        serde_json::from_reader(File::open(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_four_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("all_s3_files.csv");
        fs::write(&csv, TABLE).unwrap();
        let prefix = dir.path().join("viz/envidat_viz");

        let written = visualize(&VisualizeConfig {
            csv,
            out_prefix: prefix.to_string_lossy().into_owned(),
            top_n_extensions: None,
        })
        .unwrap();

        assert_eq!(written.len(), 4);
        assert!(written[1].to_string_lossy().ends_with("envidat_viz_sunburst_size.json"));

        let tree = read_json(&written[0]);
        assert_eq!(tree["metric"], "count");
        assert_eq!(tree["nodes"][0]["label"], "All files");
        assert_eq!(tree["nodes"][0]["value"], 3);

        let bytes = read_json(&written[3]);
        assert_eq!(bytes["labels"][0], "Total bytes");
        assert_eq!(bytes["total"], 150);
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = visualize(&VisualizeConfig {
            csv: dir.path().join("absent.csv"),
            out_prefix: dir.path().join("viz").to_string_lossy().into_owned(),
            top_n_extensions: Some(3),
        });
        assert!(result.is_err());
    }
}
