use anyhow::Result;
use openparcel::{
    io::write_json,
    rollup::{national_distribution, regional_histogram, BucketShare, RegionHistogram},
    AggregationMode,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, RegionArgs};
use crate::commands::{aggregate, load_config, output_path};

#[derive(Serialize)]
struct FragmentationOutput {
    national: Vec<BucketShare>,
    regions: Vec<RegionHistogram>,
}

pub fn run(cli: &Cli, args: &RegionArgs) -> Result<()> {
    let config = load_config(cli, &args.input)?;
    let acc = aggregate(&config, &args.input, &[AggregationMode::RegionSize], args.regions.as_deref())?;

    let output = FragmentationOutput {
        national: national_distribution(&acc, &config.size_buckets),
        regions: regional_histogram(&acc, &config.size_buckets),
    };
    let out_path = output_path(&args.input, "fragmentation.json");
    info!(regions = output.regions.len(), output = %out_path.display(), "writing fragmentation");
    write_json(&out_path, &output, config.precision)
}
