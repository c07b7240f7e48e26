use std::sync::Arc;

use anyhow::Result;
use openparcel::{
    io::write_json,
    rollup::{ranked_regions, rankings, RankingOptions, Rankings},
    AggregationMode,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, RegionArgs};
use crate::commands::{aggregate, load_config, output_path};

#[derive(Serialize)]
struct RankingsOutput {
    cultures: Rankings,
    regions: Vec<Arc<str>>,
}

pub fn run(cli: &Cli, args: &RegionArgs) -> Result<()> {
    let config = load_config(cli, &args.input)?;
    let acc = aggregate(&config, &args.input, &[AggregationMode::CultureRegion], args.regions.as_deref())?;

    let cultures = rankings(&acc, &RankingOptions::from(&config));
    let output = RankingsOutput { regions: ranked_regions(&cultures), cultures };
    let out_path = output_path(&args.input, "culture_rankings.json");
    info!(
        cultures = output.cultures.len(),
        threshold = config.significance_threshold,
        output = %out_path.display(),
        "writing rankings"
    );
    write_json(&out_path, &output, config.precision)
}
