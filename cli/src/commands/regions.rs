use anyhow::Result;
use openparcel::{io::write_json, rollup::regional_top_cultures, AggregationMode};
use tracing::info;

use crate::cli::{Cli, RegionArgs};
use crate::commands::{aggregate, load_config, output_path};

pub fn run(cli: &Cli, args: &RegionArgs) -> Result<()> {
    let config = load_config(cli, &args.input)?;
    let acc = aggregate(&config, &args.input, &[AggregationMode::CultureRegion], args.regions.as_deref())?;

    let regions = regional_top_cultures(&acc, config.top_cultures);
    let out_path = output_path(&args.input, "data_regions.json");
    info!(regions = regions.len(), output = %out_path.display(), "writing regional summary");
    write_json(&out_path, &regions, config.precision)
}
