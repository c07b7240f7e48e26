use anyhow::Result;
use openparcel::{
    io::write_json,
    rollup::{size_extremes, summary, SizeExtremes, Summary},
    AggregationMode, FoldReport,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, SummaryArgs};
use crate::commands::{aggregate, load_config, output_path};

#[derive(Serialize)]
struct SummaryOutput {
    #[serde(flatten)]
    summary: Summary,
    culture_sizes: SizeExtremes,
    report: FoldReport,
}

pub fn run(cli: &Cli, args: &SummaryArgs) -> Result<()> {
    let config = load_config(cli, &args.input)?;
    let acc = aggregate(&config, &args.input, &[AggregationMode::Culture, AggregationMode::Group], None)?;

    let summary = summary(&acc);
    let culture_sizes = size_extremes(&summary.culture, args.limit, args.min_count);
    let out_path = output_path(&args.input, "data_summary.json");
    info!(cultures = summary.culture.len(), groups = summary.group.len(), output = %out_path.display(), "writing summary");
    write_json(&out_path, &SummaryOutput { summary, culture_sizes, report: acc.report() }, config.precision)
}
