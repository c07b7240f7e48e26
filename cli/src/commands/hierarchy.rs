use anyhow::Result;
use openparcel::{io::write_json, rollup::hierarchy, AggregationMode};
use tracing::info;

use crate::cli::{Cli, HierarchyArgs};
use crate::commands::{aggregate, load_config, output_path};

pub fn run(cli: &Cli, args: &HierarchyArgs) -> Result<()> {
    let config = load_config(cli, &args.input)?;
    let acc = aggregate(&config, &args.input, &[AggregationMode::GroupCulture], None)?;

    let tree = hierarchy(&acc, &args.root);
    let out_path = output_path(&args.input, "hierarchy.json");
    info!(groups = tree.children.len(), output = %out_path.display(), "writing hierarchy");
    write_json(&out_path, &tree, config.precision)
}
