pub mod fragmentation;
pub mod hierarchy;
pub mod rankings;
pub mod regions;
pub mod sample;
pub mod summary;

use std::path::{Path, PathBuf};

use anyhow::Result;
use openparcel::{
    build_assigner, open_source, Accumulator, AggregationMode, Pipeline, PipelineConfig,
};
use tracing::info;

use crate::cli::{Cli, InputArgs};

/// Configuration file (or defaults) with command-line overrides applied.
pub fn load_config(cli: &Cli, input: &InputArgs) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if input.sample_size.is_some() {
        config.sample_size = input.sample_size;
    }
    if input.seed.is_some() {
        config.seed = input.seed;
    }
    config.validate()?;
    Ok(config)
}

/// Output path, or `default` in the working directory.
pub fn output_path(input: &InputArgs, default: &str) -> PathBuf {
    input.output.clone().unwrap_or_else(|| PathBuf::from(default))
}

/// Run one aggregation pass over the input store; fails when every record
/// was skipped.
pub fn aggregate(
    config: &PipelineConfig,
    input: &InputArgs,
    modes: &[AggregationMode],
    regions: Option<&Path>,
) -> Result<Accumulator> {
    let assigner = if modes.iter().any(AggregationMode::needs_region) {
        Some(build_assigner(config, regions)?)
    } else {
        None
    };
    let pipeline = Pipeline::new(config, modes, assigner)?;

    info!(input = %input.input.display(), "reading parcels");
    let mut source = open_source(&input.input, &config.columns)?;
    let acc = pipeline.run(source.as_mut())?;
    acc.report().ensure_usable()?;
    Ok(acc)
}
