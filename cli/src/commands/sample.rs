use anyhow::Result;
use openparcel::{io::write_geojson, open_source, sample_features, Reprojector};
use tracing::info;

use crate::cli::{Cli, SampleArgs};
use crate::commands::{load_config, output_path};

/// Sample size when neither the command line nor the config sets one.
const DEFAULT_SAMPLE_SIZE: usize = 10_000;

pub fn run(cli: &Cli, args: &SampleArgs) -> Result<()> {
    let mut config = load_config(cli, &args.input)?;
    config.sample_size.get_or_insert(DEFAULT_SAMPLE_SIZE);
    let sampling = config.sampling();

    let reprojector = Reprojector::new(&config.source_crs, &config.target_crs)?;
    let mut source = open_source(&args.input.input, &config.columns)?;
    let sample = sample_features(source.as_mut(), sampling, &reprojector, &config)?;
    sample.report.ensure_usable()?;

    let out_path = output_path(&args.input, "map_sample.geojson");
    info!(features = sample.features.len(), output = %out_path.display(), "writing map sample");
    // Coordinates keep at least six decimals (about 0.1 m).
    write_geojson(&out_path, sample.features, config.precision.map(|p| p.max(6)))
}
