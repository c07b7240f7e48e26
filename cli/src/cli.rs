use std::path::PathBuf;

/// Parcel dataset aggregation CLI
#[derive(clap::Parser, Debug)]
#[command(name = "openparcel", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Group -> culture surface tree
    Hierarchy(HierarchyArgs),

    /// Flat per-culture and per-group totals with size extremes
    Summary(SummaryArgs),

    /// Per culture, regions ranked by surface
    Rankings(RegionArgs),

    /// Per region, totals and top cultures
    Regions(RegionArgs),

    /// Parcel size distribution, nationally and per region
    Fragmentation(RegionArgs),

    /// Reprojected sample of parcels as GeoJSON
    Sample(SampleArgs),
}

/// Record store and sampling options shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Parcel store (.gpkg, .shp or .csv)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output file ("-" for stdout)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Process a random sample of this many records
    #[arg(short = 'n', long)]
    pub sample_size: Option<usize>,

    /// Seed for the random sample
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct HierarchyArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Name of the root node
    #[arg(long, default_value = "RPG")]
    pub root: String,
}

#[derive(clap::Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Entries in the largest/smallest average size lists
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Minimum parcel count for the smallest average size list
    #[arg(long, default_value_t = 100)]
    pub min_count: u64,
}

#[derive(clap::Args, Debug)]
pub struct RegionArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Region boundaries (GeoJSON, optionally .gz) for the centroid strategy
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub regions: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub input: InputArgs,
}
