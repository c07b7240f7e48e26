use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::SizeBuckets;
use crate::geom::{LAMBERT_93, WGS_84};
use crate::record::Sampling;
use crate::region::DepartmentTable;

/// How parcels are assigned to regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStrategy {
    /// Parcel centroid tested against the region polygons.
    #[default]
    Centroid,
    /// Department code attribute looked up in the department table.
    Department,
    /// Department inferred from the parcel ID prefix, then looked up.
    IdPrefix,
}

impl FromStr for RegionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "centroid" => Ok(Self::Centroid),
            "department" => Ok(Self::Department),
            "id_prefix" => Ok(Self::IdPrefix),
            _ => Err(anyhow!("Unknown region strategy: {}", s)),
        }
    }
}

/// Names of the record-store columns (GeoPackage/CSV) or fields (shapefile).
///
/// Lookups are case-insensitive; optional columns that are `None` read as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    /// GeoPackage feature table.
    pub table: String,
    pub id: Option<String>,
    pub surface: String,
    pub culture: Option<String>,
    pub group: Option<String>,
    pub department: Option<String>,
    pub geometry: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            table: "parcelles_graphiques".to_string(),
            id: Some("id_parcel".to_string()),
            surface: "surf_parc".to_string(),
            culture: Some("code_cultu".to_string()),
            group: Some("code_group".to_string()),
            department: None,
            geometry: Some("the_geom".to_string()),
        }
    }
}

/// Everything the pipeline needs to know up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bound on the number of sampled records; `None` processes everything.
    pub sample_size: Option<usize>,
    /// Sampling seed; random when absent.
    pub seed: Option<u64>,
    /// Ordered `(label, lower)` size classes, or a preset name.
    pub size_buckets: SizeBuckets,
    /// Cultures with less total surface (hectares) are dropped from rankings.
    pub significance_threshold: f64,
    /// Keep the unresolved bucket in rankings.
    pub include_unresolved: bool,
    pub unresolved_label: String,
    pub unknown_label: String,
    /// Decimal places kept in written outputs; `None` keeps full precision.
    pub precision: Option<u32>,
    /// Cultures listed per region in the regional summary.
    pub top_cultures: usize,
    pub region_strategy: RegionStrategy,
    /// GeoJSON feature property holding the region name.
    pub region_name_property: String,
    /// Department code -> region name. The metropolitan France table when absent.
    pub departments: Option<BTreeMap<String, String>>,
    pub source_crs: String,
    pub target_crs: String,
    /// Skip records whose surface is missing or zero.
    pub require_positive_surface: bool,
    pub columns: ColumnMap,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_size: None,
            seed: None,
            size_buckets: SizeBuckets::coarse(),
            significance_threshold: 10.0,
            include_unresolved: false,
            unresolved_label: "Unresolved".to_string(),
            unknown_label: "UNKNOWN".to_string(),
            precision: Some(2),
            top_cultures: 5,
            region_strategy: RegionStrategy::Centroid,
            region_name_property: "nom".to_string(),
            departments: None,
            source_crs: LAMBERT_93.to_string(),
            target_crs: WGS_84.to_string(),
            require_positive_surface: false,
            columns: ColumnMap::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.significance_threshold.is_finite() && self.significance_threshold >= 0.0,
            "significance_threshold must be a non-negative number, got {}", self.significance_threshold
        );
        ensure!(!self.unresolved_label.is_empty(), "unresolved_label must not be empty");
        ensure!(!self.unknown_label.is_empty(), "unknown_label must not be empty");
        ensure!(self.top_cultures > 0, "top_cultures must be at least 1");
        if let Some(places) = self.precision {
            ensure!(places <= 12, "precision must be at most 12 decimal places, got {}", places);
        }
        if self.sample_size == Some(0) {
            bail!("sample_size must be positive when set");
        }
        self.size_buckets.validate()
    }

    pub fn sampling(&self) -> Sampling {
        Sampling::new(self.sample_size, self.seed)
    }

    pub fn department_table(&self) -> DepartmentTable {
        match &self.departments {
            Some(map) => DepartmentTable::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            None => DepartmentTable::france(),
        }
    }
}
