use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Result};
use serde::{Deserialize, Serialize};

/// A size class covering `[lower, next lower)` hectares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeBucket {
    pub label: String,
    pub lower: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeBucketsRepr {
    Preset(String),
    List(Vec<SizeBucket>),
}

/// Ordered half-open partition of `[0, inf)` into labelled size classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SizeBucketsRepr", into = "Vec<SizeBucket>")]
pub struct SizeBuckets {
    buckets: Vec<SizeBucket>,
    labels: Vec<Arc<str>>,
}

impl SizeBuckets {
    /// Validated bucket list.
    pub fn new(buckets: Vec<SizeBucket>) -> Result<Self> {
        let labels = buckets.iter().map(|b| Arc::from(b.label.as_str())).collect();
        let sizes = Self { buckets, labels };
        sizes.validate()?;
        Ok(sizes)
    }

    fn from_static(pairs: &[(&str, f64)]) -> Self {
        let buckets: Vec<SizeBucket> = pairs.iter()
            .map(|&(label, lower)| SizeBucket { label: label.to_string(), lower })
            .collect();
        let labels = buckets.iter().map(|b| Arc::from(b.label.as_str())).collect();
        Self { buckets, labels }
    }

    /// `[0,1) [1,5) [5,10) [10,20) [20,inf)`.
    pub fn coarse() -> Self {
        Self::from_static(&[("< 1 ha", 0.0), ("1 - 5 ha", 1.0), ("5 - 10 ha", 5.0), ("10 - 20 ha", 10.0), ("> 20 ha", 20.0)])
    }

    /// `[0,0.5) [0.5,2) [2,10) [10,50) [50,inf)`.
    pub fn fine() -> Self {
        Self::from_static(&[("micro", 0.0), ("petite", 0.5), ("moyenne", 2.0), ("grande", 10.0), ("tres_grande", 50.0)])
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "coarse" => Ok(Self::coarse()),
            "fine" => Ok(Self::fine()),
            _ => Err(anyhow!("Unknown size bucket preset: {}", name)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.buckets.is_empty(), "size_buckets must not be empty");
        ensure!(self.buckets[0].lower == 0.0, "first size bucket must start at 0, got {}", self.buckets[0].lower);
        for pair in self.buckets.windows(2) {
            if !(pair[1].lower.is_finite() && pair[1].lower > pair[0].lower) {
                bail!("size bucket lower bounds must be finite and strictly increasing: {} then {}",
                    pair[0].lower, pair[1].lower);
            }
        }
        for (i, bucket) in self.buckets.iter().enumerate() {
            ensure!(!bucket.label.is_empty(), "size bucket {} has an empty label", i);
            ensure!(
                !self.buckets[..i].iter().any(|b| b.label == bucket.label),
                "duplicate size bucket label: {}", bucket.label
            );
        }
        Ok(())
    }

    #[inline] pub fn len(&self) -> usize { self.buckets.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.buckets.is_empty() }

    #[inline] pub fn buckets(&self) -> &[SizeBucket] { &self.buckets }

    /// Labels in bucket order.
    #[inline] pub fn labels(&self) -> &[Arc<str>] { &self.labels }

    /// Index of the bucket containing `surface` (a non-negative hectare value).
    pub fn classify(&self, surface: f64) -> usize {
        self.buckets.partition_point(|b| b.lower <= surface).saturating_sub(1)
    }

    #[inline]
    pub fn label_for(&self, surface: f64) -> &Arc<str> {
        &self.labels[self.classify(surface)]
    }
}

impl TryFrom<SizeBucketsRepr> for SizeBuckets {
    type Error = anyhow::Error;

    fn try_from(repr: SizeBucketsRepr) -> Result<Self> {
        match repr {
            SizeBucketsRepr::Preset(name) => Self::preset(&name),
            SizeBucketsRepr::List(buckets) => Self::new(buckets),
        }
    }
}

impl From<SizeBuckets> for Vec<SizeBucket> {
    fn from(sizes: SizeBuckets) -> Self {
        sizes.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        SizeBuckets::coarse().validate().unwrap();
        SizeBuckets::fine().validate().unwrap();
        assert!(SizeBuckets::preset("medium").is_err());
    }

    #[test]
    fn classify_is_half_open() {
        let sizes = SizeBuckets::coarse();
        assert_eq!(&**sizes.label_for(0.0), "< 1 ha");
        assert_eq!(&**sizes.label_for(0.999), "< 1 ha");
        assert_eq!(&**sizes.label_for(1.0), "1 - 5 ha");
        assert_eq!(&**sizes.label_for(19.99), "10 - 20 ha");
        assert_eq!(&**sizes.label_for(20.0), "> 20 ha");
        assert_eq!(&**sizes.label_for(1e9), "> 20 ha");
    }

    #[test]
    fn every_value_lands_in_exactly_one_bucket() {
        let sizes = SizeBuckets::fine();
        for i in 0..2000 {
            let surface = i as f64 * 0.05;
            let hits = sizes.buckets().iter().enumerate()
                .filter(|(j, b)| {
                    let upper = sizes.buckets().get(j + 1).map_or(f64::INFINITY, |n| n.lower);
                    b.lower <= surface && surface < upper
                })
                .map(|(j, _)| j)
                .collect::<Vec<_>>();
            assert_eq!(hits, vec![sizes.classify(surface)]);
        }
    }

    #[test]
    fn invalid_lists_are_rejected() {
        let bucket = |label: &str, lower| SizeBucket { label: label.into(), lower };
        assert!(SizeBuckets::new(vec![]).is_err());
        assert!(SizeBuckets::new(vec![bucket("a", 1.0)]).is_err());
        assert!(SizeBuckets::new(vec![bucket("a", 0.0), bucket("b", 5.0), bucket("c", 5.0)]).is_err());
        assert!(SizeBuckets::new(vec![bucket("a", 0.0), bucket("a", 5.0)]).is_err());
        assert!(SizeBuckets::new(vec![bucket("a", 0.0), bucket("b", f64::INFINITY)]).is_err());
        assert!(SizeBuckets::new(vec![bucket("all", 0.0)]).is_ok());
    }

    #[test]
    fn serde_accepts_preset_or_list() {
        let fine: SizeBuckets = serde_json::from_str(r#""fine""#).unwrap();
        assert_eq!(fine, SizeBuckets::fine());
        let custom: SizeBuckets = serde_json::from_str(r#"[{"label":"small","lower":0},{"label":"big","lower":3}]"#).unwrap();
        assert_eq!(custom.labels().len(), 2);
        assert_eq!(custom.classify(3.0), 1);
        assert_eq!(serde_json::to_value(&custom).unwrap()[1]["label"], "big");
    }
}
