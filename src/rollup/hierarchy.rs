use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

use crate::aggregate::{Accumulator, AggregationMode};
use crate::rollup::by_value_desc;

/// Node of the group -> culture tree. `value` is a surface in hectares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupNode {
    pub name: Arc<str>,
    pub value: f64,
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RollupNode>,
}

impl RollupNode {
    fn leaf(name: Arc<str>, value: f64, count: u64) -> Self {
        Self { name, value, count, children: Vec::new() }
    }

    /// Parent whose value and count are the sums over `children`, sorted.
    fn parent(name: Arc<str>, mut children: Vec<RollupNode>) -> Self {
        children.sort_by(|a, b| by_value_desc(a.value, &a.name, b.value, &b.name));
        let value = children.iter().map(|c| c.value).sum();
        let count = children.iter().map(|c| c.count).sum();
        Self { name, value, count, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Two-level rollup of the `(group, culture)` map under a root named `root`.
pub fn hierarchy(acc: &Accumulator, root: &str) -> RollupNode {
    let mut groups: AHashMap<Arc<str>, Vec<RollupNode>> = AHashMap::new();
    for (key, stats) in acc.get(AggregationMode::GroupCulture).iter() {
        groups.entry(key[0].clone())
            .or_default()
            .push(RollupNode::leaf(key[1].clone(), stats.surface, stats.count));
    }

    let children = groups.into_iter()
        .map(|(group, cultures)| RollupNode::parent(group, cultures))
        .collect();
    RollupNode::parent(Arc::from(root), children)
}
