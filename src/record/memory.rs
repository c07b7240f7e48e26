use anyhow::Result;

use crate::record::{sample_indices, ParcelRecord, RecordSource, Sampling};

/// Records held in memory, e.g. a CSV export or a test fixture.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<ParcelRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<ParcelRecord>) -> Self {
        Self { records }
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn records(&self) -> &[ParcelRecord] { &self.records }
}

impl From<Vec<ParcelRecord>> for MemorySource {
    fn from(records: Vec<ParcelRecord>) -> Self {
        Self::new(records)
    }
}

impl RecordSource for MemorySource {
    fn count(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.records.len() as u64))
    }

    fn for_each(&mut self, sampling: Sampling, f: &mut dyn FnMut(ParcelRecord)) -> Result<()> {
        match sampling {
            Sampling::Full => self.records.iter().cloned().for_each(f),
            Sampling::Random { size, seed } => sample_indices(self.records.len(), size, seed)
                .into_iter()
                .for_each(|i| f(self.records[i].clone())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Surface;

    fn records(n: usize) -> Vec<ParcelRecord> {
        (0..n)
            .map(|i| ParcelRecord { id: Some(i.to_string()), surface: Surface::Hectares(i as f64), ..Default::default() })
            .collect()
    }

    #[test]
    fn full_scan_yields_everything_in_order() {
        let mut source = MemorySource::new(records(4));
        let mut ids = Vec::new();
        source.for_each(Sampling::Full, &mut |r| ids.push(r.id.unwrap())).unwrap();
        assert_eq!(ids, ["0", "1", "2", "3"]);
    }

    #[test]
    fn random_sample_is_bounded_and_distinct() {
        let mut source = MemorySource::new(records(50));
        let mut ids = Vec::new();
        source.for_each(Sampling::Random { size: 20, seed: 3 }, &mut |r| ids.push(r.id.unwrap())).unwrap();
        assert_eq!(ids.len(), 20);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }
}
