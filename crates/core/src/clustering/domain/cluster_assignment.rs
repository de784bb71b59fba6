use std::collections::BTreeMap;

/// Identity cluster label.
pub type ClusterId = u32;

/// Total mapping from record index to cluster id.
///
/// Ids are dense (`0..cluster_count`) and numbered in order of each
/// cluster's lowest record index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterAssignment {
    labels: Vec<ClusterId>,
}

impl ClusterAssignment {
    /// Renumbers arbitrary labels into the canonical dense form.
    pub fn from_labels<I: IntoIterator<Item = ClusterId>>(labels: I) -> Self {
        let mut renumber: BTreeMap<ClusterId, ClusterId> = BTreeMap::new();
        let labels = labels
            .into_iter()
            .map(|label| {
                let next = renumber.len() as ClusterId;
                *renumber.entry(label).or_insert(next)
            })
            .collect();
        Self { labels }
    }

    pub fn labels(&self) -> &[ClusterId] {
        &self.labels
    }

    pub fn label_of(&self, record_index: usize) -> Option<ClusterId> {
        self.labels.get(record_index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.labels.iter().max().map_or(0, |max| *max as usize + 1)
    }

    /// Record indices per cluster, ascending within each cluster.
    pub fn groups(&self) -> BTreeMap<ClusterId, Vec<usize>> {
        let mut groups: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
        for (index, label) in self.labels.iter().enumerate() {
            groups.entry(*label).or_default().push(index);
        }
        groups
    }
}
