// src/dataset/datasets.rs

use serde::Serialize;

use super::dataset::Dataset;

/// An ordered collection of datasets keyed by name.
///
/// The pipeline uses one instance as the run-scoped registry (the dataset
/// stack) and builds short-lived ones for each transformer's inputs and
/// outputs. Names are unique: adding a dataset whose name is already present
/// replaces the previous one and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Datasets {
    items: Vec<Dataset>,
}

impl Datasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dataset: Dataset) {
        match self.items.iter_mut().find(|d| d.name() == dataset.name()) {
            Some(existing) => *existing = dataset,
            None => self.items.push(dataset),
        }
    }

    /// Adds every dataset of `other`, in order.
    pub fn merge(&mut self, other: Datasets) {
        for dataset in other {
            self.add(dataset);
        }
    }

    pub fn get_from_name(&self, name: &str) -> Option<&Dataset> {
        self.items.iter().find(|d| d.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_from_name(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|d| d.name()).collect()
    }

    pub fn total_row_count(&self) -> usize {
        self.items.iter().map(Dataset::count).sum()
    }

    /// True when there is no dataset at all or every dataset has zero rows.
    pub fn is_empty(&self) -> bool {
        self.total_row_count() == 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dataset> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl IntoIterator for Datasets {
    type Item = Dataset;
    type IntoIter = std::vec::IntoIter<Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Datasets {
    type Item = &'a Dataset;
    type IntoIter = std::slice::Iter<'a, Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Dataset> for Datasets {
    fn from_iter<I: IntoIterator<Item = Dataset>>(iter: I) -> Self {
        let mut datasets = Datasets::new();
        for dataset in iter {
            datasets.add(dataset);
        }
        datasets
    }
}
