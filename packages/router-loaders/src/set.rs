use rustc_hash::FxHashSet;

use crate::loader::{DataLoader, LoaderId};

/// An insertion-ordered set of loaders. Inserting a loader twice keeps its first position.
#[derive(Clone, Default)]
pub struct LoaderSet {
    order: Vec<DataLoader>,
    ids: FxHashSet<LoaderId>,
}

impl LoaderSet {
    /// Insert a loader, returns `false` if it was already present.
    pub fn insert(&mut self, loader: DataLoader) -> bool {
        if !self.ids.insert(loader.id()) {
            return false;
        }
        self.order.push(loader);
        true
    }

    /// Whether the set contains `loader`.
    pub fn contains(&self, loader: &DataLoader) -> bool {
        self.ids.contains(&loader.id())
    }

    /// The loaders in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, DataLoader> {
        self.order.iter()
    }

    /// How many loaders the set contains.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Extend<DataLoader> for LoaderSet {
    fn extend<T: IntoIterator<Item = DataLoader>>(&mut self, iter: T) {
        for loader in iter {
            self.insert(loader);
        }
    }
}

impl FromIterator<DataLoader> for LoaderSet {
    fn from_iter<T: IntoIterator<Item = DataLoader>>(iter: T) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl IntoIterator for LoaderSet {
    type Item = DataLoader;
    type IntoIter = std::vec::IntoIter<DataLoader>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl<'a> IntoIterator for &'a LoaderSet {
    type Item = &'a DataLoader;
    type IntoIter = std::slice::Iter<'a, DataLoader>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for LoaderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.order.iter().map(|loader| loader.name()))
            .finish()
    }
}
