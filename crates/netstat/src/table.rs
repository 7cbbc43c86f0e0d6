//! Zero-defaulted count tables.

use std::ops::{AddAssign, Index};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::label::Label;

/// Counts per canonical label.
///
/// Backed by a fixed array, so every label is always present and starts at
/// zero. Serializes as a map from metric name to count in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CountTable {
    counts: [u64; Label::COUNT],
}

impl CountTable {
    /// Create a table with every label at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the given label.
    pub fn increment(&mut self, label: Label) {
        self.counts[label.index()] += 1;
    }

    /// Get the count for a label.
    pub fn get(&self, label: Label) -> u64 {
        self.counts[label.index()]
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Check if every count is zero.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterate over `(label, count)` pairs for every label, in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, u64)> + '_ {
        Label::ALL.into_iter().map(|l| (l, self.get(l)))
    }

    /// Iterate over `(metric name, count)` pairs for every label.
    pub fn metrics(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.iter().map(|(l, c)| (l.metric_name(), c))
    }
}

impl Index<Label> for CountTable {
    type Output = u64;

    fn index(&self, label: Label) -> &u64 {
        &self.counts[label.index()]
    }
}

impl AddAssign<&CountTable> for CountTable {
    fn add_assign(&mut self, other: &CountTable) {
        for (dst, src) in self.counts.iter_mut().zip(other.counts.iter()) {
            *dst += *src;
        }
    }
}

impl FromIterator<Label> for CountTable {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let mut table = Self::new();
        for label in iter {
            table.increment(label);
        }
        table
    }
}

impl Serialize for CountTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Label::COUNT))?;
        for (name, count) in self.metrics() {
            map.serialize_entry(name, &count)?;
        }
        map.end()
    }
}
