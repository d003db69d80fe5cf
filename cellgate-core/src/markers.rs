//! Marker name to image channel mapping.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One marker and the image plane holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerChannel {
    /// Marker name, as used for quantification column headers.
    pub name: String,
    /// Zero-based page index in the multi-channel image.
    pub channel: usize,
}

/// Ordered mapping from marker name to channel index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerIndex {
    entries: Vec<MarkerChannel>,
    by_name: HashMap<String, usize>,
}

impl MarkerIndex {
    /// Maps each name to its position in the list.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateMarker`] if a name repeats.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::from_channels(
            names
                .iter()
                .enumerate()
                .map(|(channel, name)| MarkerChannel {
                    name: name.as_ref().to_string(),
                    channel,
                })
                .collect(),
        )
    }

    /// Builds the index from explicit channel assignments, keeping order.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateMarker`] if a name repeats.
    pub fn from_channels(entries: Vec<MarkerChannel>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), i).is_some() {
                return Err(Error::DuplicateMarker(entry.name.clone()));
            }
        }
        Ok(Self { entries, by_name })
    }

    /// Channel index of a marker.
    #[must_use]
    pub fn channel(&self, marker: &str) -> Option<usize> {
        self.by_name.get(marker).map(|&i| self.entries[i].channel)
    }

    /// Returns true if the marker is indexed.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        self.by_name.contains_key(marker)
    }

    /// Marker names in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Marker names in index order, owned.
    #[must_use]
    pub fn name_list(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    /// All entries in index order.
    #[must_use]
    pub fn entries(&self) -> &[MarkerChannel] {
        &self.entries
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no markers are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
