//! Label-to-index dictionary.
//!
//! Packaging stores an integer label per record rather than the label
//! string. [`LabelDict`] holds that mapping: build it from the manifest
//! with [`LabelDict::from_entries`], or load a previously finalized mapping
//! from JSON. The dictionary is read-only once packaging begins.
//!
//! Label indexing is optional — packaging without a dictionary writes
//! [`UNINDEXED_LABEL`] for every record.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::manifest::Entry;

/// The label index written when no dictionary is in use.
pub const UNINDEXED_LABEL: i32 = -1;

/// Default filename for the dictionary dump next to the chunk files.
pub const LABEL_DICT_FILE: &str = "label2idx.json";

/// An externally finalized mapping from label string to integer index.
///
/// Indices from [`from_entries`](LabelDict::from_entries) are dense and
/// assigned in sorted label order; a dictionary loaded from JSON is used
/// verbatim and may be sparse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDict {
    map: BTreeMap<String, i32>,
}

impl LabelDict {
    /// Build a dictionary from the labels present in `entries`.
    ///
    /// Unique labels are sorted and numbered from zero, so the mapping
    /// depends only on the label set, not on entry order.
    pub fn from_entries(entries: &[Entry]) -> Self {
        let labels: BTreeSet<&str> = entries.iter().map(|entry| entry.label.as_str()).collect();
        let map = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| (label.to_string(), index as i32))
            .collect();
        Self { map }
    }

    /// Wrap an existing mapping.
    pub fn from_map(map: BTreeMap<String, i32>) -> Self {
        Self { map }
    }

    /// Look up a label's index.
    pub fn index_of(&self, label: &str) -> Option<i32> {
        self.map.get(label).copied()
    }

    /// Whether `label` is present in the dictionary.
    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    /// Number of labels in the dictionary.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(label, index)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.map.iter().map(|(label, &index)| (label.as_str(), index))
    }

    /// Write the dictionary as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        log::debug!("Wrote {} labels to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a dictionary previously written by [`save`](LabelDict::save).
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
