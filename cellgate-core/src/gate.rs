//! Gate records and the keyed gate table.
//!
//! A gate is a manual intensity threshold for one (sample, marker) pair.
//! Cells whose marker intensity lies strictly above the gate are positive.

use std::collections::{BTreeSet, HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, NoOpReason, Result, ValidationError};

/// Sentinel stored for a gate that was never set.
pub const UNSET_GATE: f64 = 0.0;

/// Unique key of a gate table record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GateKey {
    pub sample_id: String,
    pub marker_id: String,
}

impl GateKey {
    /// Creates a key from borrowed ids.
    #[must_use]
    pub fn new(sample_id: &str, marker_id: &str) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            marker_id: marker_id.to_string(),
        }
    }
}

/// One row of the gate table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GateRecord {
    /// Sample (image dataset) id.
    pub sample_id: String,
    /// Marker channel id.
    pub marker_id: String,
    /// Threshold, [`UNSET_GATE`] when never set.
    pub gate_value: f64,
}

impl GateRecord {
    /// Creates a new record.
    pub fn new(sample_id: impl Into<String>, marker_id: impl Into<String>, gate_value: f64) -> Self {
        Self {
            sample_id: sample_id.into(),
            marker_id: marker_id.into(),
            gate_value,
        }
    }

    /// Returns true if the gate holds a real threshold.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_set(&self) -> bool {
        self.gate_value != UNSET_GATE
    }
}

/// Result of a successful [`GateTable::set_gate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateUpdate {
    /// Value stored before the write.
    pub previous: f64,
    /// Value stored now.
    pub value: f64,
}

/// Gate records keyed by (sample, marker).
///
/// Records stay in insertion order for serialization. The key index makes a
/// duplicate pair unrepresentable: every constructor rejects one.
#[derive(Debug, Clone, Default)]
pub struct GateTable {
    records: Vec<GateRecord>,
    index: HashMap<GateKey, usize>,
}

impl GateTable {
    /// Builds the full sample × marker product with every gate unset.
    ///
    /// Samples keep their given order and vary slowest; repeated ids are
    /// ignored.
    #[must_use]
    pub fn initialize<S, M>(sample_ids: &[S], marker_ids: &[M]) -> Self
    where
        S: AsRef<str>,
        M: AsRef<str>,
    {
        let samples = dedup_in_order(sample_ids);
        let markers = dedup_in_order(marker_ids);

        let mut table = Self {
            records: Vec::with_capacity(samples.len() * markers.len()),
            index: HashMap::with_capacity(samples.len() * markers.len()),
        };
        for sample in &samples {
            for marker in &markers {
                table.insert_unchecked(GateRecord::new(*sample, *marker, UNSET_GATE));
            }
        }
        log::debug!(
            "initialized gate table: {} samples x {} markers",
            samples.len(),
            markers.len()
        );
        table
    }

    /// Builds a table from parsed records, rejecting duplicate pairs.
    ///
    /// # Errors
    /// Returns [`ValidationError::DuplicateKey`] for the first repeated pair.
    pub fn from_records(records: Vec<GateRecord>) -> std::result::Result<Self, ValidationError> {
        let mut table = Self {
            records: Vec::with_capacity(records.len()),
            index: HashMap::with_capacity(records.len()),
        };
        for record in records {
            let key = GateKey::new(&record.sample_id, &record.marker_id);
            if table.index.contains_key(&key) {
                return Err(ValidationError::DuplicateKey {
                    sample_id: key.sample_id,
                    marker_id: key.marker_id,
                });
            }
            table.insert_unchecked(record);
        }
        Ok(table)
    }

    /// Parses records and checks them against the expected key space.
    ///
    /// The returned table is exactly what was parsed; missing pairs are a
    /// mismatch, never filled in.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] on a duplicate pair or a sample/marker
    /// set that differs from the expected one.
    pub fn load<S, M>(
        records: Vec<GateRecord>,
        sample_ids: &[S],
        marker_ids: &[M],
    ) -> std::result::Result<Self, ValidationError>
    where
        S: AsRef<str>,
        M: AsRef<str>,
    {
        let table = Self::from_records(records)?;
        table.validate_key_space(sample_ids, marker_ids)?;
        Ok(table)
    }

    /// Checks that the distinct sample and marker ids equal the expected sets.
    ///
    /// # Errors
    /// Returns [`ValidationError::SampleMismatch`] or
    /// [`ValidationError::MarkerMismatch`] listing the differences.
    pub fn validate_key_space<S, M>(
        &self,
        sample_ids: &[S],
        marker_ids: &[M],
    ) -> std::result::Result<(), ValidationError>
    where
        S: AsRef<str>,
        M: AsRef<str>,
    {
        let found_samples: BTreeSet<&str> =
            self.records.iter().map(|r| r.sample_id.as_str()).collect();
        let expected_samples: BTreeSet<&str> = sample_ids.iter().map(AsRef::as_ref).collect();
        if found_samples != expected_samples {
            let (missing, unexpected) = set_difference(&expected_samples, &found_samples);
            return Err(ValidationError::SampleMismatch {
                missing,
                unexpected,
            });
        }

        let found_markers: BTreeSet<&str> =
            self.records.iter().map(|r| r.marker_id.as_str()).collect();
        let expected_markers: BTreeSet<&str> = marker_ids.iter().map(AsRef::as_ref).collect();
        if found_markers != expected_markers {
            let (missing, unexpected) = set_difference(&expected_markers, &found_markers);
            return Err(ValidationError::MarkerMismatch {
                missing,
                unexpected,
            });
        }
        Ok(())
    }

    /// Returns the gate stored for the pair.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the pair is not in the table.
    pub fn lookup(&self, sample_id: &str, marker_id: &str) -> Result<f64> {
        self.position(sample_id, marker_id)
            .map(|i| self.records[i].gate_value)
    }

    /// Stores a new gate for the pair.
    ///
    /// # Errors
    /// - [`Error::InvalidGateValue`] for NaN or infinite values.
    /// - [`Error::NoOp`] with [`NoOpReason::Unset`] for 0.0.
    /// - [`Error::NoOp`] with [`NoOpReason::NoChange`] if the value is already stored.
    /// - [`Error::NotFound`] if the pair is not in the table.
    #[allow(clippy::float_cmp)]
    pub fn set_gate(&mut self, sample_id: &str, marker_id: &str, value: f64) -> Result<GateUpdate> {
        if !value.is_finite() {
            return Err(Error::InvalidGateValue(value));
        }
        if value == UNSET_GATE {
            return Err(Error::NoOp(NoOpReason::Unset));
        }
        let i = self.position(sample_id, marker_id)?;
        let previous = self.records[i].gate_value;
        if previous == value {
            return Err(Error::NoOp(NoOpReason::NoChange));
        }
        self.records[i].gate_value = value;
        Ok(GateUpdate { previous, value })
    }

    /// Records in table order.
    #[must_use]
    pub fn records(&self) -> &[GateRecord] {
        &self.records
    }

    /// Iterates over records in table order.
    pub fn iter(&self) -> impl Iterator<Item = &GateRecord> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records holding a real threshold.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_set()).count()
    }

    /// Distinct sample ids in first-appearance order.
    #[must_use]
    pub fn sample_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.sample_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Distinct marker ids in first-appearance order.
    #[must_use]
    pub fn marker_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.marker_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn position(&self, sample_id: &str, marker_id: &str) -> Result<usize> {
        self.index
            .get(&GateKey::new(sample_id, marker_id))
            .copied()
            .ok_or_else(|| Error::NotFound {
                sample_id: sample_id.to_string(),
                marker_id: marker_id.to_string(),
            })
    }

    fn insert_unchecked(&mut self, record: GateRecord) {
        let key = GateKey::new(&record.sample_id, &record.marker_id);
        self.index.insert(key, self.records.len());
        self.records.push(record);
    }
}

fn dedup_in_order<T: AsRef<str>>(items: &[T]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| seen.insert(*item))
        .collect()
}

fn set_difference(expected: &BTreeSet<&str>, found: &BTreeSet<&str>) -> (Vec<String>, Vec<String>) {
    let missing = expected.difference(found).map(|s| (*s).to_string()).collect();
    let unexpected = found.difference(expected).map(|s| (*s).to_string()).collect();
    (missing, unexpected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table_with_gate() -> GateTable {
        let mut table = GateTable::initialize(&["S1", "S2"], &["CD3", "CD8"]);
        table.set_gate("S1", "CD3", 5.0).unwrap();
        table
    }

    #[test]
    fn test_initialize_full_product() {
        let table = GateTable::initialize(&["S1", "S2", "S3"], &["CD3", "CD8"]);
        assert_eq!(table.len(), 6);
        assert!(table.iter().all(|r| r.gate_value == UNSET_GATE));

        let keys: BTreeSet<(&str, &str)> = table
            .iter()
            .map(|r| (r.sample_id.as_str(), r.marker_id.as_str()))
            .collect();
        assert_eq!(keys.len(), 6);
        for s in ["S1", "S2", "S3"] {
            for m in ["CD3", "CD8"] {
                assert!(keys.contains(&(s, m)));
            }
        }
    }

    #[test]
    fn test_initialize_ignores_repeated_ids() {
        let table = GateTable::initialize(&["S1", "S1", "S2"], &["CD3", "CD3"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.sample_ids(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_initialize_empty_inputs() {
        let table = GateTable::initialize::<&str, &str>(&[], &["CD3"]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_lookup_missing_pair() {
        let table = GateTable::initialize(&["S1"], &["CD3"]);
        let err = table.lookup("S1", "CD4").unwrap_err();
        assert!(matches!(err, Error::NotFound { ref marker_id, .. } if marker_id == "CD4"));
    }

    #[test]
    fn test_set_gate_unset_value_is_noop() {
        let mut table = table_with_gate();
        let err = table.set_gate("S1", "CD3", 0.0).unwrap_err();
        assert!(matches!(err, Error::NoOp(NoOpReason::Unset)));
        // Also for an untouched pair.
        let err = table.set_gate("S2", "CD8", 0.0).unwrap_err();
        assert!(matches!(err, Error::NoOp(NoOpReason::Unset)));
        assert_relative_eq!(table.lookup("S1", "CD3").unwrap(), 5.0);
    }

    #[test]
    fn test_set_gate_same_value_is_noop() {
        let mut table = table_with_gate();
        let err = table.set_gate("S1", "CD3", 5.0).unwrap_err();
        assert!(matches!(err, Error::NoOp(NoOpReason::NoChange)));
    }

    #[test]
    fn test_set_gate_overwrites() {
        let mut table = table_with_gate();
        let update = table.set_gate("S1", "CD3", 7.5).unwrap();
        assert_relative_eq!(update.previous, 5.0);
        assert_relative_eq!(update.value, 7.5);
        assert_relative_eq!(table.lookup("S1", "CD3").unwrap(), 7.5);
        assert_relative_eq!(table.lookup("S2", "CD3").unwrap(), 0.0);
        assert_eq!(table.set_count(), 1);
    }

    #[test]
    fn test_set_gate_rejects_nan() {
        let mut table = table_with_gate();
        assert!(matches!(
            table.set_gate("S1", "CD3", f64::NAN),
            Err(Error::InvalidGateValue(_))
        ));
    }

    #[test]
    fn test_set_gate_unknown_pair() {
        let mut table = table_with_gate();
        assert!(matches!(
            table.set_gate("S9", "CD3", 1.0),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let records = vec![
            GateRecord::new("S1", "CD3", 1.0),
            GateRecord::new("S1", "CD3", 2.0),
        ];
        let err = GateTable::from_records(records).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateKey {
                sample_id: "S1".into(),
                marker_id: "CD3".into(),
            }
        );
    }

    #[test]
    fn test_load_sample_mismatch() {
        let records = vec![
            GateRecord::new("S1", "CD3", 0.0),
            GateRecord::new("S3", "CD3", 0.0),
        ];
        let err = GateTable::load(records, &["S1", "S2"], &["CD3"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SampleMismatch {
                missing: vec!["S2".into()],
                unexpected: vec!["S3".into()],
            }
        );
    }

    #[test]
    fn test_load_marker_mismatch() {
        let records = vec![GateRecord::new("S1", "CD3", 0.0)];
        let err = GateTable::load(records, &["S1"], &["CD3", "CD8"]).unwrap_err();
        assert!(matches!(err, ValidationError::MarkerMismatch { ref missing, .. } if missing == &["CD8"]));
    }

    #[test]
    fn test_load_keeps_parsed_rows_unchanged() {
        // Full id sets but one pair absent: accepted as-is, not filled in.
        let records = vec![
            GateRecord::new("S1", "CD3", 2.0),
            GateRecord::new("S2", "CD8", 3.0),
        ];
        let table = GateTable::load(records, &["S1", "S2"], &["CD3", "CD8"]).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.lookup("S1", "CD8").is_err());
    }
}
