//! Exact nearest-neighbour index.
//!
//! The index is assembled once through [`IndexBuilder`] and is immutable
//! afterwards: there is no insert, update or delete on [`VectorIndex`]. Search
//! takes `&self` only, so any number of readers can share one index through an
//! `Arc` without locking.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{Record, SearchHit};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Accumulates records for a new index, validating each one on the way in.
#[derive(Debug)]
pub struct IndexBuilder {
    dimensions: usize,
    metric: DistanceMetric,
    records: Vec<Record>,
    ids: HashSet<String>,
}

impl IndexBuilder {
    /// Start a builder for vectors of `dimensions` length compared with `metric`.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidVector("Dimensions must be > 0".to_string()));
        }

        Ok(Self {
            dimensions,
            metric,
            records: Vec::new(),
            ids: HashSet::new(),
        })
    }

    /// Reserve room for `additional` more records.
    pub fn with_capacity(mut self, additional: usize) -> Self {
        self.records.reserve(additional);
        self.ids.reserve(additional);
        self
    }

    /// Append a record. Insertion order is preserved and later used to break
    /// score ties.
    pub fn push(&mut self, record: Record) -> Result<()> {
        validate_vector(self.dimensions, &record.vector)?;

        if !self.ids.insert(record.id.clone()) {
            return Err(Error::DuplicateId(record.id));
        }

        trace!(id = %record.id, position = self.records.len(), "Staged record");
        self.records.push(record);
        Ok(())
    }

    /// Number of records staged so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records have been staged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the staged records into a searchable index.
    pub fn finish(self) -> VectorIndex {
        debug!(
            count = self.records.len(),
            dimensions = self.dimensions,
            metric = %self.metric,
            "Finished index"
        );
        VectorIndex {
            dimensions: self.dimensions,
            metric: self.metric,
            records: self.records,
        }
    }
}

/// Read-only collection of records supporting exact top-k search.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    metric: DistanceMetric,
    records: Vec<Record>,
}

impl VectorIndex {
    /// Build an index from records in one call.
    pub fn from_records<I>(dimensions: usize, metric: DistanceMetric, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut builder = IndexBuilder::new(dimensions, metric)?;
        for record in records {
            builder.push(record)?;
        }
        Ok(builder.finish())
    }

    /// Get the vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Get a record by ID.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Return the `k` records closest to `query`, best match first.
    ///
    /// Equal scores keep insertion order. At most `min(k, len)` hits are
    /// returned and no record appears twice.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `k == 0`
    /// - [`Error::EmptyIndex`] if the index has no records
    /// - [`Error::DimensionMismatch`] / [`Error::InvalidVector`] for a bad query
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be >= 1".to_string()));
        }
        if self.records.is_empty() {
            return Err(Error::EmptyIndex);
        }
        validate_vector(self.dimensions, query)?;

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (position, self.metric.similarity(query, &record.vector)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits: Vec<SearchHit<'_>> = scored
            .into_iter()
            .map(|(position, score)| SearchHit {
                record: &self.records[position],
                score,
            })
            .collect();

        debug!(k, returned = hits.len(), "Search completed");
        Ok(hits)
    }
}

fn validate_vector(dimensions: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != dimensions {
        return Err(Error::DimensionMismatch {
            expected: dimensions,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(
            "Vector contains NaN or Inf".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorMetadata;

    fn record(id: &str, vector: &[f32]) -> Record {
        Record::new(id, vector.to_vec(), format!("text of {}", id), VectorMetadata::new())
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_records(
            3,
            DistanceMetric::Cosine,
            vec![
                record("x", &[1.0, 0.0, 0.0]),
                record("y", &[0.0, 1.0, 0.0]),
                record("xy", &[1.0, 1.0, 0.0]),
                record("z", &[0.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_best_first() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.1, 0.0], 4).unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy", "y", "z"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_respects_k() {
        let index = sample_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
        // k larger than the index returns everything once
        let hits = index.search(&[1.0, 0.0, 0.0], 50).unwrap();
        assert_eq!(hits.len(), 4);
        let unique: HashSet<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let index = VectorIndex::from_records(
            2,
            DistanceMetric::Cosine,
            vec![
                record("first", &[1.0, 0.0]),
                record("second", &[2.0, 0.0]),
                record("third", &[3.0, 0.0]),
            ],
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_euclidean_prefers_nearest() {
        let index = VectorIndex::from_records(
            2,
            DistanceMetric::Euclidean,
            vec![record("far", &[10.0, 10.0]), record("near", &[1.0, 1.0])],
        )
        .unwrap();

        let hits = index.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].record.id, "near");
    }

    #[test]
    fn test_search_rejects_zero_k() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_on_empty_index() {
        let index = IndexBuilder::new(3, DistanceMetric::Cosine).unwrap().finish();
        assert!(index.is_empty());
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(Error::EmptyIndex)
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index();
        match index.search(&[1.0, 0.0], 1) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_validation() {
        assert!(IndexBuilder::new(0, DistanceMetric::Cosine).is_err());

        let mut builder = IndexBuilder::new(2, DistanceMetric::Cosine).unwrap();
        builder.push(record("a", &[1.0, 0.0])).unwrap();
        assert!(matches!(
            builder.push(record("a", &[0.0, 1.0])),
            Err(Error::DuplicateId(_))
        ));
        assert!(matches!(
            builder.push(record("b", &[f32::NAN, 0.0])),
            Err(Error::InvalidVector(_))
        ));
        assert!(matches!(
            builder.push(record("c", &[1.0])),
            Err(Error::DimensionMismatch { .. })
        ));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_get_by_id() {
        let index = sample_index();
        assert_eq!(index.get("z").map(|r| r.text.as_str()), Some("text of z"));
        assert!(index.get("missing").is_none());
    }
}
