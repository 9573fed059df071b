use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// Tolerance on the sum of an observed row.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Raw occurrence counts of `(context, next token)` pairs.
///
/// Each context owns a sparse row of `next token index → count`. Repeated
/// pairs are summed explicitly when recorded, and partial matrices built
/// from disjoint corpus partitions can be merged by element-wise addition.
/// Counts are only turned into probabilities by [`TransitionMatrix::from_counts`].
///
/// # Invariants
/// - `rows.len() == shape.0`
/// - Every stored count is strictly positive and its column is `< shape.1`
#[derive(Clone, Debug, PartialEq)]
pub struct CountMatrix {
	shape: (usize, usize),
	rows: Vec<HashMap<usize, u64>>,
}

impl CountMatrix {
	/// Creates an all-zero count matrix of shape `(contexts, tokens)`.
	pub fn new(contexts: usize, tokens: usize) -> Self {
		Self { shape: (contexts, tokens), rows: vec![HashMap::new(); contexts] }
	}

	pub fn shape(&self) -> (usize, usize) {
		self.shape
	}

	/// Records one occurrence of `next` following `context`.
	///
	/// # Panics
	/// Panics if either index is outside the matrix shape.
	pub fn add(&mut self, context: usize, next: usize) {
		assert!(next < self.shape.1, "token index {next} out of range {}", self.shape.1);
		*self.rows[context].entry(next).or_insert(0) += 1;
	}

	/// Count stored at `(context, next)`.
	pub fn count(&self, context: usize, next: usize) -> u64 {
		self.rows
			.get(context)
			.and_then(|row| row.get(&next))
			.copied()
			.unwrap_or(0)
	}

	/// Total number of recorded pairs.
	pub fn total(&self) -> u64 {
		self.rows.iter().flat_map(|row| row.values()).sum()
	}

	/// Adds the counts of `other` into this matrix.
	///
	/// Merging is commutative and associative, so partial matrices can be
	/// combined in any order before normalization.
	///
	/// # Errors
	/// Returns an error if the shapes differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.shape != other.shape {
			return Err(ChainError::InvalidModel(format!(
				"shape mismatch: {:?} vs {:?}",
				self.shape, other.shape
			)));
		}

		for (row, other_row) in self.rows.iter_mut().zip(&other.rows) {
			for (next, count) in other_row {
				*row.entry(*next).or_insert(0) += *count;
			}
		}

		Ok(())
	}
}

/// One context's next-token distribution, sorted by token index.
///
/// An empty row means the context was never followed by anything in the corpus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseRow {
	entries: Vec<(usize, f64)>,
}

impl SparseRow {
	/// Nonzero `(token index, probability)` pairs in increasing token order.
	pub fn entries(&self) -> &[(usize, f64)] {
		&self.entries
	}

	pub fn is_zero(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn sum(&self) -> f64 {
		self.entries.iter().map(|(_, p)| p).sum()
	}

	/// Probability of `token`, zero when unobserved.
	pub fn get(&self, token: usize) -> f64 {
		self.entries
			.binary_search_by_key(&token, |(t, _)| *t)
			.map(|i| self.entries[i].1)
			.unwrap_or(0.0)
	}
}

/// Row-normalized sparse transition matrix of shape `(contexts, tokens)`.
///
/// Entry `(i, j)` is the probability of token `j` following context `i`.
///
/// # Invariants
/// - Every row with at least one observation sums to 1 within [`ROW_SUM_TOLERANCE`]
/// - Every row without observation is the zero row
///
/// Serialized as its shape plus `(row, col, value)` triples.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(into = "MatrixTriples", try_from = "MatrixTriples")]
pub struct TransitionMatrix {
	shape: (usize, usize),
	rows: Vec<SparseRow>,
}

/// Portable triplet form of a [`TransitionMatrix`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatrixTriples {
	pub shape: (usize, usize),
	pub triples: Vec<(usize, usize, f64)>,
}

impl TransitionMatrix {
	/// L1-normalizes every row of `counts`.
	///
	/// Rows without observation stay empty and are never divided.
	pub fn from_counts(counts: &CountMatrix) -> Self {
		let rows = counts
			.rows
			.iter()
			.map(|row| {
				let total: u64 = row.values().sum();
				if total == 0 {
					return SparseRow::default();
				}
				let total = total as f64;
				let mut entries: Vec<(usize, f64)> =
					row.iter().map(|(next, count)| (*next, *count as f64 / total)).collect();
				entries.sort_unstable_by_key(|(next, _)| *next);
				SparseRow { entries }
			})
			.collect();

		Self { shape: counts.shape, rows }
	}

	/// Rebuilds a matrix from `(row, col, value)` triples.
	///
	/// Duplicate coordinates are summed and zero values dropped. Values are
	/// taken as probabilities: they are not normalized again.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidModel`] if an index is out of range, a
	/// value is negative or not finite, or a nonzero row does not sum to 1.
	pub fn from_triples(shape: (usize, usize), triples: &[(usize, usize, f64)]) -> Result<Self> {
		let mut accumulated: Vec<HashMap<usize, f64>> = vec![HashMap::new(); shape.0];
		for &(row, col, value) in triples {
			if row >= shape.0 || col >= shape.1 {
				return Err(ChainError::InvalidModel(format!(
					"entry ({row}, {col}) outside shape {shape:?}"
				)));
			}
			if !value.is_finite() || value < 0.0 {
				return Err(ChainError::InvalidModel(format!("entry ({row}, {col}) has value {value}")));
			}
			if value > 0.0 {
				*accumulated[row].entry(col).or_insert(0.0) += value;
			}
		}

		let mut rows = Vec::with_capacity(shape.0);
		for (i, row) in accumulated.into_iter().enumerate() {
			let mut entries: Vec<(usize, f64)> = row.into_iter().collect();
			entries.sort_unstable_by_key(|(col, _)| *col);
			let row = SparseRow { entries };
			if !row.is_zero() && (row.sum() - 1.0).abs() > ROW_SUM_TOLERANCE {
				return Err(ChainError::InvalidModel(format!("row {i} sums to {}", row.sum())));
			}
			rows.push(row);
		}

		Ok(Self { shape, rows })
	}

	pub fn shape(&self) -> (usize, usize) {
		self.shape
	}

	pub fn row(&self, context: usize) -> Option<&SparseRow> {
		self.rows.get(context)
	}

	pub fn rows(&self) -> &[SparseRow] {
		&self.rows
	}

	/// Number of stored nonzero entries.
	pub fn nnz(&self) -> usize {
		self.rows.iter().map(|row| row.entries.len()).sum()
	}

	/// Number of rows with at least one observed continuation.
	pub fn observed_rows(&self) -> usize {
		self.rows.iter().filter(|row| !row.is_zero()).count()
	}

	/// All nonzero entries as `(row, col, value)`, row-major.
	pub fn triples(&self) -> Vec<(usize, usize, f64)> {
		self.rows
			.iter()
			.enumerate()
			.flat_map(|(i, row)| row.entries.iter().map(move |&(j, p)| (i, j, p)))
			.collect()
	}
}

impl From<TransitionMatrix> for MatrixTriples {
	fn from(matrix: TransitionMatrix) -> Self {
		Self { shape: matrix.shape, triples: matrix.triples() }
	}
}

impl TryFrom<MatrixTriples> for TransitionMatrix {
	type Error = ChainError;

	fn try_from(value: MatrixTriples) -> Result<Self> {
		Self::from_triples(value.shape, &value.triples)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn sample_counts() -> CountMatrix {
		let mut counts = CountMatrix::new(3, 4);
		counts.add(0, 1);
		counts.add(0, 1);
		counts.add(0, 3);
		counts.add(1, 2);
		counts
	}

	#[test]
	fn duplicate_pairs_are_summed() {
		let counts = sample_counts();
		assert_eq!(counts.count(0, 1), 2);
		assert_eq!(counts.count(0, 3), 1);
		assert_eq!(counts.count(2, 0), 0);
		assert_eq!(counts.total(), 4);
	}

	#[test]
	fn rows_are_l1_normalized() {
		let matrix = TransitionMatrix::from_counts(&sample_counts());
		let row = matrix.row(0).unwrap();
		assert_eq!(row.entries(), [(1, 2.0 / 3.0), (3, 1.0 / 3.0)]);
		assert_abs_diff_eq!(row.sum(), 1.0, epsilon = ROW_SUM_TOLERANCE);
		assert_eq!(row.get(1), 2.0 / 3.0);
		assert_eq!(row.get(2), 0.0);
		assert_eq!(matrix.row(1).unwrap().entries(), [(2, 1.0)]);
	}

	#[test]
	fn unobserved_rows_stay_zero() {
		let matrix = TransitionMatrix::from_counts(&sample_counts());
		let row = matrix.row(2).unwrap();
		assert!(row.is_zero());
		assert_eq!(row.sum(), 0.0);
		assert_eq!(matrix.observed_rows(), 2);
		assert_eq!(matrix.nnz(), 3);
	}

	#[test]
	fn merge_adds_counts() {
		let mut left = CountMatrix::new(3, 4);
		left.add(0, 1);
		let mut right = CountMatrix::new(3, 4);
		right.add(0, 1);
		right.add(0, 3);
		right.add(1, 2);
		left.merge(&right).unwrap();
		assert_eq!(left, sample_counts());
	}

	#[test]
	fn merge_rejects_other_shapes() {
		let mut left = CountMatrix::new(3, 4);
		assert!(left.merge(&CountMatrix::new(2, 4)).is_err());
	}

	#[test]
	fn triples_rebuild_the_same_matrix() {
		let matrix = TransitionMatrix::from_counts(&sample_counts());
		let rebuilt = TransitionMatrix::from_triples(matrix.shape(), &matrix.triples()).unwrap();
		assert_eq!(rebuilt, matrix);
	}

	#[test]
	fn duplicate_triples_are_summed() {
		let matrix = TransitionMatrix::from_triples((1, 2), &[(0, 1, 0.25), (0, 1, 0.25), (0, 0, 0.5)]).unwrap();
		assert_eq!(matrix.row(0).unwrap().entries(), [(0, 0.5), (1, 0.5)]);
	}

	#[test]
	fn invalid_triples_are_rejected() {
		assert!(TransitionMatrix::from_triples((1, 2), &[(1, 0, 1.0)]).is_err());
		assert!(TransitionMatrix::from_triples((1, 2), &[(0, 2, 1.0)]).is_err());
		assert!(TransitionMatrix::from_triples((1, 2), &[(0, 0, 0.4)]).is_err());
		assert!(TransitionMatrix::from_triples((1, 2), &[(0, 0, f64::NAN)]).is_err());
	}
}
