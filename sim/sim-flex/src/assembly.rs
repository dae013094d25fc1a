//! Scatter-add of element matrices into a global sparse matrix.
//!
//! Element iteration matrices are appended as `(row, col, value)` triplets
//! and converted to compressed sparse column form once per Newton
//! iteration. Duplicate entries are summed by the conversion, which is the
//! finite-element scatter-add.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Triplet accumulator for the global iteration matrix.
#[derive(Debug, Clone, Default)]
pub struct TripletBuffer {
    triplets: Vec<(usize, usize, f64)>,
}

impl TripletBuffer {
    /// Empty buffer with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triplets: Vec::with_capacity(capacity),
        }
    }

    /// Drop all entries and keep the allocation.
    pub fn clear(&mut self) {
        self.triplets.clear();
    }

    /// Number of stored entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    /// Whether the buffer holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }

    /// Add a single entry.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.triplets.push((row, col, value));
        }
    }

    /// Add the local matrix `block` at the global indices `loc_dof` (used
    /// for both rows and columns).
    pub fn add_block(&mut self, block: &DMatrix<f64>, loc_dof: &[usize]) {
        debug_assert_eq!(block.nrows(), loc_dof.len());
        debug_assert_eq!(block.ncols(), loc_dof.len());
        for (j, &col) in loc_dof.iter().enumerate() {
            for (i, &row) in loc_dof.iter().enumerate() {
                self.add(row, col, block[(i, j)]);
            }
        }
    }

    /// Build the `size`×`size` matrix, summing duplicates.
    #[must_use]
    pub fn to_csc(&self, size: usize) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(size, size);
        for &(row, col, value) in &self.triplets {
            coo.push(row, col, value);
        }
        CscMatrix::from(&coo)
    }
}
