/**
 * RecoPrep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use serde_derive::{Deserialize, Serialize};

use crate::errors::{PrepError, Result};
use crate::mapper::TokenMapper;
use crate::sparse;
use crate::types::{RemovedIndices, SparseMatrix};

/// Occurrence bounds for the features (columns) of a content matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    /// Features occurring in fewer rows are removed, 0 disables the lower bound.
    pub min_occurrence: usize,
    /// Features occurring in a larger share of the rows are removed.
    pub max_fraction: f64,
}

impl Default for FeatureBounds {
    fn default() -> Self {
        FeatureBounds { min_occurrence: 5, max_fraction: 0.30 }
    }
}

impl FeatureBounds {

    pub fn new(min_occurrence: usize, max_fraction: f64) -> Result<Self> {
        let bounds = FeatureBounds { min_occurrence, max_fraction };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Keeps every feature that still occurs at least once.
    pub fn present() -> Self {
        FeatureBounds { min_occurrence: 1, max_fraction: 1.0 }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_fraction >= 0.0 && self.max_fraction <= 1.0) {
            return Err(PrepError::configuration(format!(
                "max_fraction must be within [0, 1], provided value was {}", self.max_fraction)));
        }
        Ok(())
    }

    pub fn prune(&self, matrix: &SparseMatrix, mapper: &TokenMapper) -> Result<PrunedFeatures> {
        remove_features(matrix, mapper, self.min_occurrence, self.max_fraction)
    }
}

#[derive(Debug, Clone)]
pub struct PrunedFeatures {
    pub matrix: SparseMatrix,
    pub removed: RemovedIndices,
    pub mapper: TokenMapper,
}

/// Removes the columns of `matrix` occurring in fewer than `min_occurrence` rows or in more than
/// `max_fraction` of all rows, and reconciles the column mapper accordingly. Removing every
/// column is not an error, the result then has zero columns.
pub fn remove_features(
    matrix: &SparseMatrix,
    mapper: &TokenMapper,
    min_occurrence: usize,
    max_fraction: f64,
) -> Result<PrunedFeatures> {

    FeatureBounds { min_occurrence, max_fraction }.validate()?;

    if mapper.len() != matrix.cols() {
        return Err(PrepError::inconsistent_shape("feature mapper", matrix.cols(), mapper.len()));
    }

    let matrix = sparse::eliminate_zeros(matrix);
    let max_occurrence = max_fraction * matrix.rows() as f64;

    let mut removed = RemovedIndices::new();
    let mut num_too_rare = 0;
    let mut num_too_common = 0;

    for (feature, occurrences) in sparse::column_degrees(&matrix).iter().enumerate() {
        if *occurrences < min_occurrence {
            num_too_rare += 1;
            removed.insert(feature);
        } else if *occurrences as f64 > max_occurrence {
            num_too_common += 1;
            removed.insert(feature);
        }
    }

    info!("Removed {} features with less than {} occurrences and {} features occurring in more \
        than {:.2}% of the rows, {} remain", num_too_rare, min_occurrence, num_too_common,
        max_fraction * 100.0, matrix.cols() - removed.len());

    if removed.len() == matrix.cols() && !removed.is_empty() {
        warn!("All {} features were removed", removed.len());
    }

    let keep = sparse::keep_mask(matrix.cols(), &removed);
    let pruned = sparse::select_columns(&matrix, &keep).to_csr();
    let mapper = mapper.reconcile(&removed)?;

    Ok(PrunedFeatures { matrix: pruned, removed, mapper })
}
