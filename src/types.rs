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

use std::collections::BTreeSet;

use sprs::CsMat;

/// Interaction (user x item) and content (item x feature) matrices, stored either as CSR or CSC.
pub type SparseMatrix = CsMat<f64>;

/// Per row or per column count of stored entries.
pub type DegreeVector = Vec<usize>;

/// Indices eliminated by a filtering step, always expressed in the index space *before* the step.
pub type RemovedIndices = BTreeSet<usize>;

pub fn new_degree_vector(dimensions: usize) -> DegreeVector {
    vec![0; dimensions]
}

pub fn empty_matrix(num_rows: usize, num_cols: usize) -> SparseMatrix {
    CsMat::zero((num_rows, num_cols))
}
