/*
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

//! Storage-aware helpers around `sprs` matrices. All of them return new matrices; the input is
//! never modified. Rebuilding a matrix or converting between CSR and CSC costs O(nnz) transient
//! memory, degree vectors cost O(rows) or O(cols).

use sprs::{CompressedStorage, CsMat};

use crate::context::RunContext;
use crate::types::{self, DegreeVector, RemovedIndices, SparseMatrix};

fn assemble(
    storage: CompressedStorage,
    outer_dims: usize,
    inner_dims: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
) -> SparseMatrix {
    match storage {
        CompressedStorage::CSR => CsMat::new((outer_dims, inner_dims), indptr, indices, data),
        CompressedStorage::CSC => CsMat::new_csc((inner_dims, outer_dims), indptr, indices, data),
    }
}

/// Keeps the entries for which `keep(outer, inner, value)` holds, in the same storage and shape.
fn retain_entries<F>(matrix: &SparseMatrix, mut keep: F) -> SparseMatrix
    where F: FnMut(usize, usize, f64) -> bool {

    let mut indptr = Vec::with_capacity(matrix.outer_dims() + 1);
    let mut indices = Vec::with_capacity(matrix.nnz());
    let mut data = Vec::with_capacity(matrix.nnz());

    indptr.push(0);

    for (outer, lane) in matrix.outer_iterator().enumerate() {
        for (inner, value) in lane.iter() {
            if keep(outer, inner, *value) {
                indices.push(inner);
                data.push(*value);
            }
        }
        indptr.push(indices.len());
    }

    assemble(matrix.storage(), matrix.outer_dims(), matrix.inner_dims(), indptr, indices, data)
}

pub fn ensure_csr(matrix: SparseMatrix, ctx: &mut RunContext, operation: &str) -> SparseMatrix {
    if matrix.is_csr() {
        matrix
    } else {
        ctx.storage_conversion(operation);
        matrix.to_csr()
    }
}

pub fn ensure_csc(matrix: SparseMatrix, ctx: &mut RunContext, operation: &str) -> SparseMatrix {
    if matrix.is_csc() {
        matrix
    } else {
        ctx.storage_conversion(operation);
        matrix.to_csc()
    }
}

/// Removes explicitly stored zeros, so that stored entries and non-zero entries coincide.
pub fn eliminate_zeros(matrix: &SparseMatrix) -> SparseMatrix {
    retain_entries(matrix, |_, _, value| value != 0.0)
}

/// Number of stored entries per outer lane (rows for CSR, columns for CSC).
pub fn outer_degrees(matrix: &SparseMatrix) -> DegreeVector {
    matrix.outer_iterator()
        .map(|lane| lane.nnz())
        .collect()
}

/// Number of stored entries per inner index, computed without changing storage.
pub fn inner_degrees(matrix: &SparseMatrix) -> DegreeVector {
    let mut degrees = types::new_degree_vector(matrix.inner_dims());
    for lane in matrix.outer_iterator() {
        for inner in lane.indices() {
            degrees[*inner] += 1;
        }
    }
    degrees
}

pub fn row_degrees(matrix: &SparseMatrix) -> DegreeVector {
    if matrix.is_csr() { outer_degrees(matrix) } else { inner_degrees(matrix) }
}

pub fn column_degrees(matrix: &SparseMatrix) -> DegreeVector {
    if matrix.is_csc() { outer_degrees(matrix) } else { inner_degrees(matrix) }
}

/// Zeroes the flagged outer lanes and purges the resulting zeros in one sweep. The shape is
/// unchanged.
pub fn clear_outer(matrix: &SparseMatrix, cleared: &[bool]) -> SparseMatrix {
    retain_entries(matrix, |outer, _, value| !cleared[outer] && value != 0.0)
}

/// Zeroes the given rows without changing the shape.
pub fn clear_rows(matrix: &SparseMatrix, rows: &RemovedIndices) -> SparseMatrix {
    let cleared = index_mask(matrix.rows(), rows);
    if matrix.is_csr() {
        clear_outer(matrix, &cleared)
    } else {
        retain_entries(matrix, |_, row, value| !cleared[row] && value != 0.0)
    }
}

/// Zeroes the given columns without changing the shape.
pub fn clear_columns(matrix: &SparseMatrix, columns: &RemovedIndices) -> SparseMatrix {
    let cleared = index_mask(matrix.cols(), columns);
    if matrix.is_csc() {
        clear_outer(matrix, &cleared)
    } else {
        retain_entries(matrix, |_, column, value| !cleared[column] && value != 0.0)
    }
}

fn select_outer(matrix: &SparseMatrix, keep: &[bool]) -> SparseMatrix {

    let mut indptr = vec![0];
    let mut indices = Vec::with_capacity(matrix.nnz());
    let mut data = Vec::with_capacity(matrix.nnz());

    for (outer, lane) in matrix.outer_iterator().enumerate() {
        if keep[outer] {
            for (inner, value) in lane.iter() {
                indices.push(inner);
                data.push(*value);
            }
            indptr.push(indices.len());
        }
    }

    let num_kept = indptr.len() - 1;
    assemble(matrix.storage(), num_kept, matrix.inner_dims(), indptr, indices, data)
}

fn select_inner(matrix: &SparseMatrix, keep: &[bool]) -> SparseMatrix {

    let mut new_index: Vec<Option<usize>> = Vec::with_capacity(keep.len());
    let mut num_kept = 0;
    for kept in keep.iter() {
        if *kept {
            new_index.push(Some(num_kept));
            num_kept += 1;
        } else {
            new_index.push(None);
        }
    }

    let mut indptr = Vec::with_capacity(matrix.outer_dims() + 1);
    let mut indices = Vec::with_capacity(matrix.nnz());
    let mut data = Vec::with_capacity(matrix.nnz());

    indptr.push(0);

    for lane in matrix.outer_iterator() {
        for (inner, value) in lane.iter() {
            if let Some(index) = new_index[inner] {
                indices.push(index);
                data.push(*value);
            }
        }
        indptr.push(indices.len());
    }

    assemble(matrix.storage(), matrix.outer_dims(), num_kept, indptr, indices, data)
}

/// Drops the rows whose `keep` flag is false, renumbering the remaining rows densely.
pub fn select_rows(matrix: &SparseMatrix, keep: &[bool]) -> SparseMatrix {
    assert_eq!(keep.len(), matrix.rows(), "row mask does not match matrix shape");
    if matrix.is_csr() { select_outer(matrix, keep) } else { select_inner(matrix, keep) }
}

/// Drops the columns whose `keep` flag is false, renumbering the remaining columns densely.
pub fn select_columns(matrix: &SparseMatrix, keep: &[bool]) -> SparseMatrix {
    assert_eq!(keep.len(), matrix.cols(), "column mask does not match matrix shape");
    if matrix.is_csc() { select_outer(matrix, keep) } else { select_inner(matrix, keep) }
}

/// Drops all rows and columns without stored entries. Returns the compacted matrix with the
/// removed row and column indices, relative to the input shape.
pub fn remove_empty_rows_and_cols(
    matrix: &SparseMatrix
) -> (SparseMatrix, RemovedIndices, RemovedIndices) {

    let matrix = eliminate_zeros(matrix);

    let removed_rows = empty_indices(&row_degrees(&matrix));
    let removed_cols = empty_indices(&column_degrees(&matrix));

    let compacted = drop_indices(&matrix, &removed_rows, &removed_cols);

    (compacted, removed_rows, removed_cols)
}

/// Drops the given rows and columns, changing the shape of the matrix.
pub fn drop_indices(
    matrix: &SparseMatrix,
    removed_rows: &RemovedIndices,
    removed_cols: &RemovedIndices,
) -> SparseMatrix {
    let keep_rows = keep_mask(matrix.rows(), removed_rows);
    let keep_cols = keep_mask(matrix.cols(), removed_cols);

    let without_rows = select_rows(matrix, &keep_rows);
    select_columns(&without_rows, &keep_cols)
}

/// Sets every stored value to 1.0.
pub fn to_implicit(matrix: &SparseMatrix) -> SparseMatrix {
    matrix.map(|_| 1.0)
}

/// Stacks CSR matrices with the same number of rows side by side.
pub fn hstack(matrices: &[&SparseMatrix]) -> SparseMatrix {

    let num_rows = matrices.first().map(|matrix| matrix.rows()).unwrap_or(0);
    let num_cols: usize = matrices.iter().map(|matrix| matrix.cols()).sum();

    let blocks: Vec<SparseMatrix> = matrices.iter()
        .map(|matrix| {
            assert_eq!(matrix.rows(), num_rows, "hstack needs matching row counts");
            matrix.to_csr()
        })
        .collect();

    let nnz: usize = blocks.iter().map(|block| block.nnz()).sum();
    let mut indptr = Vec::with_capacity(num_rows + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);

    indptr.push(0);

    for row in 0..num_rows {
        let mut offset = 0;
        for block in blocks.iter() {
            if let Some(lane) = block.outer_view(row) {
                for (column, value) in lane.iter() {
                    indices.push(column + offset);
                    data.push(*value);
                }
            }
            offset += block.cols();
        }
        indptr.push(indices.len());
    }

    CsMat::new((num_rows, num_cols), indptr, indices, data)
}

pub fn total_weight(matrix: &SparseMatrix) -> f64 {
    matrix.data().iter().sum()
}

/// Share of stored entries among all cells, zero for an empty shape.
pub fn density(matrix: &SparseMatrix) -> f64 {
    let cells = matrix.rows() as f64 * matrix.cols() as f64;
    if cells == 0.0 { 0.0 } else { matrix.nnz() as f64 / cells }
}

/// Indices with degree zero.
pub fn empty_indices(degrees: &DegreeVector) -> RemovedIndices {
    degrees.iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect()
}

pub fn index_mask(len: usize, indices: &RemovedIndices) -> Vec<bool> {
    let mut mask = vec![false; len];
    for index in indices.iter() {
        mask[*index] = true;
    }
    mask
}

pub fn keep_mask(len: usize, removed: &RemovedIndices) -> Vec<bool> {
    index_mask(len, removed).into_iter().map(|removed| !removed).collect()
}
