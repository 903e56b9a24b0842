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

use std::time::Instant;

use crate::context::RunContext;
use crate::errors::{PrepError, Result};
use crate::sparse;
use crate::types::{DegreeVector, RemovedIndices, SparseMatrix};
use crate::utils;

const STAGE: &str = "k-cores";

/// Outcome of a structural filter on an interaction matrix. The removed indices always refer to
/// the shape of the matrix that was handed to the filter.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub matrix: SparseMatrix,
    pub removed_rows: RemovedIndices,
    pub removed_cols: RemovedIndices,
    pub iterations: usize,
    /// Every interaction was removed.
    pub degenerate: bool,
    /// Whether empty rows and columns were dropped from `matrix`.
    pub reshaped: bool,
}

/// Flags the lanes with degree below `k` that are not removed yet and records them as removed.
/// Returns the mask of newly flagged lanes, or `None` if there were none.
fn flag_below_threshold(
    degrees: &DegreeVector,
    k: usize,
    removed: &mut RemovedIndices,
) -> Option<Vec<bool>> {

    let mut flagged = vec![false; degrees.len()];
    let mut num_flagged = 0;

    for (index, degree) in degrees.iter().enumerate() {
        if *degree < k && !removed.contains(&index) {
            flagged[index] = true;
            removed.insert(index);
            num_flagged += 1;
        }
    }

    if num_flagged == 0 { None } else { Some(flagged) }
}

/// Selects the largest sub-matrix in which every remaining user (row) and item (column) has at
/// least `k` interactions, the k-core of the bipartite interaction graph.
///
/// Removing users lowers the degree of items and vice versa, so rows and columns are filtered in
/// alternation until neither pass removes anything. Each iteration converts the matrix from CSR to
/// CSC and back, which costs O(nnz) time and transient memory, and the number of iterations is
/// bounded by the number of rows plus columns. For graphs with millions of interactions, this
/// loop dominates the runtime of a pipeline.
///
/// If the matrix runs empty, the loop stops early and the result is flagged as degenerate. With
/// `reshape`, empty rows and columns are dropped (a degenerate result becomes a 0x0 matrix),
/// otherwise the matrix keeps its original shape.
pub fn select_k_cores(
    matrix: SparseMatrix,
    k: usize,
    reshape: bool,
    ctx: &mut RunContext,
) -> Result<Reduction> {

    if k < 1 {
        return Err(PrepError::configuration(format!("k must be >= 1, provided value was {}", k)));
    }

    let start = Instant::now();
    let (num_rows, num_cols) = matrix.shape();

    // Explicit zeros would count towards the degrees otherwise
    let mut interactions = sparse::eliminate_zeros(&matrix);
    drop(matrix);

    info!("Extracting {}-cores from {}x{} matrix with density {:.2E}", k, num_rows, num_cols,
        sparse::density(&interactions));

    let mut removed_rows = RemovedIndices::new();
    let mut removed_cols = RemovedIndices::new();

    let mut iterations = 0;
    let mut degenerate = false;

    loop {
        iterations += 1;

        interactions = sparse::ensure_csr(interactions, ctx, STAGE);
        let row_degrees = sparse::outer_degrees(&interactions);
        let rows_converged = match flag_below_threshold(&row_degrees, k, &mut removed_rows) {
            Some(flagged) => {
                interactions = sparse::clear_outer(&interactions, &flagged);
                false
            },
            None => true,
        };

        interactions = sparse::ensure_csc(interactions, ctx, STAGE);
        let col_degrees = sparse::outer_degrees(&interactions);
        let cols_converged = match flag_below_threshold(&col_degrees, k, &mut removed_cols) {
            Some(flagged) => {
                interactions = sparse::clear_outer(&interactions, &flagged);
                false
            },
            None => true,
        };

        if interactions.nnz() == 0 {
            degenerate = true;
            ctx.degenerate(STAGE, iterations);
            break;
        }

        let remaining_cells = (num_rows - removed_rows.len()) as f64 *
            (num_cols - removed_cols.len()) as f64;

        debug!("Iteration {}: density without removed nodes {:.2E}, {} rows ({:.2}%) and {} \
            columns ({:.2}%) with less than {} entries", iterations,
            interactions.nnz() as f64 / remaining_cells, removed_rows.len(),
            percentage(removed_rows.len(), num_rows), removed_cols.len(),
            percentage(removed_cols.len(), num_cols), k);

        if rows_converged && cols_converged {
            break;
        }
    }

    // An empty matrix stops the loop early, every row and column left is empty as well
    if degenerate {
        removed_rows.extend(0..num_rows);
        removed_cols.extend(0..num_cols);
    }

    let interactions = interactions.to_csr();

    let matrix = if reshape {
        sparse::drop_indices(&interactions, &removed_rows, &removed_cols)
    } else {
        interactions
    };

    info!("Removed {} rows and {} columns with less than {} entries after {} iterations \
        ({}ms)", removed_rows.len(), removed_cols.len(), k, iterations,
        utils::to_millis(start.elapsed()));

    Ok(Reduction {
        matrix,
        removed_rows,
        removed_cols,
        iterations,
        degenerate,
        reshaped: reshape,
    })
}

pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
}


#[cfg(test)]
mod tests {

    use sprs::TriMat;

    use crate::context::RunContext;
    use crate::kcore;
    use crate::sparse;
    use crate::types::{RemovedIndices, SparseMatrix};

    fn matrix_from(num_rows: usize, num_cols: usize, entries: &[(usize, usize)]) -> SparseMatrix {
        let mut triplets = TriMat::new((num_rows, num_cols));
        for (row, col) in entries.iter() {
            triplets.add_triplet(*row, *col, 1.0);
        }
        triplets.to_csr()
    }

    fn indices(values: &[usize]) -> RemovedIndices {
        values.iter().cloned().collect()
    }

    #[test]
    fn cascading_removal_empties_the_matrix() {
        // (u1, i1), (u1, i2), (u2, i1) with k = 2
        let matrix = matrix_from(2, 2, &[(0, 0), (0, 1), (1, 0)]);
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(matrix, 2, true, &mut ctx).unwrap();

        assert!(reduction.degenerate);
        assert!(ctx.has_degenerate_result());
        assert_eq!(reduction.matrix.shape(), (0, 0));
        assert_eq!(reduction.removed_rows, indices(&[0, 1]));
        assert_eq!(reduction.removed_cols, indices(&[0, 1]));
        assert_eq!(reduction.iterations, 1);
    }

    #[test]
    fn degenerate_without_reshape_keeps_the_shape() {
        let matrix = matrix_from(2, 2, &[(0, 0), (0, 1), (1, 0)]);
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(matrix, 2, false, &mut ctx).unwrap();

        assert!(reduction.degenerate);
        assert_eq!(reduction.matrix.shape(), (2, 2));
        assert_eq!(reduction.matrix.nnz(), 0);
    }

    #[test]
    fn dense_block_survives() {
        // users 0-2 rated items 0-2, user 3 rated only item 3
        let mut entries = Vec::new();
        for user in 0..3 {
            for item in 0..3 {
                entries.push((user, item));
            }
        }
        entries.push((3, 3));
        entries.push((3, 0));
        let matrix = matrix_from(4, 4, &entries);
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(matrix, 3, true, &mut ctx).unwrap();

        assert!(!reduction.degenerate);
        assert_eq!(reduction.removed_rows, indices(&[3]));
        assert_eq!(reduction.removed_cols, indices(&[3]));
        assert_eq!(reduction.matrix.shape(), (3, 3));
        assert_eq!(reduction.matrix.nnz(), 9);
        assert!(sparse::row_degrees(&reduction.matrix).iter().all(|degree| *degree >= 3));
        assert!(sparse::column_degrees(&reduction.matrix).iter().all(|degree| *degree >= 3));
    }

    #[test]
    fn explicit_zeros_do_not_count() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(0, 1, 0.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 1.0);
        let matrix: SparseMatrix = triplets.to_csr();
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(matrix, 1, true, &mut ctx).unwrap();

        assert_eq!(reduction.matrix.nnz(), 3);
        assert!(reduction.removed_rows.is_empty());

        let mut ctx = RunContext::new();
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(1, 1, 0.0);
        let matrix: SparseMatrix = triplets.to_csr();

        let reduction = kcore::select_k_cores(matrix, 1, true, &mut ctx).unwrap();

        assert_eq!(reduction.removed_rows, indices(&[1]));
        assert_eq!(reduction.removed_cols, indices(&[1]));
        assert_eq!(reduction.matrix.shape(), (1, 1));
    }

    #[test]
    fn second_run_removes_nothing() {
        let entries = [(0, 0), (0, 1), (1, 0), (1, 1), (2, 1), (2, 2), (3, 3)];
        let matrix = matrix_from(4, 4, &entries);
        let mut ctx = RunContext::new();

        let first = kcore::select_k_cores(matrix, 2, true, &mut ctx).unwrap();
        let shape = first.matrix.shape();

        // user 2 only drops below the threshold once item 2 is gone
        assert_eq!(first.removed_rows, indices(&[2, 3]));
        assert_eq!(first.removed_cols, indices(&[2, 3]));
        assert_eq!(first.iterations, 3);
        assert_eq!(shape, (2, 2));
        let second = kcore::select_k_cores(first.matrix, 2, true, &mut ctx).unwrap();

        assert!(second.removed_rows.is_empty());
        assert!(second.removed_cols.is_empty());
        assert_eq!(second.matrix.shape(), shape);
        assert_eq!(second.iterations, 1);
    }

    #[test]
    fn invalid_k_is_rejected() {
        let matrix = matrix_from(1, 1, &[(0, 0)]);
        let mut ctx = RunContext::new();

        assert!(kcore::select_k_cores(matrix, 0, true, &mut ctx).is_err());
    }

    #[test]
    fn removed_indices_refer_to_the_original_shape() {
        // row 1 and column 2 are empty from the start
        let matrix = matrix_from(3, 3, &[(0, 0), (0, 1), (2, 0), (2, 1)]);
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(matrix, 1, false, &mut ctx).unwrap();

        assert_eq!(reduction.removed_rows, indices(&[1]));
        assert_eq!(reduction.removed_cols, indices(&[2]));
        assert_eq!(reduction.matrix.shape(), (3, 3));
        assert!(!reduction.reshaped);
    }
}
