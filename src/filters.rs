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

use rand::Rng;
use rand::seq::index;

use crate::context::RunContext;
use crate::errors::{PrepError, Result};
use crate::kcore::{self, Reduction};
use crate::sparse;
use crate::types::{RemovedIndices, SparseMatrix};

/// Removes the users (rows) with less than `min_interactions` interactions in a single pass.
/// Items (columns) that end up without interactions are reported as removed too. Unlike the
/// k-cores, the item degrees are not thresholded, so there is nothing to iterate on.
pub fn select_users_with_min_interactions(
    matrix: SparseMatrix,
    min_interactions: usize,
    reshape: bool,
    ctx: &mut RunContext,
) -> Result<Reduction> {

    const STAGE: &str = "user min interactions";

    if min_interactions < 1 {
        return Err(PrepError::configuration(format!(
            "min_interactions must be >= 1, provided value was {}", min_interactions)));
    }

    let (num_users, num_items) = matrix.shape();

    let interactions = sparse::ensure_csr(sparse::eliminate_zeros(&matrix), ctx, STAGE);
    drop(matrix);

    let too_few: Vec<bool> = sparse::outer_degrees(&interactions).iter()
        .map(|degree| *degree < min_interactions)
        .collect();

    let removed_users: RemovedIndices = too_few.iter()
        .enumerate()
        .filter(|(_, flagged)| **flagged)
        .map(|(user, _)| user)
        .collect();

    let interactions = sparse::clear_outer(&interactions, &too_few);
    let removed_items = sparse::empty_indices(&sparse::column_degrees(&interactions));

    let degenerate = interactions.nnz() == 0;
    if degenerate {
        ctx.degenerate(STAGE, 1);
    }

    info!("Removed {} users ({:.2}%) with less than {} interactions and {} items ({:.2}%) left \
        without interactions", removed_users.len(), kcore::percentage(removed_users.len(), num_users),
        min_interactions, removed_items.len(), kcore::percentage(removed_items.len(), num_items));

    let matrix = if reshape {
        sparse::drop_indices(&interactions, &removed_users, &removed_items)
    } else {
        interactions
    };

    Ok(Reduction {
        matrix,
        removed_rows: removed_users,
        removed_cols: removed_items,
        iterations: 1,
        degenerate,
        reshaped: reshape,
    })
}

/// Keeps `floor(num_users * quota)` users chosen uniformly at random without replacement, then
/// runs a k=1 k-core pass to drop the items only the discarded users interacted with. The result
/// is always reshaped, and its removed indices refer to the matrix handed in.
pub fn sample_users<R: Rng>(
    matrix: SparseMatrix,
    quota: f64,
    rng: &mut R,
    ctx: &mut RunContext,
) -> Result<Reduction> {

    if !(quota > 0.0 && quota <= 1.0) {
        return Err(PrepError::configuration(format!(
            "user quota must be within (0, 1], provided value was {}", quota)));
    }

    let num_users = matrix.rows();
    let num_to_sample = (num_users as f64 * quota).floor() as usize;

    info!("Sampling {:.2}% of all users, their number is {}", quota * 100.0, num_to_sample);

    let mut discarded = vec![true; num_users];
    for user in index::sample(rng, num_users, num_to_sample).iter() {
        discarded[user] = false;
    }

    let matrix = sparse::ensure_csr(matrix, ctx, "user sample");
    let sampled = sparse::clear_outer(&matrix, &discarded);
    drop(matrix);

    kcore::select_k_cores(sampled, 1, true, ctx)
}
