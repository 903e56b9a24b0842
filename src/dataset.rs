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

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::FinalizedMatrix;
use crate::context::RunContext;
use crate::errors::{PrepError, Result};
use crate::features::FeatureBounds;
use crate::kcore::{self, Reduction};
use crate::mapper::TokenMapper;
use crate::sparse;
use crate::types::{RemovedIndices, SparseMatrix};

/// An item x feature matrix with its feature mapper. Rows share the item index space of the
/// interaction matrix it belongs to.
#[derive(Debug, Clone)]
pub struct ContentMatrix {
    pub matrix: SparseMatrix,
    pub feature_mapper: TokenMapper,
}

/// The interaction matrix (users x items), its user and item mappers, and any number of named
/// content matrices over the same items.
#[derive(Debug, Clone)]
pub struct Dataset {
    interactions: SparseMatrix,
    user_mapper: TokenMapper,
    item_mapper: TokenMapper,
    content: BTreeMap<String, ContentMatrix>,
}

impl Dataset {

    pub fn new(
        interactions: SparseMatrix,
        user_mapper: TokenMapper,
        item_mapper: TokenMapper,
    ) -> Result<Self> {

        let dataset = Dataset {
            interactions,
            user_mapper,
            item_mapper,
            content: BTreeMap::new(),
        };

        dataset.verify_consistency()?;

        Ok(dataset)
    }

    /// Rows of the finalized matrix are users, columns are items.
    pub fn from_interactions(finalized: FinalizedMatrix) -> Result<Self> {
        let (matrix, item_mapper, user_mapper) = finalized.into_parts();
        Dataset::new(matrix, user_mapper, item_mapper)
    }

    /// Adds or replaces a content matrix, which must have one row per item.
    pub fn add_content_matrix(
        &mut self,
        name: &str,
        matrix: SparseMatrix,
        feature_mapper: TokenMapper,
    ) -> Result<()> {

        check_content(name, &matrix, &feature_mapper, self.num_items())?;

        if self.content.insert(name.to_string(), ContentMatrix { matrix, feature_mapper }).is_some() {
            warn!("Replaced content matrix {}", name);
        }

        Ok(())
    }

    /// Adds a content matrix built with the item mapper of this dataset as row mapper.
    pub fn add_finalized_content(&mut self, name: &str, finalized: FinalizedMatrix) -> Result<()> {
        let (matrix, feature_mapper, row_mapper) = finalized.into_parts();

        if row_mapper != self.item_mapper {
            return Err(PrepError::inconsistent_shape(
                format!("item mapper of content matrix {}", name),
                self.item_mapper.len(), row_mapper.len()));
        }

        self.add_content_matrix(name, matrix, feature_mapper)
    }

    pub fn num_users(&self) -> usize {
        self.interactions.rows()
    }

    pub fn num_items(&self) -> usize {
        self.interactions.cols()
    }

    pub fn num_interactions(&self) -> usize {
        self.interactions.nnz()
    }

    pub fn get_interaction_matrix(&self) -> &SparseMatrix {
        &self.interactions
    }

    pub fn get_content_matrix(&self, name: &str) -> Result<&SparseMatrix> {
        self.content_entry(name).map(|content| &content.matrix)
    }

    pub fn get_content_feature_mapper(&self, name: &str) -> Result<&TokenMapper> {
        self.content_entry(name).map(|content| &content.feature_mapper)
    }

    /// Maps user identifiers to row indices. The mapper also resolves indices back to tokens.
    pub fn get_row_token_to_index_mapper(&self) -> &TokenMapper {
        &self.user_mapper
    }

    /// Maps item identifiers to column indices.
    pub fn get_column_token_to_index_mapper(&self) -> &TokenMapper {
        &self.item_mapper
    }

    pub fn user_token(&self, user_index: usize) -> Option<&str> {
        self.user_mapper.token(user_index)
    }

    pub fn item_token(&self, item_index: usize) -> Option<&str> {
        self.item_mapper.token(item_index)
    }

    pub fn get_loaded_content_matrix_names(&self) -> BTreeSet<String> {
        self.content.keys().cloned().collect()
    }

    pub fn content_matrices(&self) -> impl Iterator<Item=(&str, &ContentMatrix)> {
        self.content.iter().map(|(name, content)| (name.as_str(), content))
    }

    fn content_entry(&self, name: &str) -> Result<&ContentMatrix> {
        self.content.get(name)
            .ok_or_else(|| PrepError::UnknownContentMatrix(name.to_string()))
    }

    /// Checks that every mapper matches its matrix dimension and every content matrix has one
    /// row per item. A violation means a filtering step lost track of an index.
    pub fn verify_consistency(&self) -> Result<()> {

        if self.user_mapper.len() != self.num_users() {
            return Err(PrepError::inconsistent_shape(
                "user mapper", self.num_users(), self.user_mapper.len()));
        }

        if self.item_mapper.len() != self.num_items() {
            return Err(PrepError::inconsistent_shape(
                "item mapper", self.num_items(), self.item_mapper.len()));
        }

        for (name, content) in self.content.iter() {
            check_content(name, &content.matrix, &content.feature_mapper, self.num_items())?;
        }

        Ok(())
    }

    /// Replaces the interaction values, keeping users and items as they are.
    pub fn with_interactions(self, interactions: SparseMatrix) -> Result<Self> {
        if interactions.shape() != self.interactions.shape() {
            return Err(PrepError::inconsistent_shape(
                "replaced interactions", self.num_users() * self.num_items(),
                interactions.rows() * interactions.cols()));
        }

        Ok(Dataset { interactions, ..self })
    }

    /// Takes over a reshaped reduction of the interaction matrix: reconciles both mappers and
    /// removes the dropped items from every content matrix.
    pub fn apply_reduction(self, reduction: Reduction) -> Result<Self> {

        if !reduction.reshaped {
            return Err(PrepError::configuration(
                "only reshaped reductions can be applied to a dataset"));
        }

        let expected_shape = (
            self.num_users().saturating_sub(reduction.removed_rows.len()),
            self.num_items().saturating_sub(reduction.removed_cols.len()),
        );

        if reduction.matrix.rows() != expected_shape.0 {
            return Err(PrepError::inconsistent_shape(
                "users after reduction", expected_shape.0, reduction.matrix.rows()));
        }

        if reduction.matrix.cols() != expected_shape.1 {
            return Err(PrepError::inconsistent_shape(
                "items after reduction", expected_shape.1, reduction.matrix.cols()));
        }

        // Reconciling validates the removed indices before any content matrix is touched
        let user_mapper = self.user_mapper.reconcile(&reduction.removed_rows)?;
        let item_mapper = self.item_mapper.reconcile(&reduction.removed_cols)?;
        let content = remove_items_from_content(self.content, &reduction.removed_cols)?;

        let dataset = Dataset {
            interactions: reduction.matrix,
            user_mapper,
            item_mapper,
            content,
        };

        dataset.verify_consistency()?;

        Ok(dataset)
    }

    /// Removes items from the interactions and from every content matrix. Features which no
    /// longer occur are dropped from the content matrices.
    pub fn remove_items(self, removed_items: &RemovedIndices) -> Result<Self> {

        let item_mapper = self.item_mapper.reconcile(removed_items)?;

        let keep = sparse::keep_mask(self.num_items(), removed_items);
        let interactions = sparse::select_columns(&self.interactions, &keep);
        let content = remove_items_from_content(self.content, removed_items)?;

        let dataset = Dataset {
            interactions,
            user_mapper: self.user_mapper,
            item_mapper,
            content,
        };

        dataset.verify_consistency()?;

        Ok(dataset)
    }

    /// Prunes the features of every content matrix with the given occurrence bounds.
    pub fn prune_content_features(mut self, bounds: FeatureBounds) -> Result<Self> {

        for (name, content) in self.content.iter_mut() {
            info!("Pruning features of {}", name);
            let pruned = bounds.prune(&content.matrix, &content.feature_mapper)?;
            content.matrix = pruned.matrix;
            content.feature_mapper = pruned.mapper;
        }

        Ok(self)
    }

    /// Stacks the given content matrices side by side into a new one. Feature tokens are
    /// prefixed with the name of their source matrix, as in `credits:actor_1`, so that equal
    /// tokens from different sources stay apart.
    pub fn merge_content_matrices(&mut self, names: &[&str], merged_name: &str) -> Result<()> {

        if names.is_empty() {
            return Err(PrepError::configuration("no content matrices to merge"));
        }

        let mut sources = Vec::with_capacity(names.len());
        for name in names.iter() {
            sources.push((*name, self.content_entry(name)?));
        }

        let matrices: Vec<&SparseMatrix> = sources.iter()
            .map(|(_, content)| &content.matrix)
            .collect();
        let merged = sparse::hstack(&matrices);

        let mut feature_mapper = TokenMapper::with_capacity(merged.cols());
        for (name, content) in sources.iter() {
            for token in content.feature_mapper.tokens() {
                feature_mapper.insert(&format!("{}:{}", name, token));
            }
        }

        info!("Merged {} into {} with {} features", names.join(", "), merged_name, merged.cols());

        self.add_content_matrix(merged_name, merged, feature_mapper)
    }

    /// Removes the items without any feature in the named content matrix from the interactions,
    /// followed by a k=1 k-cores pass to drop users left without interactions.
    pub fn restrict_items_to_content(self, name: &str, ctx: &mut RunContext) -> Result<Self> {

        let content = self.content_entry(name)?;
        let items_without_content =
            sparse::empty_indices(&sparse::row_degrees(&sparse::eliminate_zeros(&content.matrix)));

        info!("{} items have no entry in {}", items_without_content.len(), name);

        let restricted = sparse::clear_columns(&self.interactions, &items_without_content);
        let reduction = kcore::select_k_cores(restricted, 1, true, ctx)?;

        self.apply_reduction(reduction)
    }

    pub fn into_parts(self) -> (SparseMatrix, TokenMapper, TokenMapper, BTreeMap<String, ContentMatrix>) {
        (self.interactions, self.user_mapper, self.item_mapper, self.content)
    }
}

fn check_content(
    name: &str,
    matrix: &SparseMatrix,
    feature_mapper: &TokenMapper,
    num_items: usize,
) -> Result<()> {

    if matrix.rows() != num_items {
        return Err(PrepError::inconsistent_shape(
            format!("rows of content matrix {}", name), num_items, matrix.rows()));
    }

    if feature_mapper.len() != matrix.cols() {
        return Err(PrepError::inconsistent_shape(
            format!("feature mapper of content matrix {}", name), matrix.cols(),
            feature_mapper.len()));
    }

    Ok(())
}

/// Drops the removed item rows from every content matrix, then drops the features which no
/// longer occur at all.
fn remove_items_from_content(
    content: BTreeMap<String, ContentMatrix>,
    removed_items: &RemovedIndices,
) -> Result<BTreeMap<String, ContentMatrix>> {

    let mut reduced = BTreeMap::new();

    for (name, content) in content.into_iter() {
        info!("Removing {} items from {}", removed_items.len(), name);

        let keep = sparse::keep_mask(content.matrix.rows(), removed_items);
        let without_items = sparse::select_rows(&content.matrix, &keep);
        let pruned = FeatureBounds::present().prune(&without_items, &content.feature_mapper)?;

        reduced.insert(name, ContentMatrix { matrix: pruned.matrix, feature_mapper: pruned.mapper });
    }

    Ok(reduced)
}
