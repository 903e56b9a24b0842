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

use std::convert::TryFrom;

use fnv::FnvHashMap;
use serde_derive::{Deserialize, Serialize};

use crate::errors::{PrepError, Result};
use crate::types::RemovedIndices;

/// Bidirectional mapping between original identifiers and consecutive integer indices. Indices
/// always cover exactly `0..len()`, so the mapper size equals the matrix dimension it describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TokenMapper {
    token_to_index: FnvHashMap<String, usize>,
    index_to_token: Vec<String>,
}

impl TokenMapper {

    pub fn new() -> Self {
        TokenMapper::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TokenMapper {
            token_to_index: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            index_to_token: Vec::with_capacity(capacity),
        }
    }

    /// Assigns indices in iteration order. Repeated tokens would break the bijection, so they
    /// are rejected.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
        where I: IntoIterator<Item=S>, S: Into<String> {

        let mut mapper = TokenMapper::new();

        for token in tokens.into_iter() {
            let token = token.into();
            if mapper.contains(&token) {
                return Err(PrepError::configuration(
                    format!("token '{}' appears more than once", token)));
            }
            mapper.insert(&token);
        }

        Ok(mapper)
    }

    pub fn len(&self) -> usize {
        self.index_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_token.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_index.contains_key(token)
    }

    pub fn index(&self, token: &str) -> Option<usize> {
        self.token_to_index.get(token).cloned()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.index_to_token.get(index).map(|token| token.as_str())
    }

    /// Returns the index of `token`, assigning the next free index on first sight.
    pub fn insert(&mut self, token: &str) -> usize {
        if let Some(index) = self.token_to_index.get(token) {
            return *index;
        }

        let index = self.index_to_token.len();
        self.token_to_index.insert(token.to_string(), index);
        self.index_to_token.push(token.to_string());

        index
    }

    /// Tokens in index order.
    pub fn tokens(&self) -> impl Iterator<Item=&str> {
        self.index_to_token.iter().map(|token| token.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, usize)> {
        self.index_to_token.iter()
            .enumerate()
            .map(|(index, token)| (token.as_str(), index))
    }

    pub fn as_map(&self) -> &FnvHashMap<String, usize> {
        &self.token_to_index
    }

    /// Drops the tokens whose index was removed and renumbers the survivors densely, keeping
    /// their relative order.
    pub fn reconcile(&self, removed: &RemovedIndices) -> Result<TokenMapper> {

        let (shifts, removed_mask) = removal_shifts(self.len(), removed)?;

        let num_remaining = self.len() - removed.len();
        let mut index_to_token: Vec<String> = vec![String::new(); num_remaining];
        let mut token_to_index: FnvHashMap<String, usize> =
            FnvHashMap::with_capacity_and_hasher(num_remaining, Default::default());

        for (index, token) in self.index_to_token.iter().enumerate() {
            if !removed_mask[index] {
                let new_index = index - shifts[index];
                index_to_token[new_index] = token.clone();
                token_to_index.insert(token.clone(), new_index);
            }
        }

        Ok(TokenMapper { token_to_index, index_to_token })
    }
}

/// For every index `i` in `0..len`, the number of removed indices smaller than `i`, together
/// with a removal mask. Lets a reconciliation renumber a token in constant time.
pub fn removal_shifts(len: usize, removed: &RemovedIndices) -> Result<(Vec<usize>, Vec<bool>)> {

    let mut removed_mask = vec![false; len];

    for index in removed.iter() {
        if *index >= len {
            return Err(PrepError::inconsistent_shape(
                format!("removed index {} of mapper", index), len, index + 1));
        }
        removed_mask[*index] = true;
    }

    let mut shifts = Vec::with_capacity(len);
    let mut num_removed_so_far = 0;

    for is_removed in removed_mask.iter() {
        shifts.push(num_removed_so_far);
        if *is_removed {
            num_removed_so_far += 1;
        }
    }

    Ok((shifts, removed_mask))
}

/// Reconciles a plain token to index map, which must be dense over `0..map.len()`.
pub fn reconcile_mapper(
    mapper: &FnvHashMap<String, usize>,
    removed: &RemovedIndices,
) -> Result<FnvHashMap<String, usize>> {

    let (shifts, removed_mask) = removal_shifts(mapper.len(), removed)?;

    let mut reconciled: FnvHashMap<String, usize> =
        FnvHashMap::with_capacity_and_hasher(mapper.len() - removed.len(), Default::default());

    for (token, index) in mapper.iter() {
        if *index >= mapper.len() {
            return Err(PrepError::inconsistent_shape(
                format!("index of token '{}'", token), mapper.len(), index + 1));
        }
        if !removed_mask[*index] {
            reconciled.insert(token.clone(), index - shifts[*index]);
        }
    }

    Ok(reconciled)
}

impl TryFrom<Vec<String>> for TokenMapper {
    type Error = PrepError;

    fn try_from(tokens: Vec<String>) -> Result<Self> {
        TokenMapper::from_tokens(tokens)
    }
}

impl From<TokenMapper> for Vec<String> {
    fn from(mapper: TokenMapper) -> Self {
        mapper.index_to_token
    }
}
