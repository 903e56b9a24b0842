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
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use sprs::TriMat;

use crate::errors::{Dimension, PrepError, Result};
use crate::mapper::TokenMapper;
use crate::types::SparseMatrix;

/// What to do with a token that its dimension's mapper does not know yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum NewTokenPolicy {
    /// Assign the next free index.
    Add,
    /// Silently drop the whole triple.
    Ignore,
    /// Fail with an unknown token error.
    Error,
}

impl FromStr for NewTokenPolicy {
    type Err = PrepError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "add" => Ok(NewTokenPolicy::Add),
            "ignore" => Ok(NewTokenPolicy::Ignore),
            "error" => Ok(NewTokenPolicy::Error),
            _ => Err(PrepError::configuration(format!(
                "unknown new token policy '{}', expected one of add, ignore, error", name))),
        }
    }
}

impl TryFrom<String> for NewTokenPolicy {
    type Error = PrepError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Values for a row added in one go.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    Shared(f64),
    PerToken(Vec<f64>),
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Shared(value)
    }
}

impl From<Vec<f64>> for RowValues {
    fn from(values: Vec<f64>) -> Self {
        RowValues::PerToken(values)
    }
}

enum Resolution {
    Known(usize),
    New,
    Dropped,
}

fn resolve(
    mapper: &TokenMapper,
    policy: NewTokenPolicy,
    token: &str,
    dimension: Dimension,
) -> Result<Resolution> {
    match mapper.index(token) {
        Some(index) => Ok(Resolution::Known(index)),
        None => match policy {
            NewTokenPolicy::Add => Ok(Resolution::New),
            NewTokenPolicy::Ignore => Ok(Resolution::Dropped),
            NewTokenPolicy::Error => Err(PrepError::UnknownToken {
                dimension,
                token: token.to_string(),
            }),
        },
    }
}

/// The immutable result of a build.
#[derive(Debug, Clone)]
pub struct FinalizedMatrix {
    pub matrix: SparseMatrix,
    pub column_mapper: TokenMapper,
    pub row_mapper: TokenMapper,
}

impl FinalizedMatrix {
    pub fn into_parts(self) -> (SparseMatrix, TokenMapper, TokenMapper) {
        (self.matrix, self.column_mapper, self.row_mapper)
    }
}

/// Builds a sparse matrix from a stream of `(row token, column token, value)` triples, assigning
/// consecutive indices to tokens as they are first seen.
///
/// Triples are kept in coordinate form until `finalize`, so repeated coordinates are not merged
/// on insert. They are summed when the matrix is compressed, as usual for sparse coordinate
/// matrices. Memory grows with the number of triples added, not with the matrix shape.
#[derive(Debug)]
pub struct MatrixBuilder {
    row_mapper: TokenMapper,
    column_mapper: TokenMapper,
    on_new_row: NewTokenPolicy,
    on_new_column: NewTokenPolicy,
    row_indices: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<f64>,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        MatrixBuilder::new()
    }
}

impl MatrixBuilder {

    /// Empty mappers, new tokens are added in both dimensions.
    pub fn new() -> Self {
        MatrixBuilder::with_policies(NewTokenPolicy::Add, NewTokenPolicy::Add)
    }

    pub fn with_policies(on_new_row: NewTokenPolicy, on_new_column: NewTokenPolicy) -> Self {
        MatrixBuilder {
            row_mapper: TokenMapper::new(),
            column_mapper: TokenMapper::new(),
            on_new_row,
            on_new_column,
            row_indices: Vec::new(),
            column_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Like `with_policies`, for policies given by name.
    pub fn with_policy_names(on_new_row: &str, on_new_column: &str) -> Result<Self> {
        Ok(MatrixBuilder::with_policies(on_new_row.parse()?, on_new_column.parse()?))
    }

    /// Preinitializes the row mapper. Recorded triples refer to the current mappers, so this
    /// fails once a triple was added.
    pub fn with_row_mapper(mut self, mapper: TokenMapper) -> Result<Self> {
        self.check_no_entries("row")?;
        self.row_mapper = mapper;
        Ok(self)
    }

    pub fn with_column_mapper(mut self, mapper: TokenMapper) -> Result<Self> {
        self.check_no_entries("column")?;
        self.column_mapper = mapper;
        Ok(self)
    }

    fn check_no_entries(&self, dimension: &str) -> Result<()> {
        if self.num_entries() > 0 {
            return Err(PrepError::configuration(format!(
                "cannot replace the {} mapper after {} triples were added", dimension,
                self.num_entries())));
        }
        Ok(())
    }

    pub fn num_entries(&self) -> usize {
        self.values.len()
    }

    pub fn row_mapper(&self) -> &TokenMapper {
        &self.row_mapper
    }

    pub fn column_mapper(&self) -> &TokenMapper {
        &self.column_mapper
    }

    /// Records a single entry. Returns false if the triple was dropped because one of its tokens
    /// is unknown under the `ignore` policy; in that case neither token is added.
    pub fn add_triple(&mut self, row_token: &str, column_token: &str, value: f64) -> Result<bool> {

        let row = resolve(&self.row_mapper, self.on_new_row, row_token, Dimension::Row)?;
        let column = resolve(
            &self.column_mapper, self.on_new_column, column_token, Dimension::Column)?;

        let (row_index, column_index) = match (row, column) {
            (Resolution::Dropped, _) | (_, Resolution::Dropped) => return Ok(false),
            (row, column) => {
                let row_index = match row {
                    Resolution::Known(index) => index,
                    _ => self.row_mapper.insert(row_token),
                };
                let column_index = match column {
                    Resolution::Known(index) => index,
                    _ => self.column_mapper.insert(column_token),
                };
                (row_index, column_index)
            },
        };

        self.row_indices.push(row_index);
        self.column_indices.push(column_index);
        self.values.push(value);

        Ok(true)
    }

    /// Adds one row at once, for example all features of an item. Returns the number of entries
    /// recorded.
    pub fn add_row<S, V>(&mut self, row_token: &str, column_tokens: &[S], values: V) -> Result<usize>
        where S: AsRef<str>, V: Into<RowValues> {

        let values = values.into();

        if let RowValues::PerToken(ref per_token) = values {
            if per_token.len() != column_tokens.len() {
                return Err(PrepError::configuration(format!(
                    "row '{}' has {} column tokens but {} values", row_token,
                    column_tokens.len(), per_token.len())));
            }
        }

        let mut num_added = 0;

        for (position, column_token) in column_tokens.iter().enumerate() {
            let value = match values {
                RowValues::Shared(value) => value,
                RowValues::PerToken(ref per_token) => per_token[position],
            };

            if self.add_triple(row_token, column_token.as_ref(), value)? {
                num_added += 1;
            }
        }

        Ok(num_added)
    }

    /// Adds a stream of triples, stopping at the first error. Returns the number of entries
    /// recorded.
    pub fn add_triples<I, R, C>(&mut self, triples: I) -> Result<usize>
        where I: IntoIterator<Item=(R, C, f64)>, R: AsRef<str>, C: AsRef<str> {

        let mut num_added = 0;

        for (row_token, column_token, value) in triples.into_iter() {
            if self.add_triple(row_token.as_ref(), column_token.as_ref(), value)? {
                num_added += 1;
            }
        }

        Ok(num_added)
    }

    /// Compresses the collected triples into a CSR matrix. The shape follows the mappers, so
    /// rows and columns that were preinitialized but never used are kept as empty lanes.
    pub fn finalize(self) -> FinalizedMatrix {

        let shape = (self.row_mapper.len(), self.column_mapper.len());

        debug!("Compressing {} triples into a {}x{} matrix", self.values.len(), shape.0, shape.1);

        let triplets = TriMat::from_triplets(
            shape, self.row_indices, self.column_indices, self.values);

        FinalizedMatrix {
            matrix: triplets.to_csr(),
            column_mapper: self.column_mapper,
            row_mapper: self.row_mapper,
        }
    }
}


#[cfg(test)]
mod tests {

    use crate::builder::{MatrixBuilder, NewTokenPolicy};
    use crate::errors::{Dimension, PrepError};
    use crate::mapper::TokenMapper;

    #[test]
    fn duplicate_coordinates_are_summed() {
        let mut builder = MatrixBuilder::new();

        builder.add_triple("u1", "i1", 1.0).unwrap();
        builder.add_triple("u1", "i1", 1.0).unwrap();

        assert_eq!(builder.num_entries(), 2);

        let finalized = builder.finalize();

        assert_eq!(finalized.matrix.shape(), (1, 1));
        assert_eq!(finalized.matrix.get(0, 0), Some(&2.0));
    }

    #[test]
    fn ignore_policy_drops_the_whole_triple() {
        let items = TokenMapper::from_tokens(vec!["i1", "i2"]).unwrap();
        let mut builder = MatrixBuilder::with_policies(NewTokenPolicy::Add, NewTokenPolicy::Ignore)
            .with_column_mapper(items).unwrap();

        assert!(builder.add_triple("u1", "i1", 1.0).unwrap());
        assert!(!builder.add_triple("u2", "i9", 1.0).unwrap());

        let (matrix, columns, rows) = builder.finalize().into_parts();

        // u2 was never added, since its triple was dropped
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.index("u2"), None);
        assert_eq!(columns.len(), 2);
        assert_eq!(matrix.shape(), (1, 2));
        assert_eq!(matrix.nnz(), 1);
    }

    #[test]
    fn error_policy_reports_the_token() {
        let users = TokenMapper::from_tokens(vec!["u1"]).unwrap();
        let mut builder = MatrixBuilder::with_policies(NewTokenPolicy::Error, NewTokenPolicy::Add)
            .with_row_mapper(users).unwrap();

        match builder.add_triple("u7", "i1", 1.0) {
            Err(PrepError::UnknownToken { dimension, token }) => {
                assert_eq!(dimension, Dimension::Row);
                assert_eq!(token, "u7");
            },
            other => panic!("expected unknown token error, got {:?}", other),
        }

        // The failed call must not leave anything behind
        assert_eq!(builder.num_entries(), 0);
        assert!(builder.column_mapper().is_empty());
    }

    #[test]
    fn policy_names() {
        assert_eq!("add".parse::<NewTokenPolicy>().unwrap(), NewTokenPolicy::Add);
        assert_eq!("ignore".parse::<NewTokenPolicy>().unwrap(), NewTokenPolicy::Ignore);
        assert_eq!("error".parse::<NewTokenPolicy>().unwrap(), NewTokenPolicy::Error);

        assert!(MatrixBuilder::with_policy_names("add", "skip").is_err());

        let policy: NewTokenPolicy = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(policy, NewTokenPolicy::Ignore);
        assert_eq!(serde_json::to_string(&NewTokenPolicy::Error).unwrap(), "\"error\"");

        let unknown = serde_json::from_str::<NewTokenPolicy>("\"skip\"").unwrap_err();
        assert!(unknown.to_string().contains("unknown new token policy 'skip'"));
    }

    #[test]
    fn preinitialized_mappers_define_the_shape() {
        let items = TokenMapper::from_tokens(vec!["i1", "i2", "i3", "i4"]).unwrap();
        let mut builder = MatrixBuilder::new().with_row_mapper(items).unwrap();

        builder.add_row("i2", &["drama", "comedy"], 1.0).unwrap();

        let finalized = builder.finalize();

        assert_eq!(finalized.matrix.shape(), (4, 2));
        assert_eq!(finalized.matrix.get(1, 0), Some(&1.0));
        assert_eq!(finalized.matrix.get(1, 1), Some(&1.0));
        assert_eq!(finalized.column_mapper.index("comedy"), Some(1));
    }

    #[test]
    fn mappers_cannot_be_replaced_after_adding_triples() {
        let mut builder = MatrixBuilder::new();
        builder.add_triple("u1", "i9", 1.0).unwrap();

        let items = TokenMapper::from_tokens(vec!["i1"]).unwrap();
        match builder.with_column_mapper(items) {
            Err(PrepError::Configuration(message)) => assert!(message.contains("column mapper")),
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }

        let mut builder = MatrixBuilder::new();
        builder.add_triple("u1", "i1", 1.0).unwrap();
        let users = TokenMapper::from_tokens(vec!["u5", "u6"]).unwrap();
        assert!(builder.with_row_mapper(users).is_err());
    }

    #[test]
    fn rows_with_per_token_values() {
        let mut builder = MatrixBuilder::new();

        let added = builder.add_row("i1", &["a", "b", "a"], vec![0.5, 2.0, 0.25]).unwrap();
        assert_eq!(added, 3);

        assert!(builder.add_row("i2", &["a", "b"], vec![1.0]).is_err());

        let finalized = builder.finalize();

        assert_eq!(finalized.matrix.shape(), (1, 2));
        assert_eq!(finalized.matrix.get(0, 0), Some(&0.75));
        assert_eq!(finalized.matrix.get(0, 1), Some(&2.0));
    }

    #[test]
    fn batches_of_triples() {
        let triples = vec![
            ("alice", "apple", 1.0),
            ("alice", "dog", 1.0),
            ("bob", "apple", 3.0),
        ];

        let mut builder = MatrixBuilder::new();
        assert_eq!(builder.add_triples(triples).unwrap(), 3);

        let finalized = builder.finalize();

        assert_eq!(finalized.row_mapper.tokens().collect::<Vec<_>>(), vec!["alice", "bob"]);
        assert_eq!(finalized.column_mapper.tokens().collect::<Vec<_>>(), vec!["apple", "dog"]);
        assert_eq!(finalized.matrix.get(1, 0), Some(&3.0));
    }
}
