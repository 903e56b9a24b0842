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

//! Ingestion and consistent pruning of recommender datasets.
//!
//! Raw `user, item, value` and `item, feature, value` triples are turned into sparse matrices
//! with bidirectional token mappers. Filters such as k-cores remove users and items, and every
//! removal is propagated to the mappers and to all content matrices of a dataset, so that the
//! interaction matrix, its mappers and its content matrices always agree on the item index space.

#[macro_use]
extern crate log;

pub mod builder;
pub mod config;
pub mod context;
pub mod dataset;
pub mod errors;
pub mod features;
pub mod filters;
pub mod io;
pub mod kcore;
pub mod mapper;
pub mod postprocessing;
pub mod sparse;
pub mod types;
pub mod utils;

mod usage_tests;

pub use crate::builder::{FinalizedMatrix, MatrixBuilder, NewTokenPolicy};
pub use crate::context::{RunContext, Warning};
pub use crate::dataset::{ContentMatrix, Dataset};
pub use crate::errors::{PrepError, Result};
pub use crate::features::FeatureBounds;
pub use crate::kcore::{select_k_cores, Reduction};
pub use crate::mapper::TokenMapper;
pub use crate::postprocessing::{Pipeline, Postprocessing};
pub use crate::types::SparseMatrix;
