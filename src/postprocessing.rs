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

//! Dataset-level filtering stages. Every stage takes ownership of a dataset and hands a new,
//! consistent one to the next stage.

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::context::RunContext;
use crate::dataset::Dataset;
use crate::errors::{PrepError, Result};
use crate::filters;
use crate::kcore;
use crate::sparse;
use crate::utils;

pub const ORIGINAL_SUBFOLDER: &str = "original/";

pub trait Postprocessing {

    /// Name of the folder holding data processed by this stage, for example `5_cores/`.
    fn subfolder(&self) -> String;

    fn apply(&self, dataset: Dataset, ctx: &mut RunContext) -> Result<Dataset>;
}

/// Keeps the k-core of the interactions, see `kcore::select_k_cores`.
#[derive(Debug, Clone, Copy)]
pub struct KCores {
    k: usize,
}

impl KCores {
    pub fn new(k: usize) -> Result<Self> {
        if k < 1 {
            return Err(PrepError::configuration(
                format!("k_cores_value must be >= 1, provided value was {}", k)));
        }
        Ok(KCores { k })
    }
}

impl Postprocessing for KCores {

    fn subfolder(&self) -> String {
        format!("{}_cores/", self.k)
    }

    fn apply(&self, dataset: Dataset, ctx: &mut RunContext) -> Result<Dataset> {
        let interactions = dataset.get_interaction_matrix().clone();
        let reduction = kcore::select_k_cores(interactions, self.k, true, ctx)?;
        dataset.apply_reduction(reduction)
    }
}

/// Keeps the users with at least `min_interactions` interactions.
#[derive(Debug, Clone, Copy)]
pub struct UserMinInteractions {
    min_interactions: usize,
}

impl UserMinInteractions {
    pub fn new(min_interactions: usize) -> Result<Self> {
        if min_interactions < 1 {
            return Err(PrepError::configuration(format!(
                "min_interactions must be >= 1, provided value was {}", min_interactions)));
        }
        Ok(UserMinInteractions { min_interactions })
    }
}

impl Postprocessing for UserMinInteractions {

    fn subfolder(&self) -> String {
        format!("{}_user_min_interactions/", self.min_interactions)
    }

    fn apply(&self, dataset: Dataset, ctx: &mut RunContext) -> Result<Dataset> {
        let interactions = dataset.get_interaction_matrix().clone();
        let reduction = filters::select_users_with_min_interactions(
            interactions, self.min_interactions, true, ctx)?;
        dataset.apply_reduction(reduction)
    }
}

/// Keeps a random share of the users. The same seed always selects the same users.
#[derive(Debug, Clone, Copy)]
pub struct UserSample {
    quota: f64,
    seed: u64,
}

impl UserSample {
    pub fn new(quota: f64, seed: u64) -> Result<Self> {
        if !(quota > 0.0 && quota <= 1.0) {
            return Err(PrepError::configuration(format!(
                "user_quota must be within (0, 1], provided value was {}", quota)));
        }
        Ok(UserSample { quota, seed })
    }
}

impl Postprocessing for UserSample {

    fn subfolder(&self) -> String {
        // 1.0 stays `1.0_user_sample/`
        format!("{:?}_user_sample/", self.quota)
    }

    fn apply(&self, dataset: Dataset, ctx: &mut RunContext) -> Result<Dataset> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let interactions = dataset.get_interaction_matrix().clone();
        let reduction = filters::sample_users(interactions, self.quota, &mut rng, ctx)?;
        dataset.apply_reduction(reduction)
    }
}

/// Turns ratings, play counts and other weights into implicit feedback of 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitInteractions;

impl Postprocessing for ImplicitInteractions {

    fn subfolder(&self) -> String {
        "implicit/".to_string()
    }

    fn apply(&self, dataset: Dataset, _ctx: &mut RunContext) -> Result<Dataset> {
        let implicit = sparse::to_implicit(dataset.get_interaction_matrix());
        dataset.with_interactions(implicit)
    }
}

/// Applies stages in order and checks the dataset after each of them.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Postprocessing + Send + Sync>>,
}

impl Pipeline {

    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn then<P>(mut self, stage: P) -> Self
        where P: Postprocessing + Send + Sync + 'static {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Postprocessing + Send + Sync>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Later stages wrap earlier ones, so their folders come first: k-cores followed by implicit
    /// feedback ends up in `implicit/5_cores/`.
    pub fn subfolder(&self) -> String {
        if self.stages.is_empty() {
            return ORIGINAL_SUBFOLDER.to_string();
        }

        self.stages.iter()
            .rev()
            .map(|stage| stage.subfolder())
            .collect()
    }

    pub fn run(&self, dataset: Dataset, ctx: &mut RunContext) -> Result<Dataset> {

        let mut dataset = dataset;

        for stage in self.stages.iter() {
            let start = Instant::now();
            let name = stage.subfolder();

            info!("Applying {} to {} users, {} items and {} interactions", name,
                dataset.num_users(), dataset.num_items(), dataset.num_interactions());

            dataset = stage.apply(dataset, ctx)?;
            dataset.verify_consistency()?;

            info!("Applied {} in {}ms, {} users, {} items and {} interactions remain", name,
                utils::to_millis(start.elapsed()), dataset.num_users(), dataset.num_items(),
                dataset.num_interactions());
        }

        Ok(dataset)
    }
}
