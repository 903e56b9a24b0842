use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_derive::Deserialize;

use crate::builder::NewTokenPolicy;
use crate::errors::Result;
use crate::features::FeatureBounds;
use crate::postprocessing::{ImplicitInteractions, KCores, Pipeline, UserMinInteractions,
    UserSample};

/// A full run of the command line tool: datasets to load and the stages to apply to each of them.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    /// Applied to every content matrix right after loading.
    #[serde(default)]
    pub feature_bounds: FeatureBounds,
}

/// Where to find the tab separated files of a dataset, and where to write the result.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub interactions: String,
    /// Content matrix name to file path.
    #[serde(default)]
    pub content: BTreeMap<String, String>,
    /// Items in content files that have no interactions, one of `ignore` or `error`.
    #[serde(default = "default_content_items_policy")]
    pub on_new_content_item: String,
    /// Base folder for the result, which ends up in `<output>/<stage folders>/<name>.json`.
    /// Without it, the result is written to stdout.
    pub output: Option<String>,
}

fn default_content_items_policy() -> String {
    "ignore".to_string()
}

impl DatasetConfig {

    pub fn content_item_policy(&self) -> Result<NewTokenPolicy> {
        self.on_new_content_item.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    KCores { k: usize },
    UserMinInteractions { min_interactions: usize },
    UserSample { quota: f64, #[serde(default)] seed: u64 },
    Implicit,
}

impl PipelineConfig {

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.feature_bounds.validate()?;
        for dataset in self.datasets.iter() {
            dataset.content_item_policy()?;
        }
        Ok(())
    }

    /// Validates every stage eagerly, so that a bad threshold fails before any data is read.
    pub fn pipeline(&self) -> Result<Pipeline> {

        let mut pipeline = Pipeline::new();

        for stage in self.stages.iter() {
            pipeline = match *stage {
                StageConfig::KCores { k } => pipeline.then(KCores::new(k)?),
                StageConfig::UserMinInteractions { min_interactions } =>
                    pipeline.then(UserMinInteractions::new(min_interactions)?),
                StageConfig::UserSample { quota, seed } =>
                    pipeline.then(UserSample::new(quota, seed)?),
                StageConfig::Implicit => pipeline.then(ImplicitInteractions),
            };
        }

        Ok(pipeline)
    }
}
