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

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde_derive::{Deserialize, Serialize};
use sprs::CsMat;

use crate::builder::{FinalizedMatrix, MatrixBuilder, NewTokenPolicy};
use crate::config::DatasetConfig;
use crate::dataset::Dataset;
use crate::errors::{PrepError, Result};
use crate::features::FeatureBounds;
use crate::mapper::TokenMapper;
use crate::types::SparseMatrix;

/// Reads a tab separated file without headers. Lines hold a row token, a column token and an
/// optional value.
pub fn tsv_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;

    Ok(reader)
}

pub fn tsv_reader_from<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(input)
}

fn parse_record(record: &csv::StringRecord) -> Option<(String, String, f64)> {
    let row = record.get(0)?.trim();
    let column = record.get(1)?.trim();

    if row.is_empty() || column.is_empty() {
        return None;
    }

    let value = match record.get(2).map(|value| value.trim()) {
        None | Some("") => 1.0,
        Some(value) => value.parse::<f64>().ok()?,
    };

    Some((row.to_string(), column.to_string(), value))
}

/// Streams `(row token, column token, value)` triples. A missing value means 1.0. Records that
/// cannot be read or parsed are skipped with a warning.
pub fn triples_from_tsv<'a, R>(
    reader: &'a mut csv::Reader<R>
) -> impl Iterator<Item=(String, String, f64)> + 'a
    where R: Read {

    reader.records()
        .enumerate()
        .filter_map(|(line, result)| {
            match result {
                Ok(record) => {
                    let triple = parse_record(&record);
                    if triple.is_none() {
                        warn!("Skipping malformed record on line {}: {:?}", line + 1, record);
                    }
                    triple
                },
                Err(error) => {
                    warn!("Skipping unreadable record on line {}: {}", line + 1, error);
                    None
                },
            }
        })
}

/// Feeds all triples of a file into `builder`.
pub fn load_triples<P: AsRef<Path>>(path: P, mut builder: MatrixBuilder) -> Result<FinalizedMatrix> {
    let mut reader = tsv_reader(&path)?;
    let num_added = builder.add_triples(triples_from_tsv(&mut reader))?;

    info!("Read {} entries from {}", num_added, path.as_ref().display());

    Ok(builder.finalize())
}

/// Reads a user \t item [\t value] file into a dataset without content.
pub fn load_interactions<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let finalized = load_triples(path, MatrixBuilder::new())?;
    Dataset::from_interactions(finalized)
}

/// Reads an item \t feature [\t value] file into a content matrix over the items of `dataset`.
pub fn load_content<P: AsRef<Path>>(
    dataset: &mut Dataset,
    name: &str,
    path: P,
    on_new_item: NewTokenPolicy,
) -> Result<()> {

    if on_new_item == NewTokenPolicy::Add {
        return Err(PrepError::configuration(
            "content files cannot add items, use ignore or error"));
    }

    let builder = MatrixBuilder::with_policies(on_new_item, NewTokenPolicy::Add)
        .with_row_mapper(dataset.get_column_token_to_index_mapper().clone())?;

    let finalized = load_triples(path, builder)?;
    dataset.add_finalized_content(name, finalized)
}

/// Loads the interactions and content files of a configured dataset and prunes the features of
/// its content matrices.
pub fn load_dataset(config: &DatasetConfig, bounds: FeatureBounds) -> Result<Dataset> {

    info!("Loading dataset {}", config.name);

    let on_new_item = config.content_item_policy()?;
    let mut dataset = load_interactions(&config.interactions)?;

    for (name, path) in config.content.iter() {
        load_content(&mut dataset, name, path, on_new_item)?;
    }

    dataset.prune_content_features(bounds)
}

/// CSR arrays of a matrix.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct MatrixSnapshot {
    num_rows: usize,
    num_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl MatrixSnapshot {

    fn from_matrix(matrix: &SparseMatrix) -> Self {
        let csr = if matrix.is_csr() { matrix.clone() } else { matrix.to_csr() };

        let mut indptr = Vec::with_capacity(csr.rows() + 1);
        let mut indices = Vec::with_capacity(csr.nnz());
        let mut data = Vec::with_capacity(csr.nnz());

        indptr.push(0);
        for row in csr.outer_iterator() {
            for (column, value) in row.iter() {
                indices.push(column);
                data.push(*value);
            }
            indptr.push(indices.len());
        }

        MatrixSnapshot { num_rows: csr.rows(), num_cols: csr.cols(), indptr, indices, data }
    }

    fn into_matrix(self) -> Result<SparseMatrix> {
        let shape = (self.num_rows, self.num_cols);
        CsMat::try_new(shape, self.indptr, self.indices, self.data)
            .map_err(|_| PrepError::configuration(
                format!("stored {}x{} matrix is not a valid CSR matrix", shape.0, shape.1)))
    }
}

#[derive(Serialize, Deserialize)]
struct ContentSnapshot {
    name: String,
    features: TokenMapper,
    matrix: MatrixSnapshot,
}

#[derive(Serialize, Deserialize)]
struct DatasetSnapshot {
    users: TokenMapper,
    items: TokenMapper,
    interactions: MatrixSnapshot,
    content: Vec<ContentSnapshot>,
}

pub fn write_dataset_to<W: Write>(dataset: &Dataset, out: W) -> Result<()> {

    let content = dataset.content_matrices()
        .map(|(name, content)| ContentSnapshot {
            name: name.to_string(),
            features: content.feature_mapper.clone(),
            matrix: MatrixSnapshot::from_matrix(&content.matrix),
        })
        .collect();

    let snapshot = DatasetSnapshot {
        users: dataset.get_row_token_to_index_mapper().clone(),
        items: dataset.get_column_token_to_index_mapper().clone(),
        interactions: MatrixSnapshot::from_matrix(dataset.get_interaction_matrix()),
        content,
    };

    serde_json::to_writer(out, &snapshot)?;

    Ok(())
}

/// Writes the dataset as JSON. If an `output_path` is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_dataset(dataset: &Dataset, output_path: Option<&str>) -> Result<()> {

    let mut out: Box<dyn Write> = match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(&Path::new(path))?)),
        _ => Box::new(io::stdout())
    };

    write_dataset_to(dataset, &mut out)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

pub fn read_dataset_from<R: Read>(input: R) -> Result<Dataset> {

    let snapshot: DatasetSnapshot = serde_json::from_reader(input)?;

    let mut dataset = Dataset::new(
        snapshot.interactions.into_matrix()?, snapshot.users, snapshot.items)?;

    for content in snapshot.content.into_iter() {
        dataset.add_content_matrix(&content.name, content.matrix.into_matrix()?, content.features)?;
    }

    Ok(dataset)
}

pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    read_dataset_from(BufReader::new(File::open(path)?))
}
