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

use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrepError>;

/// The two dimensions a token can belong to while a matrix is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Row,
    Column,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dimension::Row => write!(f, "row"),
            Dimension::Column => write!(f, "column"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PrepError {
    /// A token was not found in a mapper whose new-token policy is `error`.
    #[error("Unknown {dimension} token '{token}'")]
    UnknownToken { dimension: Dimension, token: String },

    /// Invalid policy strings, thresholds or quotas. Never clamped.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Matrices or mappers that should be aligned are not. Always fatal.
    #[error("Inconsistent shape in {context}: expected {expected}, found {actual}")]
    InconsistentShape {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("No content matrix named '{0}' is loaded")]
    UnknownContentMatrix(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PrepError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PrepError::Configuration(message.into())
    }

    pub fn inconsistent_shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        PrepError::InconsistentShape {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn is_inconsistent_shape(&self) -> bool {
        match self {
            PrepError::InconsistentShape { .. } => true,
            _ => false,
        }
    }
}
