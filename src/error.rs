// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type shared by the whole crate.

use thiserror::Error;

/// Everything that can go wrong while deriving geometry from a trajectory.
#[derive(Debug, Error)]
pub enum Error {
    /// Two grids that must be aligned pixel per pixel have different shapes.
    /// Shapes are given as `(rows, columns)`.
    #[error("dimension mismatch: expected {expected:?} (rows, cols), got {actual:?}")]
    DimensionMismatch {
        /// Shape of the reference grid.
        expected: (usize, usize),
        /// Shape of the offending grid.
        actual: (usize, usize),
    },

    /// A parameter is outside of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A raster does not have the expected layout.
    #[error("unsupported format: {0}")]
    Format(String),

    /// A render log line could not be parsed.
    #[error("parsing error: {0}")]
    Parse(String),

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// PNG decoding failure.
    #[error(transparent)]
    Png(#[from] png::DecodingError),

    /// Image encoding or decoding failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Result type of every fallible function of the crate.
pub type Result<T> = std::result::Result<T, Error>;
