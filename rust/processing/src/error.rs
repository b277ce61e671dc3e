// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for batch processing.

use thiserror::Error;

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while running mesh jobs
#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(#[from] prim_lite_geometry::Error),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),
}
