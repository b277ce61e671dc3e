// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mesh generation and decoding
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid extrusion parameters: {0}")]
    InvalidExtrusion(String),

    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    #[error("Malformed mesh asset: {0}")]
    MeshAsset(String),

    #[error("Malformed sculpt map: {0}")]
    Sculpt(String),

    #[error("Triangle {triangle} references vertex {index}, mesh has {vertex_count}")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Core error: {0}")]
    Core(#[from] prim_lite_core::Error),
}

impl Error {
    pub(crate) fn asset(message: impl Into<String>) -> Self {
        Error::MeshAsset(message.into())
    }
}
