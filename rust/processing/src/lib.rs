// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch meshing shared by services and command-line tools.
//!
//! Fans independent [`MeshJob`]s out over a rayon pool, optionally
//! reusing meshes from a [`MeshCache`], and returns serializable results.

pub mod cache;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;

pub use cache::MeshCache;
pub use config::ProcessingConfig;
pub use error::{Error, Result};
pub use job::{parse_manifest, BatchResult, BatchStats, JobResult, MeshData, MeshJob, MeshSource};
pub use pipeline::{process_batch, MeshPipeline};
