// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel batch meshing.

use crate::cache::MeshCache;
use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::job::{BatchResult, BatchStats, JobResult, MeshData, MeshJob, MeshSource};
use prim_lite_geometry::{Mesh, PrimMesher};
use rayon::prelude::*;
use std::sync::Arc;

/// Runs mesh jobs on a dedicated worker pool
pub struct MeshPipeline {
    config: ProcessingConfig,
    mesher: PrimMesher,
    cache: Option<MeshCache>,
    pool: rayon::ThreadPool,
}

impl MeshPipeline {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("prim-lite-worker-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        let cache = (config.cache_capacity > 0).then(|| MeshCache::new(config.cache_capacity));

        Ok(Self {
            mesher: PrimMesher::new(config.mesher_config()),
            config,
            cache,
            pool,
        })
    }

    /// Build a pipeline configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ProcessingConfig::from_env())
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&MeshCache> {
        self.cache.as_ref()
    }

    /// Mesh a single source without touching the cache
    pub fn mesh(&self, source: &MeshSource) -> Result<Mesh> {
        let mut mesh = match source {
            MeshSource::Primitive { shape } => self.mesher.generate(shape)?,
            MeshSource::Sculpt { sculpt, texture } => self.mesher.sculpt_bytes(texture, sculpt)?,
            MeshSource::Asset { bytes, segment } => match segment {
                Some(name) => self.mesher.mesh_asset_segment(bytes, name)?,
                None => self.mesher.mesh_asset(bytes)?,
            },
        };
        if self.config.compute_normals && !mesh.has_normals() {
            mesh.compute_normals();
        }
        Ok(mesh)
    }

    fn run_job(&self, job: &MeshJob) -> JobResult {
        let cached = self.cache.as_ref().and_then(|cache| cache.get(&job.source));
        let from_cache = cached.is_some();

        let outcome: Result<Arc<Mesh>> = match cached {
            Some(mesh) => Ok(mesh),
            None => self.mesh(&job.source).map(|mesh| match &self.cache {
                Some(cache) => cache.insert(&job.source, mesh),
                None => Arc::new(mesh),
            }),
        };

        match outcome {
            Ok(mesh) => JobResult {
                id: job.id,
                kind: job.source.kind().to_string(),
                mesh: Some(MeshData::from(mesh.as_ref())),
                error: None,
                from_cache,
            },
            Err(err) => {
                tracing::warn!(
                    id = job.id,
                    kind = job.source.kind(),
                    error = %err,
                    "mesh job failed"
                );
                JobResult {
                    id: job.id,
                    kind: job.source.kind().to_string(),
                    mesh: None,
                    error: Some(err.to_string()),
                    from_cache: false,
                }
            }
        }
    }

    /// Run every job in parallel; results come back in job order
    ///
    /// A failing job is reported in its result and never aborts the batch.
    pub fn process_batch(&self, jobs: &[MeshJob]) -> BatchResult {
        let start = std::time::Instant::now();
        tracing::info!(
            jobs = jobs.len(),
            threads = self.config.worker_threads,
            cache = self.cache.is_some(),
            "Starting mesh batch"
        );

        let results: Vec<JobResult> = self
            .pool
            .install(|| jobs.par_iter().map(|job| self.run_job(job)).collect());

        let mut stats = BatchStats {
            total_jobs: results.len(),
            ..BatchStats::default()
        };
        for result in &results {
            match &result.mesh {
                Some(mesh) => {
                    stats.succeeded += 1;
                    stats.total_vertices += mesh.vertex_count();
                    stats.total_triangles += mesh.triangle_count();
                }
                None => stats.failed += 1,
            }
            if result.from_cache {
                stats.cache_hits += 1;
            }
        }
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            cache_hits = stats.cache_hits,
            vertices = stats.total_vertices,
            triangles = stats.total_triangles,
            elapsed_ms = stats.elapsed_ms,
            "Mesh batch complete"
        );

        BatchResult { results, stats }
    }

    /// Parse a JSON job manifest and run it
    pub fn process_manifest(&self, json: &str) -> Result<BatchResult> {
        let jobs = crate::job::parse_manifest(json)?;
        Ok(self.process_batch(&jobs))
    }
}

impl std::fmt::Debug for MeshPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshPipeline")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Run a batch with a one-off pipeline configured from the environment
pub fn process_batch(jobs: &[MeshJob]) -> Result<BatchResult> {
    Ok(MeshPipeline::from_env()?.process_batch(jobs))
}
