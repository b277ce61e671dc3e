// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job and result types for serialization.

use crate::error::Result;
use prim_lite_core::{SculptParameters, ShapeParameters};
use prim_lite_geometry::Mesh;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Where a job's geometry comes from.
#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeshSource {
    /// Procedural primitive.
    Primitive { shape: ShapeParameters },
    /// Encoded sculpt texture (PNG, JPEG, TGA or BMP bytes).
    Sculpt {
        sculpt: SculptParameters,
        texture: Vec<u8>,
    },
    /// Multi-LOD mesh asset; `segment` picks a LOD, otherwise the
    /// physics or highest available segment is used.
    Asset {
        bytes: Vec<u8>,
        #[serde(default)]
        segment: Option<String>,
    },
}

impl MeshSource {
    /// Short label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshSource::Primitive { .. } => "primitive",
            MeshSource::Sculpt { .. } => "sculpt",
            MeshSource::Asset { .. } => "asset",
        }
    }

    /// Hash of the source, used to bucket cache entries.
    ///
    /// Distinct sources may share a key; the cache compares sources on
    /// lookup.
    #[inline]
    pub fn cache_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One unit of work in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshJob {
    /// Caller-chosen identifier, echoed in the result.
    pub id: u64,
    pub source: MeshSource,
}

impl MeshJob {
    pub fn primitive(id: u64, shape: ShapeParameters) -> Self {
        Self {
            id,
            source: MeshSource::Primitive { shape },
        }
    }

    pub fn sculpt(id: u64, sculpt: SculptParameters, texture: Vec<u8>) -> Self {
        Self {
            id,
            source: MeshSource::Sculpt { sculpt, texture },
        }
    }

    pub fn asset(id: u64, bytes: Vec<u8>, segment: Option<String>) -> Self {
        Self {
            id,
            source: MeshSource::Asset { bytes, segment },
        }
    }

    /// Cache key: hash of the source, independent of the job id.
    #[inline]
    pub fn cache_key(&self) -> u64 {
        self.source.cache_key()
    }
}

/// Parse a JSON array of jobs.
pub fn parse_manifest(json: &str) -> Result<Vec<MeshJob>> {
    Ok(serde_json::from_str(json)?)
}

/// Flattened mesh ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions (x, y, z triplets).
    pub positions: Vec<f32>,
    /// Vertex normals (x, y, z triplets), empty when not computed.
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v pairs), empty when absent.
    pub uvs: Vec<f32>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

impl From<&Mesh> for MeshData {
    fn from(mesh: &Mesh) -> Self {
        Self {
            positions: mesh.positions.clone(),
            normals: mesh.normals.clone(),
            uvs: mesh.uvs.clone(),
            indices: mesh.indices(),
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: u64,
    pub kind: String,
    /// Present when the job succeeded.
    pub mesh: Option<MeshData>,
    /// Present when the job failed.
    pub error: Option<String>,
    /// Whether the mesh was served from the cache.
    pub from_cache: bool,
}

impl JobResult {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.mesh.is_some()
    }
}

/// Batch statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
    /// Wall-clock time for the whole batch (ms).
    pub elapsed_ms: u64,
}

/// Results of a batch, in job order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<JobResult>,
    pub stats: BatchStats,
}

impl BatchResult {
    /// Serialize the statistics only.
    pub fn summary_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.stats)?)
    }

    /// Serialize the whole batch.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prim_lite_core::{HoleShape, SculptType, ShapeFamily};

    #[test]
    fn test_cache_key_ignores_id() {
        let shape = ShapeParameters::new(ShapeFamily::Torus).with_hollow(0.2, HoleShape::Square);
        let a = MeshJob::primitive(1, shape.clone());
        let b = MeshJob::primitive(2, shape);
        assert_eq!(a.cache_key(), b.cache_key());

        let c = MeshJob::primitive(1, ShapeParameters::new(ShapeFamily::Tube));
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_manifest_round_trip() {
        let jobs = vec![
            MeshJob::primitive(7, ShapeParameters::new(ShapeFamily::Prism).with_twist(0.0, 0.5)),
            MeshJob::sculpt(8, SculptParameters::new([3; 16], SculptType::Plane), vec![1, 2, 3]),
            MeshJob::asset(9, vec![0xff], Some("high_lod".to_string())),
        ];
        let json = serde_json::to_string(&jobs).unwrap();
        assert!(json.contains("\"kind\":\"primitive\""));
        assert_eq!(parse_manifest(&json).unwrap(), jobs);
    }

    #[test]
    fn test_asset_segment_defaults_to_none() {
        let json = r#"[{"id": 1, "source": {"kind": "asset", "bytes": [1, 2]}}]"#;
        let jobs = parse_manifest(json).unwrap();
        assert_eq!(jobs[0].source, MeshSource::Asset { bytes: vec![1, 2], segment: None });
    }

    #[test]
    fn test_bad_manifest() {
        assert!(parse_manifest("{\"id\": 1}").is_err());
    }
}
