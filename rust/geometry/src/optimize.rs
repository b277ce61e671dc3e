// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exact-duplicate vertex welding

use crate::mesh::{Mesh, Triangle};
use rustc_hash::FxHashMap;
use tracing::debug;

/// What a welding pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Vertices merged into an earlier bit-identical vertex
    pub welded_vertices: usize,
    /// Triangles dropped because two corners became the same vertex
    pub degenerate_triangles: usize,
    /// Vertices no surviving triangle referenced
    pub unreferenced_vertices: usize,
    /// Triangles dropped because a corner pointed past the vertex list
    pub invalid_triangles: usize,
}

impl OptimizeStats {
    #[inline]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

// -0.0 and +0.0 weld together; everything else compares by bit pattern.
#[inline]
fn position_key(p: &[f32]) -> [u32; 3] {
    [
        (p[0] + 0.0).to_bits(),
        (p[1] + 0.0).to_bits(),
        (p[2] + 0.0).to_bits(),
    ]
}

/// Weld bit-identical vertices, drop degenerate triangles and unused vertices
///
/// The first occurrence of a position keeps its normal and UV. Vertex order
/// is otherwise preserved, so running the pass twice changes nothing.
pub fn optimize(mesh: &Mesh) -> Mesh {
    optimize_with_stats(mesh).0
}

/// [`optimize`], replacing the mesh in place
pub fn optimize_in_place(mesh: &mut Mesh) -> OptimizeStats {
    let (optimized, stats) = optimize_with_stats(mesh);
    *mesh = optimized;
    stats
}

/// [`optimize`], also reporting what was removed
pub fn optimize_with_stats(mesh: &Mesh) -> (Mesh, OptimizeStats) {
    let vertex_count = mesh.vertex_count();
    let mut stats = OptimizeStats::default();

    // Pass 1: map every vertex to the first vertex sharing its position
    let mut first_seen: FxHashMap<[u32; 3], u32> = FxHashMap::default();
    first_seen.reserve(vertex_count);
    let mut canonical = Vec::with_capacity(vertex_count);
    for (i, p) in mesh.positions.chunks_exact(3).enumerate() {
        let index = *first_seen.entry(position_key(p)).or_insert(i as u32);
        if index != i as u32 {
            stats.welded_vertices += 1;
        }
        canonical.push(index);
    }

    // Pass 2: remap triangles, dropping collapsed ones
    let mut triangles = Vec::with_capacity(mesh.triangles.len());
    let mut referenced = vec![false; vertex_count];
    for t in &mesh.triangles {
        if t.indices().iter().any(|&v| v as usize >= vertex_count) {
            stats.invalid_triangles += 1;
            continue;
        }
        let remapped = Triangle::new(
            canonical[t.v0 as usize],
            canonical[t.v1 as usize],
            canonical[t.v2 as usize],
        );
        if remapped.is_degenerate() {
            stats.degenerate_triangles += 1;
            continue;
        }
        for v in remapped.indices() {
            referenced[v as usize] = true;
        }
        triangles.push(remapped);
    }

    // Pass 3: compact the surviving canonical vertices, keeping their order
    let mut new_index = vec![u32::MAX; vertex_count];
    let mut out = Mesh::with_capacity(first_seen.len(), triangles.len());
    // Attributes that are not one-per-vertex are dropped rather than misaligned
    let keep_normals = mesh.normals.len() == vertex_count * 3;
    let keep_uvs = mesh.uvs.len() == vertex_count * 2;
    for i in 0..vertex_count {
        if canonical[i] != i as u32 {
            continue;
        }
        if !referenced[i] {
            stats.unreferenced_vertices += 1;
            continue;
        }
        new_index[i] = out.vertex_count() as u32;
        out.positions.extend_from_slice(&mesh.positions[i * 3..i * 3 + 3]);
        if keep_normals {
            out.normals.extend_from_slice(&mesh.normals[i * 3..i * 3 + 3]);
        }
        if keep_uvs {
            out.uvs.extend_from_slice(&mesh.uvs[i * 2..i * 2 + 2]);
        }
    }

    out.triangles = triangles
        .into_iter()
        .map(|t| {
            Triangle::new(
                new_index[t.v0 as usize],
                new_index[t.v1 as usize],
                new_index[t.v2 as usize],
            )
        })
        .collect();

    if !stats.is_noop() {
        debug!(
            vertices_in = vertex_count,
            vertices_out = out.vertex_count(),
            welded = stats.welded_vertices,
            degenerate = stats.degenerate_triangles,
            unreferenced = stats.unreferenced_vertices,
            invalid = stats.invalid_triangles,
            "optimized mesh"
        );
    }

    (out, stats)
}
