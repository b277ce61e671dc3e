// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use nalgebra::{Point2, Point3, Vector3};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Three vertex indices, counter-clockwise when seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
}

impl Triangle {
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self { v0, v1, v2 }
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Two or more corners share a vertex
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.v0 == self.v1 || self.v1 == self.v2 || self.v0 == self.v2
    }
}

/// Triangle mesh
///
/// Attribute arrays are flat and parallel to `positions`. `normals` and
/// `uvs` are either empty or hold one entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v)
    pub uvs: Vec<f32>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::new(),
            uvs: Vec::new(),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);
        index
    }

    /// Add a vertex with a texture coordinate
    #[inline]
    pub fn add_vertex_with_uv(&mut self, position: Point3<f64>, uv: Point2<f64>) -> u32 {
        let index = self.add_vertex(position);
        self.uvs.push(uv.x as f32);
        self.uvs.push(uv.y as f32);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, v0: u32, v1: u32, v2: u32) {
        self.triangles.push(Triangle::new(v0, v1, v2));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    #[inline]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    #[inline]
    pub fn position(&self, index: usize) -> Point3<f32> {
        let p = &self.positions[index * 3..index * 3 + 3];
        Point3::new(p[0], p[1], p[2])
    }

    /// Flattened index buffer (i0, i1, i2 per triangle)
    pub fn indices(&self) -> Vec<u32> {
        self.triangles.iter().flat_map(Triangle::indices).collect()
    }

    /// Merge another mesh into this one
    ///
    /// An attribute present on only one side is zero-filled on the other so
    /// the arrays stay parallel.
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }

        let vertex_offset = self.vertex_count() as u32;
        let own = self.vertex_count();
        let incoming = other.vertex_count();

        merge_attribute(&mut self.normals, &other.normals, own, incoming, 3);
        merge_attribute(&mut self.uvs, &other.uvs, own, incoming, 2);
        self.positions.extend_from_slice(&other.positions);

        self.triangles.reserve(other.triangles.len());
        self.triangles.extend(other.triangles.iter().map(|t| {
            Triangle::new(t.v0 + vertex_offset, t.v1 + vertex_offset, t.v2 + vertex_offset)
        }));
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            min.x = min.x.min(chunk[0]);
            min.y = min.y.min(chunk[1]);
            min.z = min.z.min(chunk[2]);
            max.x = max.x.max(chunk[0]);
            max.y = max.y.max(chunk[1]);
            max.z = max.z.max(chunk[2]);
        });

        (min, max)
    }

    /// Check that every triangle index addresses an existing vertex
    pub fn validate_indices(&self) -> Result<()> {
        let vertex_count = self.vertex_count();
        for (triangle, t) in self.triangles.iter().enumerate() {
            for index in t.indices() {
                if index as usize >= vertex_count {
                    return Err(Error::IndexOutOfRange {
                        triangle,
                        index,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    fn corner(&self, index: u32) -> Vector3<f64> {
        let p = self.position(index as usize);
        Vector3::new(p.x as f64, p.y as f64, p.z as f64)
    }

    /// Signed enclosed volume
    ///
    /// Positive when triangles wind counter-clockwise seen from outside.
    /// Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let a = self.corner(t.v0);
                let b = self.corner(t.v1);
                let c = self.corner(t.v2);
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Recompute smooth vertex normals from triangle winding
    ///
    /// Face normals are accumulated unnormalized, so larger faces weigh more.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.vertex_count();
        if vertex_count == 0 {
            return;
        }

        let mut normals = vec![Vector3::<f64>::zeros(); vertex_count];
        for t in &self.triangles {
            let v0 = self.corner(t.v0);
            let v1 = self.corner(t.v1);
            let v2 = self.corner(t.v2);
            let normal = (v1 - v0).cross(&(v2 - v0));

            normals[t.v0 as usize] += normal;
            normals[t.v1 as usize] += normal;
            normals[t.v2 as usize] += normal;
        }

        self.normals.clear();
        self.normals.reserve(vertex_count * 3);
        for normal in normals {
            let n = normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
            self.normals.push(n.x as f32);
            self.normals.push(n.y as f32);
            self.normals.push(n.z as f32);
        }
    }

    /// Content hash over positions and triangles
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();

        self.positions.len().hash(&mut hasher);
        self.triangles.len().hash(&mut hasher);
        for pos in &self.positions {
            pos.to_bits().hash(&mut hasher);
        }
        self.triangles.hash(&mut hasher);

        hasher.finish()
    }

    /// Clear the mesh
    #[inline]
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.triangles.clear();
    }
}

fn merge_attribute(
    own: &mut Vec<f32>,
    other: &[f32],
    own_count: usize,
    other_count: usize,
    width: usize,
) {
    match (own.is_empty(), other.is_empty()) {
        (true, true) => {}
        (false, false) => own.extend_from_slice(other),
        (false, true) => own.resize(own.len() + other_count * width, 0.0),
        (true, false) => {
            own.resize(own_count * width, 0.0);
            own.extend_from_slice(other);
        }
    }
}
