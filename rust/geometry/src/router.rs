// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesher - dispatch from a shape description to the right generator
//!
//! Procedural families run profile, sweep, triangulation and welding in
//! sequence. Sculpt maps and mesh assets go through their decoders and the
//! same welding pass.

use crate::config::MesherConfig;
use crate::error::{Error, Result};
use crate::extrusion::sweep;
use crate::mesh::Mesh;
use crate::mesh_asset::{decode_mesh_asset, decode_mesh_asset_segment};
use crate::optimize::optimize_in_place;
use crate::profile::{generate_profile, Profile, ProfileParams};
use crate::sculpt::{decode_sculpt, decode_sculpt_bytes, SculptImage};
use crate::triangulation::build_triangles;
use prim_lite_core::{SculptParameters, ShapeFamily, ShapeParameters};
use tracing::trace;

/// Mesh generator holding one tessellation configuration
///
/// Stateless between calls, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct PrimMesher {
    config: MesherConfig,
}

impl PrimMesher {
    /// Create a mesher; out-of-range settings are clamped
    pub fn new(config: MesherConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    #[inline]
    pub fn config(&self) -> &MesherConfig {
        &self.config
    }

    /// Cross-section of a procedural shape, before sweeping
    pub fn profile(&self, shape: &ShapeParameters) -> Result<Profile> {
        shape.validate()?;
        if shape.family == ShapeFamily::Sculpt {
            return Err(Error::UnsupportedShape(
                "sculpted shapes have no profile".to_string(),
            ));
        }
        generate_profile(&ProfileParams::from_shape(shape, self.config.profile_steps))
    }

    /// Generate the mesh of a procedural shape
    ///
    /// Sculpted shapes are rejected: their geometry lives in a texture, see
    /// [`PrimMesher::sculpt`].
    pub fn generate(&self, shape: &ShapeParameters) -> Result<Mesh> {
        let profile = self.profile(shape)?;

        let mut mesh = Mesh::new();
        let swept = sweep(&profile, shape, &self.config, &mut mesh)?;
        build_triangles(&mut mesh, &profile, &swept);

        trace!(
            family = shape.family.name(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "generated primitive"
        );

        Ok(self.finish(mesh))
    }

    /// Mesh a decoded sculpt map
    pub fn sculpt<I: SculptImage + ?Sized>(
        &self,
        image: &I,
        sculpt: &SculptParameters,
    ) -> Result<Mesh> {
        decode_sculpt(image, sculpt, &self.config).map(|mesh| self.finish(mesh))
    }

    /// Mesh an encoded sculpt texture (PNG, JPEG, TGA or BMP)
    pub fn sculpt_bytes(&self, bytes: &[u8], sculpt: &SculptParameters) -> Result<Mesh> {
        decode_sculpt_bytes(bytes, sculpt, &self.config).map(|mesh| self.finish(mesh))
    }

    /// Mesh the preferred segment of a mesh asset
    pub fn mesh_asset(&self, bytes: &[u8]) -> Result<Mesh> {
        decode_mesh_asset(bytes).map(|mesh| self.finish(mesh))
    }

    /// Mesh one named segment of a mesh asset
    pub fn mesh_asset_segment(&self, bytes: &[u8], segment: &str) -> Result<Mesh> {
        decode_mesh_asset_segment(bytes, segment).map(|mesh| self.finish(mesh))
    }

    fn finish(&self, mut mesh: Mesh) -> Mesh {
        if self.config.optimize {
            optimize_in_place(&mut mesh);
        }
        mesh
    }
}

/// Generate a procedural shape with the default configuration
pub fn generate_mesh(shape: &ShapeParameters) -> Result<Mesh> {
    PrimMesher::default().generate(shape)
}
