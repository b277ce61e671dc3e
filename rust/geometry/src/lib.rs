// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prim-Lite Geometry
//!
//! Turns parametric primitive descriptions into triangle meshes, and
//! decodes the two externally authored formats (sculpt maps and multi-LOD
//! mesh assets) into the same mesh type.
//!
//! ```rust
//! use prim_lite_geometry::{generate_mesh, HoleShape, ShapeFamily, ShapeParameters};
//!
//! let tube = ShapeParameters::new(ShapeFamily::Cylinder).with_hollow(0.5, HoleShape::Same);
//! let mesh = generate_mesh(&tube).unwrap();
//! assert!(mesh.validate_indices().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod mesh_asset;
pub mod optimize;
pub mod profile;
pub mod router;
pub mod sculpt;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

pub use config::MesherConfig;
pub use error::{Error, Result};
pub use extrusion::{extrude_advanced, extrude_basic, extrude_sphere, sweep, PathPlan, Sweep};
pub use mesh::{Mesh, Triangle};
pub use mesh_asset::{
    decode_mesh_asset, decode_mesh_asset_segment, list_segments, MeshAssetHeader, SegmentRange,
};
pub use optimize::{optimize, optimize_in_place, optimize_with_stats, OptimizeStats};
pub use profile::{generate_profile, Outline, Profile, ProfileParams};
pub use router::{generate_mesh, PrimMesher};
pub use sculpt::{decode_sculpt, decode_sculpt_bytes, sculpt_resolution, RgbBitmap, SculptImage};
pub use triangulation::build_triangles;

pub use prim_lite_core::{
    HoleShape, PackedShape, SculptParameters, SculptType, ShapeFamily, ShapeParameters,
};
