// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Prim-Lite Core
//!
//! Shape records and structured-data decoding for procedural primitive
//! meshing.
//!
//! ## Overview
//!
//! - **Shape parameters**: the declarative [`ShapeParameters`] record
//!   (family, cuts, hollow, twist, taper, shear, revolutions) with
//!   validation and clamping
//! - **Packed records**: [`PackedShape`] converts the quantized integer
//!   form used by persisted objects into parameters and back
//! - **LLSD**: a [nom](https://docs.rs/nom) based binary LLSD parser and
//!   encoder, used to read mesh asset headers
//!
//! ## Quick Start
//!
//! ```rust
//! use prim_lite_core::{HoleShape, ShapeFamily, ShapeParameters};
//!
//! let params = ShapeParameters::new(ShapeFamily::Cylinder)
//!     .with_hollow(0.5, HoleShape::Square)
//!     .with_path_cut(0.0, 0.75);
//! assert!(params.validate().is_ok());
//!
//! let packed = params.to_packed();
//! let back = ShapeParameters::from_packed(&packed).unwrap();
//! assert_eq!(back.family, ShapeFamily::Cylinder);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for shape records

pub mod error;
pub mod llsd;
pub mod packed;
pub mod shape;

pub use error::{Error, Result};
pub use llsd::{parse_binary, parse_binary_prefix, LlsdValue};
pub use packed::PackedShape;
pub use shape::{
    HoleShape, PathCurve, SculptParameters, SculptType, ShapeFamily, ShapeParameters, Vec2,
};
