// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packed (quantized) shape record
//!
//! Persisted and on-the-wire shape records store every modifier as a small
//! integer. This module converts between that representation and
//! [`ShapeParameters`].

use crate::error::{Error, Result};
use crate::shape::{
    HoleShape, SculptParameters, SculptType, ShapeFamily, ShapeParameters, Vec2, MAX_REVOLUTIONS,
};

/// Quantum for begin/end cuts and hollow
pub const CUT_QUANTUM: f64 = 0.00002;
/// Quantum for scale, shear, twist, taper, radius offset and skew
pub const SCALE_QUANTUM: f64 = 0.01;
/// Quantum for revolutions above one
pub const REVOLUTION_QUANTUM: f64 = 0.015;

/// Profile curve byte, low nibble
pub mod profile_curve {
    pub const CIRCLE: u8 = 0x00;
    pub const SQUARE: u8 = 0x01;
    pub const ISO_TRIANGLE: u8 = 0x02;
    pub const EQUAL_TRIANGLE: u8 = 0x03;
    pub const RIGHT_TRIANGLE: u8 = 0x04;
    pub const HALF_CIRCLE: u8 = 0x05;
}

/// Profile curve byte, high nibble
pub mod hole_curve {
    pub const SAME: u8 = 0x00;
    pub const CIRCLE: u8 = 0x10;
    pub const SQUARE: u8 = 0x20;
    pub const TRIANGLE: u8 = 0x30;
}

/// Path curve byte
pub mod path_curve {
    pub const LINE: u8 = 0x10;
    pub const CIRCLE: u8 = 0x20;
    pub const CIRCLE_2: u8 = 0x30;
}

/// Sculpt type byte, low three bits
pub mod sculpt_kind {
    pub const SPHERE: u8 = 1;
    pub const TORUS: u8 = 2;
    pub const PLANE: u8 = 3;
    pub const CYLINDER: u8 = 4;
    pub const MESH: u8 = 5;
    pub const INVERT: u8 = 0x40;
    pub const MIRROR: u8 = 0x80;
}

/// Quantized shape record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedShape {
    pub profile_curve: u8,
    pub profile_begin: u16,
    pub profile_end: u16,
    pub profile_hollow: u16,
    pub path_curve: u8,
    pub path_begin: u16,
    pub path_end: u16,
    pub path_scale_x: u8,
    pub path_scale_y: u8,
    pub path_shear_x: i8,
    pub path_shear_y: i8,
    pub path_twist_begin: i8,
    pub path_twist: i8,
    pub path_taper_x: i8,
    pub path_taper_y: i8,
    pub path_radius_offset: i8,
    pub path_revolutions: u8,
    pub path_skew: i8,
    pub sculpt_type: u8,
    pub sculpt_texture: [u8; 16],
}

#[inline]
fn unpack_begin(v: u16) -> f64 {
    v as f64 * CUT_QUANTUM
}

#[inline]
fn unpack_end(v: u16) -> f64 {
    1.0 - v as f64 * CUT_QUANTUM
}

#[inline]
fn unpack_scale(v: u8) -> f64 {
    (200.0 - v as f64) * SCALE_QUANTUM
}

#[inline]
fn unpack_signed(v: i8) -> f64 {
    v as f64 * SCALE_QUANTUM
}

// Packed twist counts half-turns; the record stores turns.
#[inline]
fn unpack_twist(v: i8) -> f64 {
    v as f64 * SCALE_QUANTUM * 0.5
}

#[inline]
fn pack_begin(v: f64) -> u16 {
    (v / CUT_QUANTUM).round().clamp(0.0, u16::MAX as f64) as u16
}

#[inline]
fn pack_end(v: f64) -> u16 {
    ((1.0 - v) / CUT_QUANTUM).round().clamp(0.0, u16::MAX as f64) as u16
}

#[inline]
fn pack_scale(v: f64) -> u8 {
    (200.0 - v / SCALE_QUANTUM).round().clamp(0.0, 200.0) as u8
}

#[inline]
fn pack_signed(v: f64) -> i8 {
    (v / SCALE_QUANTUM).round().clamp(i8::MIN as f64, i8::MAX as f64) as i8
}

#[inline]
fn pack_twist(v: f64) -> i8 {
    pack_signed(v * 2.0)
}

impl PackedShape {
    /// Derive the shape family from the profile/path curve pair
    pub fn family(&self) -> Result<ShapeFamily> {
        let sculpt = self.sculpt_type & 0x07;
        if sculpt != 0 {
            return match sculpt {
                sculpt_kind::SPHERE
                | sculpt_kind::TORUS
                | sculpt_kind::PLANE
                | sculpt_kind::CYLINDER => Ok(ShapeFamily::Sculpt),
                sculpt_kind::MESH => Err(Error::parameter(
                    "sculpt_type",
                    "mesh assets are decoded from their own container",
                )),
                other => Err(Error::parameter(
                    "sculpt_type",
                    format!("unknown sculpt type {other}"),
                )),
            };
        }

        let profile = self.profile_curve & 0x0f;
        let circular = match self.path_curve {
            path_curve::LINE => false,
            path_curve::CIRCLE | path_curve::CIRCLE_2 => true,
            other => {
                return Err(Error::parameter(
                    "path_curve",
                    format!("unsupported path curve {other:#04x}"),
                ))
            }
        };

        let family = match (profile, circular) {
            (profile_curve::SQUARE, false) => ShapeFamily::Box,
            (profile_curve::CIRCLE, false) => ShapeFamily::Cylinder,
            (
                profile_curve::EQUAL_TRIANGLE
                | profile_curve::ISO_TRIANGLE
                | profile_curve::RIGHT_TRIANGLE,
                false,
            ) => ShapeFamily::Prism,
            (profile_curve::HALF_CIRCLE, true) => ShapeFamily::Sphere,
            (profile_curve::CIRCLE, true) => ShapeFamily::Torus,
            (profile_curve::SQUARE, true) => ShapeFamily::Tube,
            (
                profile_curve::EQUAL_TRIANGLE
                | profile_curve::ISO_TRIANGLE
                | profile_curve::RIGHT_TRIANGLE,
                true,
            ) => ShapeFamily::Ring,
            (profile_curve::HALF_CIRCLE, false) => ShapeFamily::Cylinder,
            (other, _) => {
                return Err(Error::parameter(
                    "profile_curve",
                    format!("unsupported profile curve {other:#04x}"),
                ))
            }
        };
        Ok(family)
    }

    /// Unpack into a shape parameter record
    pub fn to_parameters(&self) -> Result<ShapeParameters> {
        let family = self.family()?;
        let mut params = ShapeParameters::new(family);

        params.profile_begin = unpack_begin(self.profile_begin);
        params.profile_end = unpack_end(self.profile_end);
        params.hollow = unpack_begin(self.profile_hollow);
        params.hollow_shape = match self.profile_curve & 0xf0 {
            hole_curve::CIRCLE => HoleShape::Circle,
            hole_curve::SQUARE => HoleShape::Square,
            hole_curve::TRIANGLE => HoleShape::Triangle,
            _ => HoleShape::Same,
        };

        params.path_begin = unpack_begin(self.path_begin);
        params.path_end = unpack_end(self.path_end);
        params.twist_begin = unpack_twist(self.path_twist_begin);
        params.twist_end = unpack_twist(self.path_twist);

        let scale = Vec2::new(unpack_scale(self.path_scale_x), unpack_scale(self.path_scale_y));
        params.top_size = if family.is_revolved() {
            scale
        } else {
            Vec2::new(1.0 - scale.x, 1.0 - scale.y)
        };
        params.top_shear = Vec2::new(
            unpack_signed(self.path_shear_x),
            unpack_signed(self.path_shear_y),
        );
        params.taper = Vec2::new(
            unpack_signed(self.path_taper_x),
            unpack_signed(self.path_taper_y),
        );
        params.radius_offset = unpack_signed(self.path_radius_offset);
        params.skew = unpack_signed(self.path_skew);
        // The byte reaches 4.825 turns; anything past the supported range is clamped
        params.revolutions =
            (1.0 + self.path_revolutions as f64 * REVOLUTION_QUANTUM).min(MAX_REVOLUTIONS);

        if family == ShapeFamily::Sculpt {
            let kind = match self.sculpt_type & 0x07 {
                sculpt_kind::TORUS => SculptType::Torus,
                sculpt_kind::PLANE => SculptType::Plane,
                sculpt_kind::CYLINDER => SculptType::Cylinder,
                _ => SculptType::Sphere,
            };
            params.sculpt = Some(SculptParameters {
                texture: self.sculpt_texture,
                kind,
                invert: self.sculpt_type & sculpt_kind::INVERT != 0,
                mirror: self.sculpt_type & sculpt_kind::MIRROR != 0,
            });
        }

        Ok(params)
    }

    /// Quantize a shape parameter record
    pub fn from_parameters(params: &ShapeParameters) -> Self {
        let (profile, path) = match params.family {
            ShapeFamily::Box => (profile_curve::SQUARE, path_curve::LINE),
            ShapeFamily::Cylinder | ShapeFamily::Sculpt => {
                (profile_curve::CIRCLE, path_curve::LINE)
            }
            ShapeFamily::Prism => (profile_curve::EQUAL_TRIANGLE, path_curve::LINE),
            ShapeFamily::Sphere => (profile_curve::HALF_CIRCLE, path_curve::CIRCLE),
            ShapeFamily::Torus => (profile_curve::CIRCLE, path_curve::CIRCLE),
            ShapeFamily::Tube => (profile_curve::SQUARE, path_curve::CIRCLE),
            ShapeFamily::Ring => (profile_curve::EQUAL_TRIANGLE, path_curve::CIRCLE),
        };
        let hole = match params.hollow_shape {
            HoleShape::Same => hole_curve::SAME,
            HoleShape::Circle => hole_curve::CIRCLE,
            HoleShape::Square => hole_curve::SQUARE,
            HoleShape::Triangle => hole_curve::TRIANGLE,
        };

        let scale = if params.family.is_revolved() {
            params.top_size
        } else {
            Vec2::new(1.0 - params.top_size.x, 1.0 - params.top_size.y)
        };

        let (sculpt_type, sculpt_texture) = match (params.family, params.sculpt) {
            (ShapeFamily::Sculpt, Some(sculpt)) => {
                let mut byte = match sculpt.kind {
                    SculptType::Sphere => sculpt_kind::SPHERE,
                    SculptType::Torus => sculpt_kind::TORUS,
                    SculptType::Plane => sculpt_kind::PLANE,
                    SculptType::Cylinder => sculpt_kind::CYLINDER,
                };
                if sculpt.invert {
                    byte |= sculpt_kind::INVERT;
                }
                if sculpt.mirror {
                    byte |= sculpt_kind::MIRROR;
                }
                (byte, sculpt.texture)
            }
            _ => (0, [0; 16]),
        };

        Self {
            profile_curve: profile | hole,
            profile_begin: pack_begin(params.profile_begin),
            profile_end: pack_end(params.profile_end),
            profile_hollow: pack_begin(params.hollow),
            path_curve: path,
            path_begin: pack_begin(params.path_begin),
            path_end: pack_end(params.path_end),
            path_scale_x: pack_scale(scale.x),
            path_scale_y: pack_scale(scale.y),
            path_shear_x: pack_signed(params.top_shear.x),
            path_shear_y: pack_signed(params.top_shear.y),
            path_twist_begin: pack_twist(params.twist_begin),
            path_twist: pack_twist(params.twist_end),
            path_taper_x: pack_signed(params.taper.x),
            path_taper_y: pack_signed(params.taper.y),
            path_radius_offset: pack_signed(params.radius_offset),
            path_revolutions: ((params.revolutions - 1.0) / REVOLUTION_QUANTUM)
                .round()
                .clamp(0.0, u8::MAX as f64) as u8,
            path_skew: pack_signed(params.skew),
            sculpt_type,
            sculpt_texture,
        }
    }
}

impl ShapeParameters {
    /// Unpack a quantized record
    pub fn from_packed(packed: &PackedShape) -> Result<Self> {
        packed.to_parameters()
    }

    /// Quantize into a packed record
    pub fn to_packed(&self) -> PackedShape {
        PackedShape::from_parameters(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn plain_box() -> PackedShape {
        PackedShape {
            profile_curve: profile_curve::SQUARE,
            path_curve: path_curve::LINE,
            path_scale_x: 100,
            path_scale_y: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_box_unpacks_to_defaults() {
        let params = plain_box().to_parameters().unwrap();
        assert_eq!(params, ShapeParameters::new(ShapeFamily::Box));
    }

    #[test]
    fn test_family_from_curve_pairs() {
        let family = |profile, path| {
            PackedShape {
                profile_curve: profile,
                path_curve: path,
                ..Default::default()
            }
            .family()
            .unwrap()
        };
        assert_eq!(family(profile_curve::CIRCLE, path_curve::LINE), ShapeFamily::Cylinder);
        assert_eq!(family(profile_curve::EQUAL_TRIANGLE, path_curve::LINE), ShapeFamily::Prism);
        assert_eq!(family(profile_curve::HALF_CIRCLE, path_curve::CIRCLE), ShapeFamily::Sphere);
        assert_eq!(family(profile_curve::CIRCLE, path_curve::CIRCLE), ShapeFamily::Torus);
        assert_eq!(family(profile_curve::SQUARE, path_curve::CIRCLE_2), ShapeFamily::Tube);
        assert_eq!(
            family(profile_curve::EQUAL_TRIANGLE | hole_curve::SQUARE, path_curve::CIRCLE),
            ShapeFamily::Ring
        );
    }

    #[test]
    fn test_unknown_curves_are_rejected() {
        let bad_path = PackedShape {
            path_curve: 0x80,
            ..Default::default()
        };
        assert!(bad_path.family().is_err());

        let mesh = PackedShape {
            sculpt_type: sculpt_kind::MESH,
            ..Default::default()
        };
        assert!(mesh.family().is_err());
    }

    #[test]
    fn test_quantized_fields() {
        let packed = PackedShape {
            profile_curve: profile_curve::CIRCLE | hole_curve::SQUARE,
            profile_begin: 12500,
            profile_end: 12500,
            profile_hollow: 25000,
            path_curve: path_curve::CIRCLE,
            path_scale_x: 100,
            path_scale_y: 175,
            path_twist: 100,
            path_revolutions: 66,
            path_skew: -20,
            ..Default::default()
        };
        let params = packed.to_parameters().unwrap();
        assert_eq!(params.family, ShapeFamily::Torus);
        assert_eq!(params.hollow_shape, HoleShape::Square);
        assert_abs_diff_eq!(params.profile_begin, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(params.profile_end, 0.75, epsilon = 1e-9);
        assert_abs_diff_eq!(params.hollow, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(params.top_size.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(params.top_size.y, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(params.twist_end, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(params.revolutions, 1.99, epsilon = 1e-9);
        assert_abs_diff_eq!(params.skew, -0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_revolution_byte_stays_in_range() {
        let packed = PackedShape {
            profile_curve: profile_curve::CIRCLE,
            path_curve: path_curve::CIRCLE,
            path_scale_y: 175,
            path_revolutions: u8::MAX,
            ..Default::default()
        };
        let params = packed.to_parameters().unwrap();
        assert_eq!(params.revolutions, MAX_REVOLUTIONS);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_pack_unpack_is_stable() {
        let mut params = ShapeParameters::new(ShapeFamily::Prism)
            .with_profile_cut(0.1, 0.8)
            .with_path_cut(0.2, 0.9)
            .with_hollow(0.35, HoleShape::Triangle)
            .with_twist(-0.25, 0.5);
        params.top_size = Vec2::new(0.3, -0.4);
        params.top_shear = Vec2::new(0.1, -0.2);

        let packed = params.to_packed();
        let back = ShapeParameters::from_packed(&packed).unwrap();
        assert_eq!(back.to_packed(), packed);
        assert_abs_diff_eq!(back.profile_begin, 0.1, epsilon = CUT_QUANTUM);
        assert_abs_diff_eq!(back.top_size.y, -0.4, epsilon = SCALE_QUANTUM);
        assert_abs_diff_eq!(back.twist_begin, -0.25, epsilon = SCALE_QUANTUM);
    }

    #[test]
    fn test_sculpt_flags() {
        let packed = PackedShape {
            sculpt_type: sculpt_kind::CYLINDER | sculpt_kind::MIRROR,
            sculpt_texture: [9; 16],
            ..Default::default()
        };
        let params = packed.to_parameters().unwrap();
        assert_eq!(params.family, ShapeFamily::Sculpt);
        let sculpt = params.sculpt.unwrap();
        assert_eq!(sculpt.kind, SculptType::Cylinder);
        assert!(sculpt.mirror);
        assert!(!sculpt.invert);
        assert_eq!(params.to_packed().sculpt_type, packed.sculpt_type);
    }
}
