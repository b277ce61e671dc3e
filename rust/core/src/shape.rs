// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape parameter record
//!
//! The declarative description of a primitive: which family it belongs to
//! and the cut/hollow/twist/taper/shear/revolution modifiers applied to it.
//! A record is immutable for the duration of a mesh generation call.

use crate::error::{Error, Result};
use std::hash::{Hash, Hasher};

/// Smallest begin/end separation kept by [`ShapeParameters::clamped`]
pub const MIN_CUT_SPAN: f64 = 0.02;

/// Largest hollow fraction kept by [`ShapeParameters::clamped`]
pub const MAX_HOLLOW: f64 = 0.99;

/// Largest revolution count kept by [`ShapeParameters::clamped`]
pub const MAX_REVOLUTIONS: f64 = 4.0;

/// Two-component parameter (X/Y pairs such as top size, shear and taper)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    fn clamp(self, min: f64, max: f64) -> Self {
        Self::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

/// Primitive shape family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeFamily {
    Box,
    Cylinder,
    Prism,
    Sphere,
    Torus,
    Tube,
    Ring,
    Sculpt,
}

/// How a family's profile is swept to build the solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathCurve {
    /// Straight sweep along Z from -0.5 to 0.5
    Linear,
    /// Revolution about the Z axis
    Circular,
}

impl ShapeFamily {
    /// All procedural families (every family except `Sculpt`)
    pub const PROCEDURAL: [ShapeFamily; 7] = [
        ShapeFamily::Box,
        ShapeFamily::Cylinder,
        ShapeFamily::Prism,
        ShapeFamily::Sphere,
        ShapeFamily::Torus,
        ShapeFamily::Tube,
        ShapeFamily::Ring,
    ];

    /// Path curve used by this family, `None` for sculpts
    #[inline]
    pub fn path_curve(self) -> Option<PathCurve> {
        match self {
            Self::Box | Self::Cylinder | Self::Prism => Some(PathCurve::Linear),
            Self::Sphere | Self::Torus | Self::Tube | Self::Ring => Some(PathCurve::Circular),
            Self::Sculpt => None,
        }
    }

    /// True for families swept by revolution
    #[inline]
    pub fn is_revolved(self) -> bool {
        self.path_curve() == Some(PathCurve::Circular)
    }

    /// Sphere family uses a half-turn profile instead of a full turn
    #[inline]
    pub fn has_half_profile(self) -> bool {
        self == Self::Sphere
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Cylinder => "cylinder",
            Self::Prism => "prism",
            Self::Sphere => "sphere",
            Self::Torus => "torus",
            Self::Tube => "tube",
            Self::Ring => "ring",
            Self::Sculpt => "sculpt",
        }
    }
}

/// Outline used for the hollow (inner) boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HoleShape {
    /// Same outline as the outer profile
    #[default]
    Same,
    Circle,
    Square,
    Triangle,
}

/// Base surface a sculpt map is wrapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SculptType {
    #[default]
    Sphere,
    Torus,
    Cylinder,
    Plane,
}

impl SculptType {
    /// Horizontal seam closes back onto column 0
    #[inline]
    pub fn wraps_columns(self) -> bool {
        !matches!(self, Self::Plane)
    }

    /// Last row closes back onto row 0
    #[inline]
    pub fn wraps_rows(self) -> bool {
        matches!(self, Self::Torus)
    }

    /// First and last rows collapse to a single pole point
    #[inline]
    pub fn pinches_poles(self) -> bool {
        matches!(self, Self::Sphere)
    }
}

/// Sculpt map reference and the flags that change how it is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SculptParameters {
    /// Asset id of the sculpt texture
    pub texture: [u8; 16],
    pub kind: SculptType,
    pub invert: bool,
    pub mirror: bool,
}

impl SculptParameters {
    pub fn new(texture: [u8; 16], kind: SculptType) -> Self {
        Self {
            texture,
            kind,
            invert: false,
            mirror: false,
        }
    }

    /// Columns are read right-to-left when exactly one of mirror/invert is set
    #[inline]
    pub fn reverses_columns(&self) -> bool {
        self.mirror ^ self.invert
    }
}

/// Parametric shape description
///
/// Field ranges follow the classic primitive editor:
///
/// - `profile_begin`/`profile_end`, `path_begin`/`path_end`: cut fractions in `[0, 1]`
/// - `hollow`: fraction of the profile removed, `[0, 1)`
/// - `twist_begin`/`twist_end`: rotation in turns at each end of the path
/// - `top_size`: on linear paths a taper amount in `[-1, 1]` (positive shrinks
///   the top, negative the bottom); on revolved paths the hole size in
///   `(0, 1]` (X scales the cross-section along the revolution axis, Y sets
///   the tube thickness)
/// - `top_shear`: offset of the far end in `[-0.5, 0.5]`
/// - `taper`: revolved-path taper of the cross-section in `[-1, 1]`
/// - `radius_offset`: revolved-path radius change over the sweep in `[-1, 1]`
/// - `skew`: revolved-path axial offset in `[-1, 1]`
/// - `revolutions`: number of turns of a revolved path, `>= 1`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeParameters {
    pub family: ShapeFamily,
    pub profile_begin: f64,
    pub profile_end: f64,
    pub hollow: f64,
    pub hollow_shape: HoleShape,
    pub path_begin: f64,
    pub path_end: f64,
    pub twist_begin: f64,
    pub twist_end: f64,
    pub top_size: Vec2,
    pub top_shear: Vec2,
    pub taper: Vec2,
    pub radius_offset: f64,
    pub skew: f64,
    pub revolutions: f64,
    pub sculpt: Option<SculptParameters>,
}

impl Default for ShapeParameters {
    fn default() -> Self {
        Self::new(ShapeFamily::Box)
    }
}

impl ShapeParameters {
    /// Create an unmodified shape of the given family
    pub fn new(family: ShapeFamily) -> Self {
        let top_size = match family {
            ShapeFamily::Torus | ShapeFamily::Tube | ShapeFamily::Ring => Vec2::new(1.0, 0.25),
            ShapeFamily::Sphere => Vec2::new(1.0, 1.0),
            _ => Vec2::zero(),
        };

        Self {
            family,
            profile_begin: 0.0,
            profile_end: 1.0,
            hollow: 0.0,
            hollow_shape: HoleShape::Same,
            path_begin: 0.0,
            path_end: 1.0,
            twist_begin: 0.0,
            twist_end: 0.0,
            top_size,
            top_shear: Vec2::zero(),
            taper: Vec2::zero(),
            radius_offset: 0.0,
            skew: 0.0,
            revolutions: 1.0,
            sculpt: None,
        }
    }

    /// Create a sculpted shape
    pub fn sculpted(sculpt: SculptParameters) -> Self {
        let mut params = Self::new(ShapeFamily::Sculpt);
        params.sculpt = Some(sculpt);
        params
    }

    pub fn with_profile_cut(mut self, begin: f64, end: f64) -> Self {
        self.profile_begin = begin;
        self.profile_end = end;
        self
    }

    pub fn with_path_cut(mut self, begin: f64, end: f64) -> Self {
        self.path_begin = begin;
        self.path_end = end;
        self
    }

    pub fn with_hollow(mut self, hollow: f64, shape: HoleShape) -> Self {
        self.hollow = hollow;
        self.hollow_shape = shape;
        self
    }

    pub fn with_twist(mut self, begin: f64, end: f64) -> Self {
        self.twist_begin = begin;
        self.twist_end = end;
        self
    }

    /// True when a hollow boundary is cut out of the profile
    #[inline]
    pub fn is_hollow(&self) -> bool {
        self.hollow > 0.0
    }

    /// True when the profile cut leaves an open arc rather than a full ring
    #[inline]
    pub fn is_profile_open(&self) -> bool {
        self.profile_begin > 0.0 || self.profile_end < 1.0
    }

    /// Twist range in turns
    #[inline]
    pub fn twist_total(&self) -> f64 {
        self.twist_end - self.twist_begin
    }

    /// Check every invariant the mesh generators rely on
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("profile_begin", self.profile_begin),
            ("profile_end", self.profile_end),
            ("hollow", self.hollow),
            ("path_begin", self.path_begin),
            ("path_end", self.path_end),
            ("twist_begin", self.twist_begin),
            ("twist_end", self.twist_end),
            ("radius_offset", self.radius_offset),
            ("skew", self.skew),
            ("revolutions", self.revolutions),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(Error::parameter(field, "must be finite"));
            }
        }
        for (field, value) in [
            ("top_size", self.top_size),
            ("top_shear", self.top_shear),
            ("taper", self.taper),
        ] {
            if !value.is_finite() {
                return Err(Error::parameter(field, "must be finite"));
            }
        }

        check_cut("profile", self.profile_begin, self.profile_end)?;
        check_cut("path", self.path_begin, self.path_end)?;

        if !(0.0..1.0).contains(&self.hollow) {
            return Err(Error::parameter(
                "hollow",
                format!("{} is outside [0, 1)", self.hollow),
            ));
        }
        if !(1.0..=MAX_REVOLUTIONS).contains(&self.revolutions) {
            return Err(Error::parameter(
                "revolutions",
                format!("{} is outside [1, {MAX_REVOLUTIONS}] turns", self.revolutions),
            ));
        }
        for (field, value) in [("twist_begin", self.twist_begin), ("twist_end", self.twist_end)] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(Error::parameter(field, format!("{value} is outside [-1, 1] turns")));
            }
        }
        if self.family == ShapeFamily::Sculpt && self.sculpt.is_none() {
            return Err(Error::parameter("sculpt", "sculpt family without a sculpt map"));
        }
        Ok(())
    }

    /// Copy with every field forced into its legal range
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();
        let sanitize = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };

        let (pb, pe) = clamp_cut(
            sanitize(self.profile_begin, 0.0),
            sanitize(self.profile_end, 1.0),
        );
        out.profile_begin = pb;
        out.profile_end = pe;

        let (pb, pe) = clamp_cut(sanitize(self.path_begin, 0.0), sanitize(self.path_end, 1.0));
        out.path_begin = pb;
        out.path_end = pe;

        out.hollow = sanitize(self.hollow, 0.0).clamp(0.0, MAX_HOLLOW);
        out.twist_begin = sanitize(self.twist_begin, 0.0).clamp(-1.0, 1.0);
        out.twist_end = sanitize(self.twist_end, 0.0).clamp(-1.0, 1.0);
        out.radius_offset = sanitize(self.radius_offset, 0.0).clamp(-1.0, 1.0);
        out.skew = sanitize(self.skew, 0.0).clamp(-1.0, 1.0);
        out.revolutions = sanitize(self.revolutions, 1.0).clamp(1.0, MAX_REVOLUTIONS);

        let finite_or = |v: Vec2, fallback: Vec2| if v.is_finite() { v } else { fallback };
        out.top_shear = finite_or(self.top_shear, Vec2::zero()).clamp(-0.5, 0.5);
        out.taper = finite_or(self.taper, Vec2::zero()).clamp(-1.0, 1.0);
        out.top_size = if self.family.is_revolved() {
            finite_or(self.top_size, Vec2::new(1.0, 0.25)).clamp(0.05, 1.0)
        } else {
            finite_or(self.top_size, Vec2::zero()).clamp(-1.0, 1.0)
        };
        out
    }
}

fn check_cut(which: &'static str, begin: f64, end: f64) -> Result<()> {
    let field = if which == "profile" { "profile_begin" } else { "path_begin" };
    if !(0.0..=1.0).contains(&begin) || !(0.0..=1.0).contains(&end) {
        return Err(Error::parameter(
            field,
            format!("{which} cut [{begin}, {end}] is outside [0, 1]"),
        ));
    }
    if begin > end {
        return Err(Error::parameter(
            field,
            format!("{which} cut begin {begin} is past end {end}"),
        ));
    }
    Ok(())
}

fn clamp_cut(begin: f64, end: f64) -> (f64, f64) {
    let mut begin = begin.clamp(0.0, 1.0 - MIN_CUT_SPAN);
    let end = end.clamp(MIN_CUT_SPAN, 1.0);
    if end - begin < MIN_CUT_SPAN {
        begin = (end - MIN_CUT_SPAN).max(0.0);
    }
    (begin, end.max(begin + MIN_CUT_SPAN))
}

// Floats hash by bit pattern so equal records always collide; callers key
// caches on the resulting hash only.
impl Hash for ShapeParameters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.hollow_shape.hash(state);
        for v in [
            self.profile_begin,
            self.profile_end,
            self.hollow,
            self.path_begin,
            self.path_end,
            self.twist_begin,
            self.twist_end,
            self.top_size.x,
            self.top_size.y,
            self.top_shear.x,
            self.top_shear.y,
            self.taper.x,
            self.taper.y,
            self.radius_offset,
            self.skew,
            self.revolutions,
        ] {
            v.to_bits().hash(state);
        }
        self.sculpt.hash(state);
    }
}
