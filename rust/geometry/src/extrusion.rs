// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path sweeping - turning a profile into a stack of 3D rings
//!
//! Linear families (box, cylinder, prism) sweep along Z from -0.5 to 0.5.
//! Revolved families (torus, tube, ring) map the profile onto the XZ plane
//! and spin it about Z; the sphere does the same with a zero base radius.

use crate::config::MesherConfig;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::profile::{turn_cos_sin, Profile};
use nalgebra::{Point2, Point3};
use prim_lite_core::{PathCurve, ShapeFamily, ShapeParameters};
use tracing::debug;

/// Path stations (absolute path fractions) at which rings are emitted
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlan {
    pub stations: Vec<f64>,
    /// The last ring coincides with the first one
    pub closed: bool,
}

impl PathPlan {
    #[inline]
    pub fn ring_count(&self) -> usize {
        self.stations.len()
    }
}

/// Result of sweeping one profile into a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    /// Index of the first vertex of the first ring
    pub first_vertex: u32,
    pub rings: usize,
    /// Vertices per ring
    pub stride: usize,
    pub closed: bool,
}

impl Sweep {
    #[inline]
    pub fn ring_start(&self, ring: usize) -> u32 {
        self.first_vertex + (ring * self.stride) as u32
    }
}

/// Scale factor for a top-size or taper amount at path fraction `c`
///
/// Positive amounts shrink toward the far end, negative ones toward the
/// near end.
#[inline]
pub fn taper_scale(amount: f64, c: f64) -> f64 {
    if amount >= 0.0 {
        1.0 - amount * c
    } else {
        1.0 + amount * (1.0 - c)
    }
}

fn is_whole(v: f64) -> bool {
    v.fract() == 0.0
}

/// Upper bound on path steps for a single sweep
pub const MAX_PATH_STEPS: usize = 10_000;

/// Number of path steps for a shape
///
/// Fails with [`Error::InvalidExtrusion`] when twist or revolutions would
/// need more than [`MAX_PATH_STEPS`] rings.
pub fn path_steps(shape: &ShapeParameters, config: &MesherConfig) -> Result<usize> {
    let span = shape.path_end - shape.path_begin;
    let twist_degrees = shape.twist_total().abs() * span * 360.0;
    let twist_steps = (twist_degrees / config.max_twist_step_degrees).ceil();

    let base = match shape.family {
        ShapeFamily::Box | ShapeFamily::Prism => 1.0,
        ShapeFamily::Cylinder => 10.0,
        ShapeFamily::Sphere | ShapeFamily::Torus | ShapeFamily::Tube | ShapeFamily::Ring => {
            (config.revolution_segments as f64 * shape.revolutions * span).ceil()
        }
        ShapeFamily::Sculpt => {
            return Err(Error::UnsupportedShape(
                "sculpted shapes are not swept".to_string(),
            ))
        }
    };

    let steps = base.max(twist_steps).max(1.0);
    if steps > MAX_PATH_STEPS as f64 {
        return Err(Error::InvalidExtrusion(format!(
            "{steps} path steps exceed the limit of {MAX_PATH_STEPS}"
        )));
    }
    Ok(steps as usize)
}

/// Plan the rings of a sweep
///
/// Stations are evenly spaced from `path_begin`, with the final station
/// placed exactly on `path_end`.
pub fn plan_path(shape: &ShapeParameters, config: &MesherConfig) -> Result<PathPlan> {
    let (begin, end) = (shape.path_begin, shape.path_end);
    if !(begin.is_finite() && end.is_finite()) || begin < 0.0 || end > 1.0 || begin >= end {
        return Err(Error::InvalidExtrusion(format!(
            "path cut [{begin}, {end}] is not an increasing range within [0, 1]"
        )));
    }

    let steps = path_steps(shape, config)?;
    let span = end - begin;
    let stations = (0..steps)
        .map(|i| begin + span * i as f64 / steps as f64)
        .chain(std::iter::once(end))
        .collect();

    let closed = shape.family.is_revolved()
        && begin == 0.0
        && end == 1.0
        && is_whole(shape.revolutions)
        && is_whole(shape.twist_total())
        && shape.skew == 0.0
        && shape.radius_offset == 0.0
        && shape.taper.is_zero()
        && shape.top_shear.is_zero();

    Ok(PathPlan { stations, closed })
}

/// Per-ring transform, evaluated once per path station
#[derive(Debug, Clone, Copy)]
enum RingTransform {
    Linear {
        twist: (f64, f64),
        scale: (f64, f64),
        shear: (f64, f64),
        z: f64,
    },
    Revolved {
        twist: (f64, f64),
        /// Cross-section scale along the axis and along the radius
        scale: (f64, f64),
        shear: (f64, f64),
        /// Divisor and offset applied to the axial coordinate
        skew: Option<(f64, f64)>,
        radius: f64,
        spin: (f64, f64),
    },
}

impl RingTransform {
    fn linear(shape: &ShapeParameters, c: f64) -> Self {
        RingTransform::Linear {
            twist: turn_cos_sin(shape.twist_begin + shape.twist_total() * c),
            scale: (
                taper_scale(shape.top_size.x, c),
                taper_scale(shape.top_size.y, c),
            ),
            shear: (shape.top_shear.x * c, shape.top_shear.y * c),
            z: c - 0.5,
        }
    }

    fn revolved(shape: &ShapeParameters, c: f64, base_radius: bool) -> Self {
        let hole = shape.top_size;
        let skew_rev = shape.skew * shape.revolutions;
        // Sections shrink by 1 + |skew * revolutions| and slide along the axis so
        // the whole sweep stays inside [-0.5, 0.5]
        let skew = (base_radius && skew_rev != 0.0 && skew_rev.is_finite()).then(|| {
            let divisor = 1.0 + skew_rev.abs();
            (divisor, skew_rev / divisor * (c - 0.5))
        });
        let radius = if base_radius {
            (0.5 - hole.y * 0.5) * (1.0 - shape.radius_offset * c)
        } else {
            0.0
        };

        RingTransform::Revolved {
            twist: turn_cos_sin(shape.twist_begin + shape.twist_total() * c),
            scale: (
                hole.x * taper_scale(shape.taper.y, c),
                hole.y * taper_scale(shape.taper.x, c),
            ),
            shear: (shape.top_shear.x * c, shape.top_shear.y * c),
            skew,
            radius,
            spin: turn_cos_sin(shape.revolutions * c),
        }
    }

    #[inline]
    fn apply(&self, p: Point2<f64>) -> Point3<f64> {
        match *self {
            RingTransform::Linear {
                twist: (tc, ts),
                scale: (sx, sy),
                shear: (hx, hy),
                z,
            } => {
                let (x, y) = (p.x * sx, p.y * sy);
                Point3::new(x * tc - y * ts + hx, x * ts + y * tc + hy, z)
            }
            RingTransform::Revolved {
                twist: (tc, ts),
                scale: (sz, sr),
                shear: (hz, hr),
                skew,
                radius,
                spin: (pc, ps),
            } => {
                let (qx, qy) = (p.x * tc - p.y * ts, p.x * ts + p.y * tc);
                let mut z = qx * sz + hz;
                let r = radius + qy * sr + hr;
                if let Some((divisor, offset)) = skew {
                    z = z / divisor + offset;
                }
                Point3::new(r * pc, r * ps, z)
            }
        }
    }
}

fn transform_points(points: &[Point2<f64>], ring: RingTransform) -> Vec<Point3<f64>> {
    points.iter().map(|&p| ring.apply(p)).collect()
}

/// Linear sweep step for box, cylinder and prism
pub fn extrude_basic(
    points: &[Point2<f64>],
    shape: &ShapeParameters,
    c: f64,
) -> Result<Vec<Point3<f64>>> {
    if shape.family.path_curve() != Some(PathCurve::Linear) {
        return Err(Error::InvalidExtrusion(format!(
            "linear sweep requested for {}",
            shape.family.name()
        )));
    }
    Ok(transform_points(points, RingTransform::linear(shape, c)))
}

/// Revolved sweep step for torus, tube and ring
pub fn extrude_advanced(
    points: &[Point2<f64>],
    shape: &ShapeParameters,
    c: f64,
) -> Result<Vec<Point3<f64>>> {
    match shape.family {
        ShapeFamily::Torus | ShapeFamily::Tube | ShapeFamily::Ring => {
            Ok(transform_points(points, RingTransform::revolved(shape, c, true)))
        }
        other => Err(Error::InvalidExtrusion(format!(
            "revolved sweep requested for {}",
            other.name()
        ))),
    }
}

/// Sphere sweep step: the half-circle profile spun about Z with no base radius
pub fn extrude_sphere(
    points: &[Point2<f64>],
    shape: &ShapeParameters,
    c: f64,
) -> Result<Vec<Point3<f64>>> {
    if shape.family != ShapeFamily::Sphere {
        return Err(Error::InvalidExtrusion(format!(
            "sphere sweep requested for {}",
            shape.family.name()
        )));
    }
    Ok(transform_points(points, RingTransform::revolved(shape, c, false)))
}

fn ring_transform(shape: &ShapeParameters, c: f64) -> Result<RingTransform> {
    match shape.family {
        ShapeFamily::Box | ShapeFamily::Cylinder | ShapeFamily::Prism => {
            Ok(RingTransform::linear(shape, c))
        }
        ShapeFamily::Torus | ShapeFamily::Tube | ShapeFamily::Ring => {
            Ok(RingTransform::revolved(shape, c, true))
        }
        ShapeFamily::Sphere => Ok(RingTransform::revolved(shape, c, false)),
        ShapeFamily::Sculpt => Err(Error::UnsupportedShape(
            "sculpted shapes are not swept".to_string(),
        )),
    }
}

/// Sweep a profile along the shape's path, appending every ring to `mesh`
///
/// Each vertex gets a UV of (boundary position, path position). A closed
/// path repeats the first ring's positions bit for bit as its last ring.
pub fn sweep(
    profile: &Profile,
    shape: &ShapeParameters,
    config: &MesherConfig,
    mesh: &mut Mesh,
) -> Result<Sweep> {
    let plan = plan_path(shape, config)?;
    let stride = profile.stride();
    let first_vertex = mesh.vertex_count() as u32;
    let span = shape.path_end - shape.path_begin;
    let last = plan.ring_count() - 1;

    mesh.positions.reserve(plan.ring_count() * stride * 3);
    mesh.uvs.reserve(plan.ring_count() * stride * 2);

    for (k, &c) in plan.stations.iter().enumerate() {
        let v = (c - shape.path_begin) / span;
        if plan.closed && k == last {
            let start = first_vertex as usize * 3;
            mesh.positions.extend_from_within(start..start + stride * 3);
            for &u in &profile.u {
                mesh.uvs.push(u as f32);
                mesh.uvs.push(v as f32);
            }
            continue;
        }

        let ring = ring_transform(shape, c)?;
        for (&p, &u) in profile.points.iter().zip(&profile.u) {
            mesh.add_vertex_with_uv(ring.apply(p), Point2::new(u, v));
        }
    }

    debug!(
        family = shape.family.name(),
        rings = plan.ring_count(),
        stride,
        closed = plan.closed,
        "swept profile"
    );

    Ok(Sweep {
        first_vertex,
        rings: plan.ring_count(),
        stride,
        closed: plan.closed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use prim_lite_core::Vec2;

    fn stations(shape: &ShapeParameters) -> PathPlan {
        plan_path(shape, &MesherConfig::default()).unwrap()
    }

    #[test]
    fn test_taper_scale_directions() {
        assert_eq!(taper_scale(0.0, 0.7), 1.0);
        assert_abs_diff_eq!(taper_scale(0.5, 1.0), 0.5);
        assert_abs_diff_eq!(taper_scale(0.5, 0.0), 1.0);
        assert_abs_diff_eq!(taper_scale(-0.5, 0.0), 0.5);
        assert_abs_diff_eq!(taper_scale(-0.5, 1.0), 1.0);
    }

    #[test]
    fn test_plain_box_has_two_rings() {
        let plan = stations(&ShapeParameters::new(ShapeFamily::Box));
        assert_eq!(plan.stations, vec![0.0, 1.0]);
        assert!(!plan.closed);
    }

    #[test]
    fn test_cylinder_has_eleven_rings() {
        let plan = stations(&ShapeParameters::new(ShapeFamily::Cylinder));
        assert_eq!(plan.ring_count(), 11);
        assert_eq!(*plan.stations.last().unwrap(), 1.0);
    }

    #[test]
    fn test_twist_bounds_step_angle() {
        let shape = ShapeParameters::new(ShapeFamily::Box).with_twist(0.0, 0.5);
        // 180 degrees in 5 degree steps
        assert_eq!(stations(&shape).ring_count(), 37);

        let cut = shape.with_path_cut(0.0, 0.5);
        assert_eq!(stations(&cut).ring_count(), 19);
    }

    #[test]
    fn test_revolved_plans() {
        let torus = ShapeParameters::new(ShapeFamily::Torus);
        let plan = stations(&torus);
        assert_eq!(plan.ring_count(), 25);
        assert!(plan.closed);

        let mut twice = torus.clone();
        twice.revolutions = 2.0;
        assert_eq!(stations(&twice).ring_count(), 49);

        let mut skewed = torus.clone();
        skewed.skew = 0.2;
        assert!(!stations(&skewed).closed);

        let cut = torus.with_path_cut(0.0, 0.5);
        let plan = stations(&cut);
        assert!(!plan.closed);
        assert_eq!(plan.ring_count(), 13);
    }

    #[test]
    fn test_bad_path_cut() {
        let shape = ShapeParameters::new(ShapeFamily::Box).with_path_cut(0.5, 0.5);
        assert!(matches!(
            plan_path(&shape, &MesherConfig::default()),
            Err(Error::InvalidExtrusion(_))
        ));
    }

    #[test]
    fn test_basic_ring_spans_unit_height() {
        let shape = ShapeParameters::new(ShapeFamily::Box);
        let corner = [Point2::new(0.5, 0.5)];
        let bottom = extrude_basic(&corner, &shape, 0.0).unwrap()[0];
        let top = extrude_basic(&corner, &shape, 1.0).unwrap()[0];
        assert_eq!(bottom, Point3::new(0.5, 0.5, -0.5));
        assert_eq!(top, Point3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_basic_ring_twist_size_and_shear() {
        let mut shape = ShapeParameters::new(ShapeFamily::Box).with_twist(0.0, 0.25);
        let corner = [Point2::new(0.5, 0.5)];
        let top = extrude_basic(&corner, &shape, 1.0).unwrap()[0];
        assert_eq!(top, Point3::new(-0.5, 0.5, 0.5));

        shape = ShapeParameters::new(ShapeFamily::Box);
        shape.top_size = Vec2::new(1.0, 0.5);
        shape.top_shear = Vec2::new(0.25, 0.0);
        let top = extrude_basic(&corner, &shape, 1.0).unwrap()[0];
        assert_abs_diff_eq!(top.x, 0.25);
        assert_abs_diff_eq!(top.y, 0.25);
    }

    #[test]
    fn test_torus_cross_section() {
        let shape = ShapeParameters::new(ShapeFamily::Torus);
        let points = [Point2::new(0.5, 0.0), Point2::new(0.0, 0.5)];
        let ring = extrude_advanced(&points, &shape, 0.0).unwrap();
        assert_eq!(ring[0], Point3::new(0.375, 0.0, 0.5));
        assert_eq!(ring[1], Point3::new(0.5, 0.0, 0.0));

        let quarter = extrude_advanced(&points, &shape, 0.25).unwrap();
        assert_abs_diff_eq!(quarter[1].x, 0.0);
        assert_abs_diff_eq!(quarter[1].y, 0.5);
    }

    #[test]
    fn test_skew_keeps_section_in_bounds() {
        let mut shape = ShapeParameters::new(ShapeFamily::Tube);
        shape.skew = 1.0;
        shape.revolutions = 2.0;
        let points = [Point2::new(0.5, 0.5), Point2::new(-0.5, -0.5)];
        for c in [0.0, 0.3, 1.0] {
            for p in extrude_advanced(&points, &shape, c).unwrap() {
                assert!(p.z.is_finite());
                assert!(p.z.abs() <= 0.5 + 1e-12);
            }
        }
    }

    #[test]
    fn test_skew_slides_section_along_axis() {
        let mut shape = ShapeParameters::new(ShapeFamily::Torus);
        shape.skew = 0.5;
        shape.revolutions = 2.0;
        let points = [Point2::new(0.5, 0.0), Point2::new(0.0, 0.5)];

        let start = extrude_advanced(&points, &shape, 0.0).unwrap();
        assert_abs_diff_eq!(start[0].z, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(start[1].z, -0.25, epsilon = 1e-12);

        let end = extrude_advanced(&points, &shape, 1.0).unwrap();
        assert_abs_diff_eq!(end[0].z, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(end[1].z, 0.25, epsilon = 1e-12);

        shape.skew = 0.0;
        let plain = extrude_advanced(&points, &shape, 1.0).unwrap();
        assert_abs_diff_eq!(plain[0].z, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(plain[1].z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_path_steps_are_capped() {
        let config = MesherConfig::default();
        let mut shape = ShapeParameters::new(ShapeFamily::Torus);
        shape.revolutions = 1e12;
        assert!(matches!(path_steps(&shape, &config), Err(Error::InvalidExtrusion(_))));
        assert!(matches!(plan_path(&shape, &config), Err(Error::InvalidExtrusion(_))));

        let twisted = ShapeParameters::new(ShapeFamily::Box).with_twist(0.0, 1e7);
        assert!(matches!(path_steps(&twisted, &config), Err(Error::InvalidExtrusion(_))));

        let mut widest = ShapeParameters::new(ShapeFamily::Torus).with_twist(-1.0, 1.0);
        widest.revolutions = 4.0;
        let steps = path_steps(&widest, &config).unwrap();
        assert_eq!(steps, 144);
        assert!(steps <= MAX_PATH_STEPS);
    }

    #[test]
    fn test_advanced_rejects_linear_family() {
        let shape = ShapeParameters::new(ShapeFamily::Box);
        let err = extrude_advanced(&[Point2::origin()], &shape, 0.5).unwrap_err();
        assert!(matches!(err, Error::InvalidExtrusion(_)));
        assert!(extrude_sphere(&[Point2::origin()], &shape, 0.5).is_err());
        let ring = ShapeParameters::new(ShapeFamily::Ring);
        assert!(extrude_basic(&[Point2::origin()], &ring, 0.5).is_err());
    }

    #[test]
    fn test_sphere_revolves_profile() {
        let shape = ShapeParameters::new(ShapeFamily::Sphere);
        let points = [Point2::new(0.5, 0.0), Point2::new(0.0, 0.5)];
        let ring = extrude_sphere(&points, &shape, 0.25).unwrap();
        assert_eq!(ring[0], Point3::new(0.0, 0.0, 0.5));
        assert_eq!(ring[1], Point3::new(0.0, 0.5, 0.0));
    }
}
