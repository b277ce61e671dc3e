// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile generation
//!
//! A profile is one cross-section ring of a primitive: an ordered list of
//! 2D boundary points in the unit square centred on the origin. Angles are
//! measured in profile space; each family adds a fixed phase so its outline
//! starts on a corner (box, prism) or on the +X axis (circle).

use crate::error::{Error, Result};
use nalgebra::Point2;
use prim_lite_core::{HoleShape, ShapeFamily, ShapeParameters};
use smallvec::SmallVec;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// Angles closer than this are treated as the same sample
const ANGLE_EPSILON: f64 = 1e-9;

const CIRCLE_RADIUS: f64 = 0.5;

// 0.5 * cos(30°)
const TRIANGLE_HALF_WIDTH: f64 = 0.433_012_701_892_219_3;

const SQUARE_CORNERS: [[f64; 2]; 4] = [[0.5, 0.5], [-0.5, 0.5], [-0.5, -0.5], [0.5, -0.5]];
const SQUARE_CORNER_ANGLES: [f64; 4] = [
    FRAC_PI_4,
    3.0 * FRAC_PI_4,
    5.0 * FRAC_PI_4,
    7.0 * FRAC_PI_4,
];

const TRIANGLE_CORNERS: [[f64; 2]; 3] = [
    [0.0, -0.5],
    [TRIANGLE_HALF_WIDTH, 0.25],
    [-TRIANGLE_HALF_WIDTH, 0.25],
];
const TRIANGLE_CORNER_ANGLES: [f64; 3] = [-FRAC_PI_2, PI / 6.0, 5.0 * PI / 6.0];

/// Cosine and sine of an angle given in turns
///
/// Quarter turns come out exact so seams and poles land on identical
/// coordinates.
pub(crate) fn turn_cos_sin(turns: f64) -> (f64, f64) {
    let t = turns.rem_euclid(1.0);
    if t == 0.0 {
        (1.0, 0.0)
    } else if t == 0.25 {
        (0.0, 1.0)
    } else if t == 0.5 {
        (-1.0, 0.0)
    } else if t == 0.75 {
        (0.0, -1.0)
    } else {
        let (s, c) = (t * TAU).sin_cos();
        (c, s)
    }
}

#[inline]
fn angle_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Unit outline a boundary point is projected onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outline {
    /// Circle of radius 0.5
    Circle,
    /// Axis-aligned square of half-size 0.5
    Square,
    /// Equilateral triangle of circumradius 0.5, apex down
    Triangle,
}

impl Outline {
    /// Outline and angular phase for a family's outer boundary
    pub fn for_family(family: ShapeFamily) -> Option<(Outline, f64)> {
        match family {
            ShapeFamily::Box | ShapeFamily::Tube => Some((Outline::Square, FRAC_PI_4)),
            ShapeFamily::Cylinder | ShapeFamily::Torus | ShapeFamily::Sphere => {
                Some((Outline::Circle, 0.0))
            }
            ShapeFamily::Prism | ShapeFamily::Ring => Some((Outline::Triangle, -FRAC_PI_2)),
            ShapeFamily::Sculpt => None,
        }
    }

    fn for_hole(hole: HoleShape, outer: Outline) -> Outline {
        match hole {
            HoleShape::Same => outer,
            HoleShape::Circle => Outline::Circle,
            HoleShape::Square => Outline::Square,
            HoleShape::Triangle => Outline::Triangle,
        }
    }

    fn corners(self) -> (&'static [[f64; 2]], &'static [f64]) {
        match self {
            Outline::Circle => (&[], &[]),
            Outline::Square => (&SQUARE_CORNERS, &SQUARE_CORNER_ANGLES),
            Outline::Triangle => (&TRIANGLE_CORNERS, &TRIANGLE_CORNER_ANGLES),
        }
    }

    #[inline]
    pub fn is_curved(self) -> bool {
        self == Outline::Circle
    }

    /// Where the ray from the origin at angle `phi` meets the outline
    pub fn point(self, phi: f64) -> Point2<f64> {
        match self {
            Outline::Circle => {
                let (c, s) = turn_cos_sin(phi / TAU);
                Point2::new(CIRCLE_RADIUS * c, CIRCLE_RADIUS * s)
            }
            Outline::Square | Outline::Triangle => {
                let (corners, angles) = self.corners();
                polygon_point(corners, angles, phi)
            }
        }
    }
}

/// Intersect a ray with a convex polygon around the origin
///
/// Solves `t * d = a + s * (b - a)` per edge with Cramer's rule. Rays that
/// hit a corner return the tabulated corner exactly.
fn polygon_point(corners: &[[f64; 2]], angles: &[f64], phi: f64) -> Point2<f64> {
    for (corner, &angle) in corners.iter().zip(angles) {
        if angle_distance(phi, angle) < 1e-12 {
            return Point2::new(corner[0], corner[1]);
        }
    }

    let (dy, dx) = phi.sin_cos();
    let n = corners.len();
    for i in 0..n {
        let [ax, ay] = corners[i];
        let [bx, by] = corners[(i + 1) % n];
        let (ex, ey) = (bx - ax, by - ay);

        let det = ex * dy - dx * ey;
        if det.abs() < 1e-15 {
            continue;
        }
        let t = (ex * ay - ax * ey) / det;
        let s = (dx * ay - dy * ax) / det;
        if t > 0.0 && (-1e-9..=1.0 + 1e-9).contains(&s) {
            return Point2::new(ax + s * ex, ay + s * ey);
        }
    }

    // Unreachable for outlines that enclose the origin
    Point2::new(CIRCLE_RADIUS * dx, CIRCLE_RADIUS * dy)
}

/// Inputs of the profile generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParams {
    pub family: ShapeFamily,
    pub cut_begin: f64,
    pub cut_end: f64,
    pub hollow: f64,
    pub hole_shape: HoleShape,
    /// Samples across the cut range of a curved outline
    pub steps: usize,
}

impl ProfileParams {
    pub fn from_shape(shape: &ShapeParameters, steps: usize) -> Self {
        Self {
            family: shape.family,
            cut_begin: shape.profile_begin,
            cut_end: shape.profile_end,
            hollow: shape.hollow,
            hole_shape: shape.hollow_shape,
            steps,
        }
    }

    /// The cut leaves an arc rather than a full ring
    #[inline]
    pub fn is_open(&self) -> bool {
        self.cut_begin > 0.0 || self.cut_end < 1.0
    }
}

/// One cross-section ring
///
/// Layout: `outer_count` outer points in increasing angle, then either the
/// inner (hollow) points in reverse angle order, or a single centre point
/// when a solid profile is cut open, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub points: Vec<Point2<f64>>,
    /// Position of each point along the boundary in `[0, 1]`
    pub u: Vec<f64>,
    pub outer_count: usize,
    pub hollow: bool,
    pub has_center: bool,
    /// The outer boundary wraps from its last point back to its first
    pub closed_loop: bool,
    /// Hollow cut open; its ends are left without caps
    pub open_hollow: bool,
}

impl Profile {
    /// Points per ring
    #[inline]
    pub fn stride(&self) -> usize {
        self.points.len()
    }

    /// Index of the inner point paired with outer point `i`
    #[inline]
    pub fn inner_index(&self, i: usize) -> usize {
        2 * self.outer_count - 1 - i
    }

    #[inline]
    pub fn center_index(&self) -> Option<usize> {
        self.has_center.then_some(self.outer_count)
    }

    /// Boundary edges swept into side walls, as `(from, to)` point pairs
    ///
    /// A closed hollow ring keeps its outer and inner loops separate; every
    /// other layout is one cyclic loop over all points.
    pub fn wall_edges(&self) -> Vec<(u32, u32)> {
        let stride = self.stride();
        let n = self.outer_count;
        if self.hollow && self.closed_loop {
            let outer = (0..n).map(|i| (i, (i + 1) % n));
            let inner = (0..n).map(|j| (n + j, n + (j + 1) % n));
            outer
                .chain(inner)
                .map(|(a, b)| (a as u32, b as u32))
                .collect()
        } else {
            (0..stride)
                .map(|i| (i as u32, ((i + 1) % stride) as u32))
                .collect()
        }
    }
}

/// Build the cross-section of a procedural family
pub fn generate_profile(params: &ProfileParams) -> Result<Profile> {
    let (outer, phase) = Outline::for_family(params.family).ok_or_else(|| {
        Error::UnsupportedShape(format!("{} has no parametric profile", params.family.name()))
    })?;

    let (begin, end) = (params.cut_begin, params.cut_end);
    if !(begin.is_finite() && end.is_finite()) || begin < 0.0 || end > 1.0 || begin >= end {
        return Err(Error::InvalidProfile(format!(
            "profile cut [{begin}, {end}] is not an increasing range within [0, 1]"
        )));
    }
    if !(0.0..1.0).contains(&params.hollow) {
        return Err(Error::InvalidProfile(format!(
            "hollow {} is outside [0, 1)",
            params.hollow
        )));
    }
    if params.steps == 0 {
        return Err(Error::InvalidProfile("profile needs at least one step".to_string()));
    }

    let hollow = params.hollow > 0.0;
    let hole = Outline::for_hole(params.hole_shape, outer);
    let full_turn = if params.family.has_half_profile() { PI } else { TAU };
    let start = full_turn * begin;
    let finish = full_turn * end;
    let span = finish - start;

    let curved = outer.is_curved() || (hollow && hole.is_curved());
    let mut angles: Vec<f64> = if curved {
        let steps = params.steps;
        (0..steps)
            .map(|i| start + span * i as f64 / steps as f64)
            .chain(std::iter::once(finish))
            .collect()
    } else {
        vec![start, finish]
    };

    let mut outlines: SmallVec<[Outline; 2]> = SmallVec::new();
    outlines.push(outer);
    if hollow && hole != outer {
        outlines.push(hole);
    }
    for outline in outlines {
        let (_, corner_angles) = outline.corners();
        for &corner in corner_angles {
            let theta = (corner - phase).rem_euclid(TAU);
            if theta > start + ANGLE_EPSILON && theta < finish - ANGLE_EPSILON {
                angles.push(theta);
            }
        }
    }
    angles.sort_by(f64::total_cmp);
    angles.dedup_by(|a, b| (*a - *b).abs() < ANGLE_EPSILON);

    let closed_loop = !params.is_open() && !params.family.has_half_profile();
    if closed_loop {
        angles.pop();
    }

    let n = angles.len();
    let mut points = Vec::with_capacity(if hollow { 2 * n } else { n + 1 });
    let mut u = Vec::with_capacity(points.capacity());
    for &theta in &angles {
        points.push(outer.point(theta + phase));
        u.push((theta - start) / span);
    }

    let mut has_center = false;
    if hollow {
        for i in (0..n).rev() {
            let p = hole.point(angles[i] + phase);
            points.push(Point2::new(p.x * params.hollow, p.y * params.hollow));
            u.push(u[i]);
        }
    } else if !closed_loop {
        points.push(Point2::origin());
        u.push(0.5);
        has_center = true;
    }

    Ok(Profile {
        points,
        u,
        outer_count: n,
        hollow,
        has_center,
        closed_loop,
        open_hollow: hollow && params.is_open(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(family: ShapeFamily) -> ProfileParams {
        ProfileParams {
            family,
            cut_begin: 0.0,
            cut_end: 1.0,
            hollow: 0.0,
            hole_shape: HoleShape::Same,
            steps: 60,
        }
    }

    #[test]
    fn test_turn_cos_sin_quarters_are_exact() {
        assert_eq!(turn_cos_sin(0.0), (1.0, 0.0));
        assert_eq!(turn_cos_sin(0.5), (-1.0, 0.0));
        assert_eq!(turn_cos_sin(2.0), (1.0, 0.0));
        assert_eq!(turn_cos_sin(-0.25), (0.0, -1.0));
        let (c, s) = turn_cos_sin(0.125);
        assert_abs_diff_eq!(c, s, epsilon = 1e-15);
    }

    #[test]
    fn test_full_box_has_exact_corners() {
        let profile = generate_profile(&params(ShapeFamily::Box)).unwrap();
        assert!(profile.closed_loop);
        assert_eq!(
            profile.points,
            vec![
                Point2::new(0.5, 0.5),
                Point2::new(-0.5, 0.5),
                Point2::new(-0.5, -0.5),
                Point2::new(0.5, -0.5),
            ]
        );
        assert_eq!(profile.wall_edges().len(), 4);
    }

    #[test]
    fn test_cut_box_keeps_corners_and_center() {
        let profile = generate_profile(&ProfileParams {
            cut_begin: 0.125,
            cut_end: 0.625,
            ..params(ShapeFamily::Box)
        })
        .unwrap();
        // Mid-edge start, two corners, mid-edge end, centre
        assert_eq!(profile.outer_count, 4);
        assert!(profile.has_center);
        assert_abs_diff_eq!(profile.points[0].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.points[0].y, 0.5, epsilon = 1e-12);
        assert_eq!(profile.points[1], Point2::new(-0.5, 0.5));
        assert_eq!(profile.points[2], Point2::new(-0.5, -0.5));
        assert_abs_diff_eq!(profile.points[3].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.points[3].y, -0.5, epsilon = 1e-12);
        assert_eq!(profile.points[4], Point2::origin());
    }

    #[test]
    fn test_prism_has_three_corners() {
        let profile = generate_profile(&params(ShapeFamily::Prism)).unwrap();
        assert_eq!(profile.stride(), 3);
        assert_eq!(profile.points[0], Point2::new(0.0, -0.5));
        assert_eq!(profile.points[1], Point2::new(TRIANGLE_HALF_WIDTH, 0.25));
    }

    #[test]
    fn test_cylinder_samples_circle() {
        let profile = generate_profile(&params(ShapeFamily::Cylinder)).unwrap();
        assert_eq!(profile.stride(), 60);
        for p in &profile.points {
            assert_abs_diff_eq!(p.coords.norm(), 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_steps_spread_across_cut() {
        let profile = generate_profile(&ProfileParams {
            cut_begin: 0.0,
            cut_end: 0.5,
            ..params(ShapeFamily::Cylinder)
        })
        .unwrap();
        // Half a circle still gets every step, plus the end sample
        assert_eq!(profile.outer_count, 61);
        assert!(profile.has_center);
        let step = profile.points[1] - profile.points[0];
        assert_abs_diff_eq!(step.norm(), 2.0 * 0.5 * (PI / 120.0).sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_circle_hollow_is_exact_scale() {
        let profile = generate_profile(&ProfileParams {
            cut_begin: 0.25,
            cut_end: 0.75,
            hollow: 0.3,
            hole_shape: HoleShape::Circle,
            ..params(ShapeFamily::Cylinder)
        })
        .unwrap();
        assert_eq!(profile.outer_count, 61);
        assert_eq!(profile.stride(), 122);
        assert!(profile.open_hollow);
        for i in 0..profile.outer_count {
            let outer = profile.points[i];
            let inner = profile.points[profile.inner_index(i)];
            assert_eq!(inner, Point2::new(outer.x * 0.3, outer.y * 0.3));
        }
    }

    #[test]
    fn test_square_hole_in_cylinder_shares_rays() {
        let profile = generate_profile(&ProfileParams {
            hollow: 0.5,
            hole_shape: HoleShape::Square,
            ..params(ShapeFamily::Cylinder)
        })
        .unwrap();
        // 60 uniform samples plus the four hole corners
        assert_eq!(profile.outer_count, 64);
        assert!(!profile.open_hollow);
        for i in 0..profile.outer_count {
            let outer = profile.points[i];
            let inner = profile.points[profile.inner_index(i)];
            assert_abs_diff_eq!(outer.x * inner.y - outer.y * inner.x, 0.0, epsilon = 1e-12);
            assert!(inner.coords.norm() <= outer.coords.norm());
        }
        assert!(profile.points.contains(&Point2::new(0.25, 0.25)));
        assert_eq!(profile.wall_edges().len(), 128);
    }

    #[test]
    fn test_triangle_hole_in_box_inserts_corners() {
        let profile = generate_profile(&ProfileParams {
            hollow: 0.5,
            hole_shape: HoleShape::Triangle,
            ..params(ShapeFamily::Box)
        })
        .unwrap();
        // Four box corners plus three triangle corners
        assert_eq!(profile.outer_count, 7);
        assert!(profile.points.contains(&Point2::new(0.0, -0.25)));
    }

    #[test]
    fn test_sphere_is_half_circle() {
        let profile = generate_profile(&params(ShapeFamily::Sphere)).unwrap();
        assert!(!profile.closed_loop);
        assert!(profile.has_center);
        assert_eq!(profile.outer_count, 61);
        assert_eq!(profile.points[0], Point2::new(0.5, 0.0));
        assert_eq!(profile.points[60], Point2::new(-0.5, 0.0));
        assert!(profile.points.iter().all(|p| p.y >= 0.0));
    }

    #[test]
    fn test_closed_hollow_edges_skip_seam() {
        let profile = generate_profile(&ProfileParams {
            hollow: 0.25,
            ..params(ShapeFamily::Box)
        })
        .unwrap();
        let edges = profile.wall_edges();
        assert_eq!(edges.len(), 8);
        assert!(edges.contains(&(3, 0)));
        assert!(edges.contains(&(7, 4)));
        assert!(!edges.contains(&(3, 4)));
    }

    #[test]
    fn test_rejects_bad_input() {
        let reversed = ProfileParams {
            cut_begin: 0.8,
            cut_end: 0.2,
            ..params(ShapeFamily::Box)
        };
        assert!(matches!(generate_profile(&reversed), Err(Error::InvalidProfile(_))));

        let full_hollow = ProfileParams {
            hollow: 1.0,
            ..params(ShapeFamily::Box)
        };
        assert!(generate_profile(&full_hollow).is_err());

        assert!(matches!(
            generate_profile(&params(ShapeFamily::Sculpt)),
            Err(Error::UnsupportedShape(_))
        ));
    }
}
