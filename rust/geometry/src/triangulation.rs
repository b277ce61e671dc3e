// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring stitching and end caps
//!
//! Triangles wind counter-clockwise seen from outside the solid. With the
//! profile counter-clockwise in its own plane and the sweep moving along
//! the plane normal, a wall quad between edge `(i, j)` on ring `k` and ring
//! `k + 1` splits into `(k.i, k.j, k+1.j)` and `(k.i, k+1.j, k+1.i)`.

use crate::extrusion::Sweep;
use crate::mesh::Mesh;
use crate::profile::Profile;
use nalgebra::{Point2, Point3};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Fan over `0..n` anchored on the first point
#[inline]
fn fan_triangulate(n: usize) -> impl Iterator<Item = [u32; 3]> {
    (1..n.saturating_sub(1)).map(|i| [0, i as u32, i as u32 + 1])
}

/// How a ring's end face is closed
#[derive(Debug, Clone, PartialEq, Eq)]
enum CapPlan {
    None,
    /// Triangles over profile point indices
    Faces(Vec<[u32; 3]>),
    /// Fan around an extra vertex at the ring's centroid
    CentroidFan,
}

fn plan_caps(profile: &Profile) -> CapPlan {
    let n = profile.outer_count;
    if profile.open_hollow || n < 2 {
        return CapPlan::None;
    }

    if profile.hollow {
        let pairs = if profile.closed_loop { n } else { n - 1 };
        let mut faces = Vec::with_capacity(pairs * 2);
        for i in 0..pairs {
            let j = (i + 1) % n;
            let (oi, oj) = (i as u32, j as u32);
            let (ii, ij) = (profile.inner_index(i) as u32, profile.inner_index(j) as u32);
            faces.push([oi, oj, ij]);
            faces.push([oi, ij, ii]);
        }
        return CapPlan::Faces(faces);
    }

    if let Some(center) = profile.center_index() {
        let c = center as u32;
        return CapPlan::Faces((0..n as u32 - 1).map(|i| [c, i, i + 1]).collect());
    }

    if is_convex(&profile.points[..n]) {
        CapPlan::Faces(fan_triangulate(n).collect())
    } else {
        CapPlan::CentroidFan
    }
}

fn push_cap(mesh: &mut Mesh, plan: &CapPlan, ring_start: u32, outer_count: usize, flip: bool) {
    let emit = |mesh: &mut Mesh, [a, b, c]: [u32; 3]| {
        if flip {
            mesh.add_triangle(a, c, b);
        } else {
            mesh.add_triangle(a, b, c);
        }
    };

    match plan {
        CapPlan::None => {}
        CapPlan::Faces(faces) => {
            for &[a, b, c] in faces {
                emit(mesh, [ring_start + a, ring_start + b, ring_start + c]);
            }
        }
        CapPlan::CentroidFan => {
            let mut sum = Point3::<f64>::origin().coords;
            for i in 0..outer_count {
                let p = mesh.position(ring_start as usize + i);
                sum += Point3::new(p.x as f64, p.y as f64, p.z as f64).coords;
            }
            let centroid = Point3::from(sum / outer_count as f64);
            let center = if mesh.has_uvs() {
                mesh.add_vertex_with_uv(centroid, Point2::new(0.5, 0.5))
            } else {
                mesh.add_vertex(centroid)
            };
            let n = outer_count as u32;
            for i in 0..n {
                emit(mesh, [center, ring_start + i, ring_start + (i + 1) % n]);
            }
        }
    }
}

/// Stitch consecutive rings into side walls and close both ends
///
/// End caps are skipped when the path is closed or the profile is an open
/// hollow arc.
pub fn build_triangles(mesh: &mut Mesh, profile: &Profile, sweep: &Sweep) {
    let edges = profile.wall_edges();
    let walls = edges.len() * 2 * sweep.rings.saturating_sub(1);
    mesh.triangles.reserve(walls + profile.stride() * 2);

    for k in 0..sweep.rings.saturating_sub(1) {
        let lo = sweep.ring_start(k);
        let hi = sweep.ring_start(k + 1);
        for &(i, j) in &edges {
            mesh.add_triangle(lo + i, lo + j, hi + j);
            mesh.add_triangle(lo + i, hi + j, hi + i);
        }
    }

    if sweep.closed || sweep.rings < 2 {
        return;
    }

    let plan = plan_caps(profile);
    push_cap(mesh, &plan, sweep.ring_start(0), profile.outer_count, true);
    push_cap(
        mesh,
        &plan,
        sweep.ring_start(sweep.rings - 1),
        profile.outer_count,
        false,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MesherConfig;
    use crate::extrusion::sweep;
    use crate::profile::{generate_profile, ProfileParams};
    use approx::assert_relative_eq;
    use prim_lite_core::{HoleShape, ShapeFamily, ShapeParameters};

    fn build(shape: &ShapeParameters) -> (Mesh, Profile, Sweep) {
        let config = MesherConfig::default();
        let params = ProfileParams::from_shape(shape, config.profile_steps);
    let profile = generate_profile(&params).unwrap();
        let mut mesh = Mesh::new();
        let swept = sweep(&profile, shape, &config, &mut mesh).unwrap();
        build_triangles(&mut mesh, &profile, &swept);
        (mesh, profile, swept)
    }

    #[test]
    fn test_convexity() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(is_convex(&square));
        let dart = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(0.0, 2.0),
            Point2::new(0.5, 1.0),
        ];
        assert!(!is_convex(&dart));
    }

    #[test]
    fn test_box_walls_and_caps() {
        let (mesh, _, swept) = build(&ShapeParameters::new(ShapeFamily::Box));
        assert_eq!(swept.rings, 2);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.validate_indices().is_ok());
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_hollow_cylinder_has_no_caps() {
        let shape = ShapeParameters::new(ShapeFamily::Cylinder)
            .with_profile_cut(0.25, 0.75)
            .with_hollow(0.3, HoleShape::Circle);
        let (mesh, profile, swept) = build(&shape);
        assert_eq!(swept.rings, 11);
        assert_eq!(profile.stride(), 122);
        assert_eq!(mesh.triangle_count(), 2 * 122 * 10);
    }

    #[test]
    fn test_hollow_box_is_annulus() {
        let shape = ShapeParameters::new(ShapeFamily::Box).with_hollow(0.5, HoleShape::Same);
        let (mesh, _, _) = build(&shape);
        // Eight walls of two triangles, two annulus caps of eight
        assert_eq!(mesh.triangle_count(), 8 * 2 + 2 * 8);
        assert_relative_eq!(mesh.signed_volume(), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_wedge_caps_fan_around_center() {
        let shape = ShapeParameters::new(ShapeFamily::Box).with_profile_cut(0.0, 0.5);
        let (mesh, profile, _) = build(&shape);
        assert!(profile.has_center);
        assert_relative_eq!(mesh.signed_volume(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_closed_torus_has_no_caps() {
        let (mesh, profile, swept) = build(&ShapeParameters::new(ShapeFamily::Torus));
        assert!(swept.closed);
        assert_eq!(mesh.triangle_count(), profile.stride() * 2 * (swept.rings - 1));
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_centroid_fan_adds_vertex() {
        let mut mesh = Mesh::new();
        for p in [(0.0, 0.0), (2.0, 1.0), (0.0, 2.0), (0.5, 1.0)] {
            mesh.add_vertex(Point3::new(p.0, p.1, 0.0));
        }
        push_cap(&mut mesh, &CapPlan::CentroidFan, 0, 4, false);
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.triangles.iter().all(|t| t.v0 == 4));
    }
}
