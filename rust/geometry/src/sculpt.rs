// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sculpt map decoding
//!
//! A sculpt map is an RGB image whose pixels are vertex positions: red,
//! green and blue give X, Y and Z in `[-0.5, 0.5]`. The image is sampled on
//! a coarse grid and every grid cell becomes two triangles.

use crate::config::MesherConfig;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use nalgebra::{Point2, Point3};
use prim_lite_core::SculptParameters;
use tracing::debug;

/// Pixel source for the sculpt decoder
pub trait SculptImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// RGB of the pixel at column `x`, row `y`
    fn rgb(&self, x: u32, y: u32) -> [u8; 3];
}

/// Owned, tightly packed RGB8 bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbBitmap {
    /// Wrap packed RGB bytes, row-major from the top-left pixel
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(Error::Sculpt(format!(
                "{width}x{height} bitmap needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a bitmap by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }
}

impl SculptImage for RgbBitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

impl SculptImage for image::RgbImage {
    fn width(&self) -> u32 {
        image::RgbImage::width(self)
    }

    fn height(&self) -> u32 {
        image::RgbImage::height(self)
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

/// Grid resolution for an image, as `(rows, columns)`
///
/// The sample budget is a quarter of the pixel count, held between the
/// squared floor and the squared ceiling. Columns follow the image aspect
/// ratio; the larger side is then trimmed until the grid fits the budget.
pub fn sculpt_resolution(width: u32, height: u32, config: &MesherConfig) -> (usize, usize) {
    let lo = config.sculpt_min_resolution;
    let hi = config.sculpt_max_resolution;
    let pixels = width as usize * height as usize;
    let budget = (pixels / 4).clamp(lo * lo, hi * hi);

    let aspect = width as f64 / height.max(1) as f64;
    let columns = ((budget as f64 * aspect).sqrt().round() as usize).clamp(lo, hi);
    let rows = (budget / columns).clamp(lo, hi);

    let (mut s, mut t) = (rows, columns);
    while s * t > budget {
        if s >= t && s > lo {
            s -= 1;
        } else if t > lo {
            t -= 1;
        } else {
            break;
        }
    }
    (s, t)
}

/// Decode a sculpt map into a grid mesh
///
/// The mesh has `(rows + 1) * (columns + 1)` vertices with UVs; seams are
/// closed by re-reading row or column 0, so welding the result joins them.
pub fn decode_sculpt<I: SculptImage + ?Sized>(
    image: &I,
    sculpt: &SculptParameters,
    config: &MesherConfig,
) -> Result<Mesh> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(Error::Sculpt(format!("empty {width}x{height} sculpt map")));
    }

    let (rows, columns) = sculpt_resolution(width, height, config);
    let kind = sculpt.kind;
    let reverse = sculpt.reverses_columns();

    let mut mesh = Mesh::with_capacity((rows + 1) * (columns + 1), rows * columns * 2);
    for i in 0..=rows {
        let mut py = (i * height as usize / rows) as u32;
        if py >= height {
            py = if kind.wraps_rows() { 0 } else { height - 1 };
        }
        let pole = kind.pinches_poles() && (i == 0 || i == rows);

        for j in 0..=columns {
            let column = if reverse { columns - j } else { j };
            let mut px = (column * width as usize / columns) as u32;
            if px >= width {
                px = if kind.wraps_columns() { 0 } else { width - 1 };
            }
            if pole {
                px = 0;
            }

            let [r, g, b] = image.rgb(px, py);
            let mut x = r as f64 / 255.0 - 0.5;
            if sculpt.mirror {
                x = -x;
            }
            let position = Point3::new(x, g as f64 / 255.0 - 0.5, b as f64 / 255.0 - 0.5);
            let uv = Point2::new(j as f64 / columns as f64, i as f64 / rows as f64);
            mesh.add_vertex_with_uv(position, uv);
        }
    }

    let row_len = (columns + 1) as u32;
    for i in 0..rows as u32 {
        for j in 0..columns as u32 {
            let a = i * row_len + j;
            let b = a + 1;
            let c = a + row_len;
            let d = c + 1;
            mesh.add_triangle(a, b, d);
            mesh.add_triangle(a, d, c);
        }
    }

    debug!(
        width,
        height,
        rows,
        columns,
        kind = ?kind,
        mirror = sculpt.mirror,
        invert = sculpt.invert,
        "decoded sculpt map"
    );

    Ok(mesh)
}

/// Decode an encoded image (PNG, JPEG, TGA, BMP) and then the sculpt grid
pub fn decode_sculpt_bytes(
    bytes: &[u8],
    sculpt: &SculptParameters,
    config: &MesherConfig,
) -> Result<Mesh> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::Sculpt(format!("undecodable sculpt texture: {e}")))?;
    decode_sculpt(&decoded.to_rgb8(), sculpt, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use prim_lite_core::SculptType;

    fn params(kind: SculptType) -> SculptParameters {
        SculptParameters::new([0; 16], kind)
    }

    fn gradient(width: u32, height: u32) -> RgbBitmap {
        RgbBitmap::from_fn(width, height, |x, y| {
            [
                (x * 255 / width.max(2).saturating_sub(1)).min(255) as u8,
                (y * 255 / height.max(2).saturating_sub(1)).min(255) as u8,
                128,
            ]
        })
    }

    #[test]
    fn test_resolution_square_images() {
        let config = MesherConfig::default();
        assert_eq!(sculpt_resolution(64, 64, &config), (32, 32));
        assert_eq!(sculpt_resolution(256, 256, &config), (32, 32));
        assert_eq!(sculpt_resolution(32, 32, &config), (16, 16));
        // Tiny maps fall back to the floor
        assert_eq!(sculpt_resolution(4, 4, &config), (4, 4));
    }

    #[test]
    fn test_resolution_follows_aspect() {
        let config = MesherConfig::default();
        let (rows, columns) = sculpt_resolution(64, 16, &config);
        assert_eq!((rows, columns), (8, 32));
        // Wide maps hit the column ceiling first
        let (rows, columns) = sculpt_resolution(128, 32, &config);
        assert_eq!((rows, columns), (32, 32));
    }

    #[test]
    fn test_grid_size_and_uvs() {
        let config = MesherConfig::default();
        let mesh = decode_sculpt(&gradient(64, 64), &params(SculptType::Plane), &config).unwrap();
        assert_eq!(mesh.vertex_count(), 33 * 33);
        assert_eq!(mesh.triangle_count(), 32 * 32 * 2);
        assert_eq!(mesh.uvs.len(), 33 * 33 * 2);
        assert!(mesh.validate_indices().is_ok());
    }

    #[test]
    fn test_plane_clamps_and_cylinder_wraps() {
        let image = gradient(64, 64);
        let config = MesherConfig::default();

        let plane = decode_sculpt(&image, &params(SculptType::Plane), &config).unwrap();
        // Last column reads pixel 63, i.e. full red
        assert_abs_diff_eq!(plane.positions[32 * 3], 0.5, epsilon = 1e-6);

        let cylinder = decode_sculpt(&image, &params(SculptType::Cylinder), &config).unwrap();
        // Last column wraps to pixel 0
        assert_eq!(cylinder.positions[32 * 3], cylinder.positions[0]);
    }

    #[test]
    fn test_sphere_poles_collapse() {
        let config = MesherConfig::default();
        let mesh = decode_sculpt(&gradient(64, 64), &params(SculptType::Sphere), &config).unwrap();
        let first = mesh.position(0);
        for j in 0..=32 {
            assert_eq!(mesh.position(j), first);
        }
        let last_row = 32 * 33;
        for j in 0..=32 {
            assert_eq!(mesh.position(last_row + j), mesh.position(last_row));
        }
    }

    #[test]
    fn test_torus_wraps_rows() {
        let config = MesherConfig::default();
        let mesh = decode_sculpt(&gradient(64, 64), &params(SculptType::Torus), &config).unwrap();
        for j in 0..=32 {
            assert_eq!(mesh.position(32 * 33 + j), mesh.position(j));
        }
    }

    #[test]
    fn test_mirror_flips_x_and_reverses_columns() {
        let image = gradient(64, 64);
        let config = MesherConfig::default();
        let plain = decode_sculpt(&image, &params(SculptType::Plane), &config).unwrap();

        let mut mirrored_params = params(SculptType::Plane);
        mirrored_params.mirror = true;
        let mirrored = decode_sculpt(&image, &mirrored_params, &config).unwrap();

        // Column j of the mirror reads column 32 - j, negated
        for j in 0..=32 {
            let a = plain.position(32 - j);
            let b = mirrored.position(j);
            assert_eq!(b.x, -a.x);
            assert_eq!(b.y, a.y);
        }

        let mut both = mirrored_params;
        both.invert = true;
        let both = decode_sculpt(&image, &both, &config).unwrap();
        // Mirror and invert cancel the column reversal but keep the flip
        assert_eq!(both.position(0).x, -plain.position(0).x);
    }

    #[test]
    fn test_rejects_empty_and_short_bitmaps() {
        assert!(RgbBitmap::new(2, 2, vec![0; 11]).is_err());
        let empty = RgbBitmap::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(
            decode_sculpt(&empty, &params(SculptType::Sphere), &MesherConfig::default()),
            Err(Error::Sculpt(_))
        ));
    }

    #[test]
    fn test_undecodable_bytes() {
        let config = MesherConfig::default();
        let err = decode_sculpt_bytes(b"not an image", &params(SculptType::Sphere), &config)
            .unwrap_err();
        assert!(matches!(err, Error::Sculpt(_)));
    }
}
